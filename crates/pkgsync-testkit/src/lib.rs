//! # pkgsync Testkit
//!
//! Testing utilities for pkgsync.
//!
//! ## Overview
//!
//! This crate provides:
//!
//! - **Fakes**: Instrumented lister, getter and adder that count concurrent
//!   calls, plus stores that fail on demand
//! - **Generators**: Proptest strategies for packages and metadata
//! - **Fixtures**: An in-memory package manager with sample packages
//! - **Golden vectors**: Pinned query renderings
//!
//! ## Property Testing
//!
//! ```rust,ignore
//! use proptest::prelude::*;
//! use pkgsync_testkit::generators::{package_from_params, PackageParams};
//!
//! proptest! {
//!     #[test]
//!     fn add_query_builds(params: PackageParams) {
//!         let pack = package_from_params(&params);
//!         prop_assert!(pkgsync_core::build_add_query(&pack).is_ok());
//!     }
//! }
//! ```
//!
//! ## Test Fixtures
//!
//! ```rust
//! use pkgsync_testkit::fixtures::TestFixture;
//!
//! let fixture = TestFixture::new();
//! let pack = fixture.package("curl");
//! assert_eq!(pack.info.system, "ubuntu16.04");
//! ```

pub mod fakes;
pub mod fixtures;
pub mod generators;
pub mod vectors;

pub use fakes::{
    fake_payload, FailingBlobStore, FailingTupleStore, FakeAdder, FakeError, FakeGetter,
    FakeLister, InFlight,
};
pub use fixtures::{numbered_infos, MemoryManager, TestFixture, TEST_SYSTEM};

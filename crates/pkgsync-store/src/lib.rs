//! # pkgsync Store
//!
//! The collaborators pkgsync talks to, behind narrow async traits, with the
//! implementations that ship with it.
//!
//! ## Key Types
//!
//! - [`BlobStore`] / [`TupleStore`] - Remote payload and metadata storage
//! - [`PackageLister`] / [`PackageGetter`] / [`PackageAdder`] - The sync seams
//! - [`MemoryBlobStore`] / [`MemoryTupleStore`] - In-memory stores for tests
//! - [`FsBlobStore`] - Content-addressed blobs on the local filesystem
//! - [`SqliteTupleStore`] - SQLite-backed tuple store
//! - [`DpkgSource`] - Installed packages on a dpkg host
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pkgsync_store::{FsBlobStore, SqliteTupleStore, TupleStore};
//!
//! async fn example() {
//!     let blobs = FsBlobStore::open("pkgsync/blobs").unwrap();
//!     let tuples = SqliteTupleStore::open("pkgsync/tuples.db").unwrap();
//!     // let response = tuples.execute(&query).await.unwrap();
//! }
//! ```
//!
//! ## Design Notes
//!
//! - **Content addressing**: blob handles are BLAKE3 digests, so storing twice is a no-op
//! - **Merging joins**: both tuple stores union entry values, never overwrite them

pub mod dpkg;
pub mod error;
pub mod fs;
pub mod memory;
pub mod migration;
pub mod sqlite;
pub mod traits;

pub use dpkg::{deb_file_name, DpkgSource};
pub use error::{Result, StoreError};
pub use fs::FsBlobStore;
pub use memory::{content_handle, MemoryBlobStore, MemoryTupleStore};
pub use sqlite::SqliteTupleStore;
pub use traits::{BlobReader, BlobStore, PackageAdder, PackageGetter, PackageLister, TupleStore};

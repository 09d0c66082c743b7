//! # pkgsync
//!
//! Publish a host's installed packages to a content-addressed blob store and
//! a queryable tuple store, and read them back.
//!
//! ## Overview
//!
//! - [`PackageManager`] - get, add and search packages
//! - [`Syncer`] / [`add_all_packages`] - push every installed package, with
//!   bounded concurrency per stage
//! - [`PkgsyncConfig`] - store locations, host system and sync ceilings
//!
//! ## Usage
//!
//! ```rust,no_run
//! use pkgsync::{PkgsyncConfig, SearchTerm};
//!
//! async fn example() {
//!     let config = PkgsyncConfig::default();
//!
//!     // Push everything dpkg reports as installed
//!     let source = config.host_source();
//!     let syncer = config.host_syncer().unwrap();
//!     let report = syncer.add_all_packages(&source).await.unwrap();
//!     println!("published {} of {}", report.published.len(), report.listed);
//!
//!     // Read them back
//!     let manager = config.open_manager().unwrap();
//!     let libs = manager
//!         .search(&SearchTerm::name_wildcard(config.system.as_str(), "lib*"))
//!         .await
//!         .unwrap();
//! }
//! ```
//!
//! ## Re-exports
//!
//! - `pkgsync::core` - Entities, queries and the mapper
//! - `pkgsync::store` - Collaborator traits and store implementations
//! - `pkgsync::sync` - The bulk sync pipeline

pub mod config;
pub mod error;
pub mod manager;

pub use pkgsync_core as core;
pub use pkgsync_store as store;
pub use pkgsync_sync as sync;

pub use config::{LocalPackageManager, PkgsyncConfig, StorageConfig, DEFAULT_SYSTEM};
pub use error::{PackageError, Result};
pub use manager::PackageManager;

pub use pkgsync_core::{
    ContentHandle, MetadataEntry, Package, PackageInfo, SearchCriterion, SearchTerm,
};
pub use pkgsync_sync::{add_all_packages, SyncConfig, SyncFailure, SyncReport, SyncStage, Syncer};

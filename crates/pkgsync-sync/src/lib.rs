//! # pkgsync Sync
//!
//! Bulk synchronization of every installed package from a source to a
//! destination, under two independent concurrency ceilings.
//!
//! ## Overview
//!
//! [`add_all_packages`] lists the inventory once, then fans out one task per
//! package: fetch the payload through a [`PackageGetter`], then publish it
//! through a [`PackageAdder`]. Fetches and publishes each pass through their
//! own [`StageGate`], so a slow destination never starves the source of
//! permits and vice versa.
//!
//! ## Key Properties
//!
//! - **Bounded**: at most `fetch_concurrency` fetches and `publish_concurrency`
//!   publishes are in flight at any moment
//! - **Isolated**: one item's failure is logged and recorded, never fatal
//! - **Complete**: the call returns only after every item is terminal
//!
//! ## Usage
//!
//! ```rust,no_run
//! use std::sync::Arc;
//! use pkgsync_store::DpkgSource;
//! use pkgsync_sync::{Syncer, SyncConfig};
//!
//! async fn example() {
//!     let source = Arc::new(DpkgSource::new("ubuntu16.04"));
//!     // let manager: Arc<PackageManager<_, _>> = ...;
//!     // let syncer = Syncer::new(Arc::clone(&source), manager, SyncConfig::default());
//!     // let report = syncer.add_all_packages(source.as_ref()).await?;
//!     // println!("published {} of {}", report.published.len(), report.listed);
//! }
//! ```
//!
//! [`PackageGetter`]: pkgsync_store::PackageGetter
//! [`PackageAdder`]: pkgsync_store::PackageAdder

pub mod error;
pub mod gate;
pub mod pipeline;

pub use error::{Result, SyncError};
pub use gate::{StageGate, StagePermit, SyncStage};
pub use pipeline::{
    add_all_packages, SyncConfig, SyncFailure, SyncReport, Syncer, DEFAULT_CONCURRENCY,
};

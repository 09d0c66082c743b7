//! Error types for the sync module.

use thiserror::Error;

use crate::gate::SyncStage;

/// Errors that can occur during a bulk sync.
#[derive(Debug, Error)]
pub enum SyncError {
    /// The package inventory could not be listed. Nothing was synced.
    #[error("listing installed packages failed: {0}")]
    Inventory(#[source] Box<dyn std::error::Error + Send + Sync>),

    /// A stage's admission gate was closed while an item waited on it.
    #[error("{0} gate closed")]
    GateClosed(SyncStage),
}

/// Result type for sync operations.
pub type Result<T> = std::result::Result<T, SyncError>;

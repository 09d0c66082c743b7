//! Error types for the package manager.

use pkgsync_core::{ContentHandle, CoreError};
use pkgsync_store::StoreError;
use thiserror::Error;

/// Errors that can occur during package manager operations.
///
/// Every variant names the operation that failed (`"get"`, `"add"`,
/// `"search"`) and keeps the underlying error as its source.
#[derive(Debug, Error)]
pub enum PackageError {
    /// The package was rejected before any I/O.
    #[error("{op}: {source}")]
    InvalidPackage {
        op: &'static str,
        #[source]
        source: CoreError,
    },

    /// The search term was rejected before any I/O.
    #[error("{op}: {source}")]
    InvalidSearchTerm {
        op: &'static str,
        #[source]
        source: CoreError,
    },

    /// The search criterion text is not recognized.
    #[error("{op}: {source}")]
    UnknownCriterion {
        op: &'static str,
        #[source]
        source: CoreError,
    },

    /// The tuple store returned data of the wrong shape.
    #[error("{op}: {source}")]
    MalformedResponse {
        op: &'static str,
        #[source]
        source: CoreError,
    },

    /// No package matched.
    #[error("{op}: package {package} not found")]
    NotFound {
        op: &'static str,
        package: String,
        #[source]
        source: CoreError,
    },

    /// More than one package matched where exactly one was required.
    #[error("{op}: {count} packages match {package}")]
    AmbiguousMatch {
        op: &'static str,
        package: String,
        count: usize,
        #[source]
        source: CoreError,
    },

    /// The payload could not be fetched or read.
    #[error("{op}: blob {handle} unavailable: {source}")]
    BlobUnavailable {
        op: &'static str,
        handle: ContentHandle,
        #[source]
        source: StoreError,
    },

    /// The payload could not be written.
    #[error("{op}: storing payload failed: {source}")]
    StoreFailure {
        op: &'static str,
        #[source]
        source: StoreError,
    },

    /// The tuple store failed to execute a query.
    #[error("{op}: query execution failed: {source}")]
    PersistFailure {
        op: &'static str,
        #[source]
        source: StoreError,
    },
}

impl PackageError {
    /// Wrap a mapper error raised during `op`.
    pub(crate) fn from_core(op: &'static str, source: CoreError) -> Self {
        match source {
            CoreError::InvalidPackage(_) => Self::InvalidPackage { op, source },
            CoreError::InvalidSearchTerm(_) => Self::InvalidSearchTerm { op, source },
            CoreError::UnknownCriterion(_) => Self::UnknownCriterion { op, source },
            CoreError::MalformedResponse(_) | CoreError::UnexpectedCardinality { .. } => {
                Self::MalformedResponse { op, source }
            }
        }
    }

    /// The operation that failed.
    pub fn op(&self) -> &'static str {
        match self {
            Self::InvalidPackage { op, .. }
            | Self::InvalidSearchTerm { op, .. }
            | Self::UnknownCriterion { op, .. }
            | Self::MalformedResponse { op, .. }
            | Self::NotFound { op, .. }
            | Self::AmbiguousMatch { op, .. }
            | Self::BlobUnavailable { op, .. }
            | Self::StoreFailure { op, .. }
            | Self::PersistFailure { op, .. } => *op,
        }
    }
}

/// Result type for package manager operations.
pub type Result<T> = std::result::Result<T, PackageError>;

//! Error types for pkgsync core.

use thiserror::Error;

/// Errors raised while building queries or decoding responses.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum CoreError {
    /// The package failed validation before any I/O.
    #[error("invalid package: {0}")]
    InvalidPackage(String),

    /// The search term failed validation before any I/O.
    #[error("invalid search term: {0}")]
    InvalidSearchTerm(String),

    /// The search criterion is not one we know how to query.
    #[error("unknown search criterion: {0}")]
    UnknownCriterion(String),

    /// The store returned data that does not have the expected shape.
    #[error("malformed response: {0}")]
    MalformedResponse(String),

    /// Exactly one package was expected.
    #[error("expected exactly 1 package, received {count}")]
    UnexpectedCardinality { count: usize },
}

/// Result type for core operations.
pub type Result<T> = std::result::Result<T, CoreError>;

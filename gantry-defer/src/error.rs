//! Error types for deferred execution.

use thiserror::Error;

/// Result type for deferred-execution operations.
pub type DeferResult<T> = Result<T, DeferError>;

/// Deferred-execution errors.
#[derive(Debug, Error)]
pub enum DeferError {
    /// Snapshot store error.
    #[error(transparent)]
    Store(#[from] gantry_cache::CacheError),

    /// Failed to read a request or response body.
    #[error("Body read failed: {0}")]
    Body(String),

    /// Webhook delivery failed.
    #[error("Webhook delivery failed: {0}")]
    Webhook(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for DeferError {
    fn from(err: serde_json::Error) -> Self {
        DeferError::Serialization(err.to_string())
    }
}

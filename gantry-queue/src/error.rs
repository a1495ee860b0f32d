//! Error types for queue operations.

use thiserror::Error;

use crate::TaskId;

/// Result type for queue operations.
pub type QueueResult<T> = Result<T, QueueError>;

/// Queue-specific errors.
#[derive(Debug, Error)]
pub enum QueueError {
    /// Broker error.
    #[error(transparent)]
    Broker(#[from] gantry_broker::BrokerError),

    /// Index store error.
    #[error(transparent)]
    Cache(#[from] gantry_cache::CacheError),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Task not found for this task type.
    #[error("Task not found: {0}")]
    TaskNotFound(TaskId),
}

impl QueueError {
    /// Whether this error should surface as a Not-Found to callers.
    pub fn is_not_found(&self) -> bool {
        matches!(self, QueueError::TaskNotFound(_))
    }

    /// Whether the broker was unreachable.
    pub fn is_broker_unavailable(&self) -> bool {
        matches!(
            self,
            QueueError::Broker(gantry_broker::BrokerError::Unavailable { .. })
        )
    }
}

impl From<serde_json::Error> for QueueError {
    fn from(err: serde_json::Error) -> Self {
        QueueError::Serialization(err.to_string())
    }
}

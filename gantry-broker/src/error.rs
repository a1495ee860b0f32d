//! Error types for broker operations.

use thiserror::Error;

/// Result type for broker operations.
pub type Result<T> = std::result::Result<T, BrokerError>;

/// Errors that can occur while talking to the broker.
#[derive(Debug, Error)]
pub enum BrokerError {
    /// Failed to connect to the broker.
    #[error("Connection failed: {0}")]
    Connection(String),

    /// The broker stayed unreachable through every connection attempt.
    #[error("Broker unavailable after {attempts} attempts: {detail}")]
    Unavailable { attempts: u32, detail: String },

    /// Failed to publish a message.
    #[error("Publish failed: {0}")]
    Publish(String),

    /// Failed to consume from a queue.
    #[error("Consume failed: {0}")]
    Consume(String),

    /// Failed to acknowledge a delivery.
    #[error("Acknowledge failed: {0}")]
    Acknowledge(String),

    /// Failed to serialize a message body.
    #[error("Serialization failed: {0}")]
    Serialization(String),

    /// Failed to deserialize a message body.
    #[error("Deserialization failed: {0}")]
    Deserialization(String),

    /// No reply arrived within the wait window.
    #[error("Timed out waiting for a reply on {0}")]
    ReplyTimeout(String),

    /// Channel or connection is closed.
    #[error("Channel closed: {0}")]
    ChannelClosed(String),

    /// Resource exhausted (e.g. channel limit reached).
    #[error("Resource exhausted: {0}")]
    ResourceExhausted(String),

    /// Internal broker error.
    #[error("Broker error: {0}")]
    Broker(String),

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BrokerError {
    /// Check if this error is worth retrying.
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            BrokerError::Connection(_)
                | BrokerError::ChannelClosed(_)
                | BrokerError::ResourceExhausted(_)
                | BrokerError::Broker(_)
        )
    }

    /// Check if this error indicates a connection problem.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            BrokerError::Connection(_)
                | BrokerError::Unavailable { .. }
                | BrokerError::ChannelClosed(_)
        )
    }
}

impl From<lapin::Error> for BrokerError {
    fn from(err: lapin::Error) -> Self {
        match err.kind() {
            lapin::ErrorKind::IOError(_) => BrokerError::Connection(err.to_string()),
            lapin::ErrorKind::ChannelsLimitReached => {
                BrokerError::ResourceExhausted(err.to_string())
            }
            lapin::ErrorKind::InvalidChannelState(..) => BrokerError::ChannelClosed(err.to_string()),
            lapin::ErrorKind::InvalidConnectionState(_) => {
                BrokerError::Connection(err.to_string())
            }
            _ => BrokerError::Broker(err.to_string()),
        }
    }
}

impl From<serde_json::Error> for BrokerError {
    fn from(err: serde_json::Error) -> Self {
        BrokerError::Serialization(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unavailable_is_connection_error() {
        let err = BrokerError::Unavailable {
            attempts: 3,
            detail: "refused".to_string(),
        };
        assert!(err.is_connection_error());
        assert!(!err.is_retryable());
    }

    #[test]
    fn test_retryable_classification() {
        assert!(BrokerError::Connection("x".into()).is_retryable());
        assert!(BrokerError::ChannelClosed("x".into()).is_retryable());
        assert!(!BrokerError::Serialization("x".into()).is_retryable());
        assert!(!BrokerError::ReplyTimeout("q".into()).is_retryable());
    }
}

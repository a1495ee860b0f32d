//! Error types for the RPC bridge.

use std::time::Duration;

use thiserror::Error;

/// Result type for bridge operations.
pub type BridgeResult<T> = Result<T, BridgeError>;

/// Bridge-specific errors.
#[derive(Debug, Error)]
pub enum BridgeError {
    /// Broker error.
    #[error(transparent)]
    Broker(#[from] gantry_broker::BrokerError),

    /// No reply arrived before the timeout.
    #[error("No reply from service '{service}' within {timeout:?}")]
    ReplyTimeout { service: String, timeout: Duration },

    /// Downstream HTTP error.
    #[error("Downstream request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Serialization error.
    #[error("Serialization error: {0}")]
    Serialization(String),
}

impl From<serde_json::Error> for BridgeError {
    fn from(err: serde_json::Error) -> Self {
        BridgeError::Serialization(err.to_string())
    }
}

impl BridgeError {
    /// Whether the caller timed out waiting for a reply.
    pub fn is_timeout(&self) -> bool {
        matches!(self, BridgeError::ReplyTimeout { .. })
    }
}

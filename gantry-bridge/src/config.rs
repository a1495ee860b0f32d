//! Bridge configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the caller side of the bridge.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BridgeConfig {
    /// How long a call waits for its reply before failing.
    #[serde(default = "default_reply_timeout")]
    pub reply_timeout: Duration,
}

fn default_reply_timeout() -> Duration {
    Duration::from_secs(30)
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            reply_timeout: default_reply_timeout(),
        }
    }
}

impl BridgeConfig {
    /// Set the reply timeout.
    pub fn with_reply_timeout(mut self, timeout: Duration) -> Self {
        self.reply_timeout = timeout;
        self
    }
}

/// Configuration for one popper: which service's queue it consumes and
/// where it forwards the requests.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PopperConfig {
    /// Service name; the popper consumes `{service}_requests`.
    pub service: String,
    /// Downstream endpoint the payloads are POSTed to.
    pub downstream_url: String,
    /// Timeout for the downstream call.
    #[serde(default = "default_forward_timeout")]
    pub forward_timeout: Duration,
}

fn default_forward_timeout() -> Duration {
    Duration::from_secs(30)
}

impl PopperConfig {
    /// Create a popper configuration.
    pub fn new(service: impl Into<String>, downstream_url: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            downstream_url: downstream_url.into(),
            forward_timeout: default_forward_timeout(),
        }
    }

    /// Set the downstream call timeout.
    pub fn with_forward_timeout(mut self, timeout: Duration) -> Self {
        self.forward_timeout = timeout;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bridge_defaults() {
        let config = BridgeConfig::default();
        assert_eq!(config.reply_timeout, Duration::from_secs(30));
    }

    #[test]
    fn test_popper_config() {
        let config = PopperConfig::new("addition", "http://addition:8000/add")
            .with_forward_timeout(Duration::from_secs(5));
        assert_eq!(config.service, "addition");
        assert_eq!(config.downstream_url, "http://addition:8000/add");
        assert_eq!(config.forward_timeout, Duration::from_secs(5));
    }
}

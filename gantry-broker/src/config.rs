//! Broker configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the AMQP broker connection and queue topology.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BrokerConfig {
    /// Connection URL, e.g. `amqp://rabbitmq:5672`.
    pub url: String,
    /// How many connection attempts to make before giving up.
    #[serde(default = "default_connect_attempts")]
    pub connect_attempts: u32,
    /// Delay between connection attempts.
    #[serde(default = "default_connect_retry_delay")]
    pub connect_retry_delay: Duration,
    /// Message TTL on ready queues; expiry routes to the dead-letter queue.
    #[serde(default = "default_queue_ttl")]
    pub ready_ttl: Duration,
    /// Message TTL on lease queues; expiry routes back to the ready queue.
    #[serde(default = "default_queue_ttl")]
    pub lease_ttl: Duration,
}

fn default_connect_attempts() -> u32 {
    30
}

fn default_connect_retry_delay() -> Duration {
    Duration::from_secs(2)
}

fn default_queue_ttl() -> Duration {
    Duration::from_millis(300_000)
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self::new("amqp://rabbitmq:5672")
    }
}

impl BrokerConfig {
    /// Create a configuration with the given URL and default timings.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            connect_attempts: default_connect_attempts(),
            connect_retry_delay: default_connect_retry_delay(),
            ready_ttl: default_queue_ttl(),
            lease_ttl: default_queue_ttl(),
        }
    }

    /// Set the number of connection attempts.
    pub fn with_connect_attempts(mut self, attempts: u32) -> Self {
        self.connect_attempts = attempts.max(1);
        self
    }

    /// Set the delay between connection attempts.
    pub fn with_connect_retry_delay(mut self, delay: Duration) -> Self {
        self.connect_retry_delay = delay;
        self
    }

    /// Set the ready-queue message TTL.
    pub fn with_ready_ttl(mut self, ttl: Duration) -> Self {
        self.ready_ttl = ttl;
        self
    }

    /// Set the lease-queue message TTL.
    pub fn with_lease_ttl(mut self, ttl: Duration) -> Self {
        self.lease_ttl = ttl;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = BrokerConfig::default();
        assert_eq!(config.url, "amqp://rabbitmq:5672");
        assert_eq!(config.connect_attempts, 30);
        assert_eq!(config.connect_retry_delay, Duration::from_secs(2));
        assert_eq!(config.ready_ttl, Duration::from_millis(300_000));
        assert_eq!(config.lease_ttl, Duration::from_millis(300_000));
    }

    #[test]
    fn test_builder() {
        let config = BrokerConfig::new("amqp://mq:5672")
            .with_connect_attempts(5)
            .with_connect_retry_delay(Duration::from_millis(100))
            .with_ready_ttl(Duration::from_secs(60))
            .with_lease_ttl(Duration::from_secs(30));

        assert_eq!(config.url, "amqp://mq:5672");
        assert_eq!(config.connect_attempts, 5);
        assert_eq!(config.ready_ttl, Duration::from_secs(60));
        assert_eq!(config.lease_ttl, Duration::from_secs(30));
    }

    #[test]
    fn test_connect_attempts_floor() {
        let config = BrokerConfig::default().with_connect_attempts(0);
        assert_eq!(config.connect_attempts, 1);
    }
}

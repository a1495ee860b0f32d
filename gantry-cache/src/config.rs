//! Cache configuration.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Configuration for the Redis record store.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Redis connection URL.
    pub redis_url: String,
    /// Key prefix for every record.
    #[serde(default = "default_key_prefix")]
    pub key_prefix: String,
    /// Retention for written records. `None` keeps records forever.
    #[serde(default = "default_retention")]
    pub retention: Option<Duration>,
}

fn default_key_prefix() -> String {
    "gantry".to_string()
}

fn default_retention() -> Option<Duration> {
    Some(Duration::from_secs(86_400)) // 24 hours
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self::new("redis://localhost:6379")
    }
}

impl CacheConfig {
    /// Create a configuration with the given URL and defaults.
    pub fn new(redis_url: impl Into<String>) -> Self {
        Self {
            redis_url: redis_url.into(),
            key_prefix: default_key_prefix(),
            retention: default_retention(),
        }
    }

    /// Set the key prefix.
    pub fn with_key_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.key_prefix = prefix.into();
        self
    }

    /// Set the retention time. A zero duration disables expiry.
    pub fn with_retention(mut self, retention: Duration) -> Self {
        self.retention = if retention.is_zero() {
            None
        } else {
            Some(retention)
        };
        self
    }

    /// Build a full key from a suffix.
    pub(crate) fn key(&self, suffix: &str) -> String {
        format!("{}:{}", self.key_prefix, suffix)
    }
}

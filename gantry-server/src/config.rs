//! Environment-driven server configuration.

use std::time::Duration;

/// Server configuration, read from `GANTRY_*` environment variables.
#[derive(Debug, Clone)]
pub struct ServerConfig {
    /// Listen address.
    pub bind: String,
    /// AMQP broker URL.
    pub amqp_url: String,
    /// Redis URL for the task index and deferred results.
    pub redis_url: String,
    /// RPC reply timeout.
    pub reply_timeout: Duration,
    /// Record retention; zero disables expiry.
    pub retention: Duration,
    /// `service -> downstream URL` pairs; one popper is spawned per pair.
    pub services: Vec<(String, String)>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind: "0.0.0.0:8080".to_string(),
            amqp_url: "amqp://rabbitmq:5672".to_string(),
            redis_url: "redis://localhost:6379".to_string(),
            reply_timeout: Duration::from_secs(30),
            retention: Duration::from_secs(86_400),
            services: Vec::new(),
        }
    }
}

impl ServerConfig {
    /// Read the configuration from the environment, falling back to the
    /// defaults above for anything unset.
    pub fn from_env() -> Self {
        let defaults = Self::default();
        Self {
            bind: env_or("GANTRY_BIND", defaults.bind),
            amqp_url: env_or("GANTRY_AMQP_URL", defaults.amqp_url),
            redis_url: env_or("GANTRY_REDIS_URL", defaults.redis_url),
            reply_timeout: env_secs("GANTRY_REPLY_TIMEOUT_SECS", defaults.reply_timeout),
            retention: env_secs("GANTRY_RETENTION_SECS", defaults.retention),
            services: parse_services(
                &std::env::var("GANTRY_SERVICES").unwrap_or_default(),
            ),
        }
    }
}

fn env_or(key: &str, default: String) -> String {
    std::env::var(key).unwrap_or(default)
}

fn env_secs(key: &str, default: Duration) -> Duration {
    std::env::var(key)
        .ok()
        .and_then(|value| value.parse::<u64>().ok())
        .map(Duration::from_secs)
        .unwrap_or(default)
}

/// Parse `service=url` pairs separated by commas. Malformed entries are
/// skipped with a warning rather than failing startup.
fn parse_services(raw: &str) -> Vec<(String, String)> {
    raw.split(',')
        .filter(|entry| !entry.trim().is_empty())
        .filter_map(|entry| match entry.split_once('=') {
            Some((service, url)) if !service.trim().is_empty() && !url.trim().is_empty() => {
                Some((service.trim().to_string(), url.trim().to_string()))
            }
            _ => {
                tracing::warn!(entry, "Skipping malformed GANTRY_SERVICES entry");
                None
            }
        })
        .collect()
}

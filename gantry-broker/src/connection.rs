//! Broker connection management with bounded retry.

use std::sync::Arc;

use lapin::{Channel, Connection, ConnectionProperties};
use tracing::{info, warn};

use crate::{BrokerConfig, BrokerError, Result};

/// A connection to the AMQP broker.
///
/// The connection is shared; callers open a fresh channel per logical
/// operation via [`Broker::channel`]. Channels are cheap and keep
/// concurrent operations from interleaving acknowledgements.
#[derive(Clone)]
pub struct Broker {
    connection: Arc<Connection>,
    config: BrokerConfig,
}

impl Broker {
    /// Connect to the broker, retrying at a fixed delay.
    ///
    /// Gives up after `config.connect_attempts` tries and returns
    /// [`BrokerError::Unavailable`] instead of blocking forever.
    pub async fn connect(config: &BrokerConfig) -> Result<Self> {
        let mut last_error = String::new();

        for attempt in 1..=config.connect_attempts {
            match Connection::connect(&config.url, ConnectionProperties::default()).await {
                Ok(connection) => {
                    info!(url = %config.url, attempt, "Connected to broker");
                    return Ok(Self {
                        connection: Arc::new(connection),
                        config: config.clone(),
                    });
                }
                Err(e) => {
                    warn!(
                        url = %config.url,
                        attempt,
                        max_attempts = config.connect_attempts,
                        error = %e,
                        "Broker not reachable, retrying"
                    );
                    last_error = e.to_string();
                    if attempt < config.connect_attempts {
                        tokio::time::sleep(config.connect_retry_delay).await;
                    }
                }
            }
        }

        Err(BrokerError::Unavailable {
            attempts: config.connect_attempts,
            detail: last_error,
        })
    }

    /// Open a new channel on the shared connection.
    pub async fn channel(&self) -> Result<Channel> {
        Ok(self.connection.create_channel().await?)
    }

    /// The configuration this broker was connected with.
    pub fn config(&self) -> &BrokerConfig {
        &self.config
    }

    /// Check whether the underlying connection is still up.
    pub fn is_connected(&self) -> bool {
        self.connection.status().connected()
    }

    /// Close the connection.
    pub async fn close(&self) -> Result<()> {
        info!("Closing broker connection");
        self.connection
            .close(200, "Normal shutdown")
            .await
            .map_err(|e| BrokerError::Connection(e.to_string()))?;
        Ok(())
    }
}

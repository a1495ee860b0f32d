//! Record store over a multiplexed Redis connection.

use redis::aio::ConnectionManager;
use redis::{AsyncCommands, Client};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::{debug, info};

use crate::{CacheConfig, CacheError, Result};

/// JSON record store backed by Redis.
///
/// One writer and many readers per key is the expected access pattern;
/// records are written with the configured retention and read back
/// verbatim.
#[derive(Clone)]
pub struct CacheStore {
    connection: ConnectionManager,
    config: CacheConfig,
}

impl CacheStore {
    /// Connect to Redis.
    pub async fn connect(config: CacheConfig) -> Result<Self> {
        info!(url = %config.redis_url, prefix = %config.key_prefix, "Connecting record store");

        let client =
            Client::open(config.redis_url.as_str()).map_err(|e| CacheError::Config(e.to_string()))?;
        let connection = ConnectionManager::new(client)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;

        Ok(Self { connection, config })
    }

    /// The store configuration.
    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Write a JSON record under the prefixed key, applying retention.
    pub async fn put_json<T: Serialize>(&self, key: &str, value: &T) -> Result<()> {
        let payload =
            serde_json::to_string(value).map_err(|e| CacheError::Serialization(e.to_string()))?;
        let key = self.config.key(key);
        let mut conn = self.connection.clone();

        match self.config.retention {
            Some(retention) => {
                let _: () = conn.set_ex(&key, payload, retention.as_secs()).await?;
            }
            None => {
                let _: () = conn.set(&key, payload).await?;
            }
        }
        debug!(key = %key, "Record written");
        Ok(())
    }

    /// Read a JSON record. Returns `None` for missing or evicted keys.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>> {
        let key = self.config.key(key);
        let mut conn = self.connection.clone();

        let payload: Option<String> = conn.get(&key).await?;
        match payload {
            Some(json) => {
                let value = serde_json::from_str(&json)
                    .map_err(|e| CacheError::Deserialization(e.to_string()))?;
                Ok(Some(value))
            }
            None => Ok(None),
        }
    }

    /// Check whether a record exists.
    pub async fn exists(&self, key: &str) -> Result<bool> {
        let key = self.config.key(key);
        let mut conn = self.connection.clone();
        let exists: bool = conn.exists(&key).await?;
        Ok(exists)
    }

    /// Delete a record. Returns whether a record was removed.
    pub async fn delete(&self, key: &str) -> Result<bool> {
        let key = self.config.key(key);
        let mut conn = self.connection.clone();
        let deleted: u32 = conn.del(&key).await?;
        Ok(deleted > 0)
    }

    /// Check the connection with a PING.
    pub async fn health_check(&self) -> Result<()> {
        let mut conn = self.connection.clone();
        let _: String = redis::cmd("PING")
            .query_async(&mut conn)
            .await
            .map_err(|e| CacheError::Connection(e.to_string()))?;
        Ok(())
    }
}

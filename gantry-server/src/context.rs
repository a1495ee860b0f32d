//! Application context: every service handle, built once at startup.

use std::sync::Arc;

use gantry_bridge::{BridgeConfig, Popper, PopperConfig, RpcClient};
use gantry_broker::{Broker, BrokerConfig};
use gantry_cache::{CacheConfig, CacheStore};
use gantry_defer::{RedisSnapshotStore, SnapshotStore, Supervisor};
use gantry_queue::JobQueueManager;
use tracing::{error, info};

use crate::config::ServerConfig;
use crate::error::ApiError;

/// Shared state handed to every handler through axum's `State`.
///
/// Constructed exactly once in `main`; clones share the broker and Redis
/// connections.
#[derive(Clone)]
pub struct AppContext {
    pub broker: Broker,
    pub queue: JobQueueManager,
    pub rpc: RpcClient,
    pub jobs: Arc<dyn SnapshotStore>,
    pub supervisor: Supervisor,
}

impl AppContext {
    /// Connect to the broker and Redis and assemble the context.
    pub async fn connect(config: &ServerConfig) -> Result<Self, ApiError> {
        let broker_config = BrokerConfig::new(&config.amqp_url);
        let broker = Broker::connect(&broker_config).await?;

        let cache_config =
            CacheConfig::new(&config.redis_url).with_retention(config.retention);
        let store = CacheStore::connect(cache_config).await?;
        store.health_check().await?;

        let queue = JobQueueManager::new(broker.clone(), store.clone());
        let rpc = RpcClient::new(
            broker.clone(),
            BridgeConfig::default().with_reply_timeout(config.reply_timeout),
        );
        let jobs: Arc<dyn SnapshotStore> = Arc::new(RedisSnapshotStore::new(store));

        Ok(Self {
            broker,
            queue,
            rpc,
            jobs,
            supervisor: Supervisor::new(),
        })
    }

    /// Spawn one popper per configured service mapping.
    ///
    /// Poppers run for the process lifetime; scale-out beyond that is
    /// additional processes competing on the same request queues.
    pub fn spawn_poppers(&self, config: &ServerConfig) {
        for (service, downstream_url) in &config.services {
            let popper = Popper::new(
                self.broker.clone(),
                PopperConfig::new(service.clone(), downstream_url.clone()),
            );
            let service = service.clone();
            info!(service = %service, downstream = %downstream_url, "Starting popper");
            tokio::spawn(async move {
                if let Err(e) = popper.run().await {
                    error!(service = %service, error = %e, "Popper exited with error");
                }
            });
        }
    }
}

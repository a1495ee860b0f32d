//! Caller-side proxy: blocking RPC over the broker.

use gantry_broker::lapin::options::QueueDeclareOptions;
use gantry_broker::lapin::types::FieldTable;
use gantry_broker::{publish, Broker, BrokerError, Envelope, ReplyQueue};
use serde_json::Value;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{request_queue, BridgeConfig, BridgeError, BridgeResult};

/// Synchronous-looking RPC calls over the asynchronous broker.
///
/// Each call publishes to the service's request queue tagged with a
/// fresh correlation id and an ephemeral reply queue, then consumes that
/// reply queue until the matching response arrives. The wait is bounded
/// by the configured reply timeout; there is no path that blocks
/// forever.
#[derive(Clone)]
pub struct RpcClient {
    broker: Broker,
    config: BridgeConfig,
}

impl RpcClient {
    /// Create a client over an established broker connection.
    pub fn new(broker: Broker, config: BridgeConfig) -> Self {
        Self { broker, config }
    }

    /// Call a service and wait for its reply.
    ///
    /// Returns the reply payload verbatim; downstream HTTP failures
    /// arrive as ordinary payloads (see the popper), not as errors here.
    pub async fn call(&self, service: &str, payload: Value) -> BridgeResult<Value> {
        let correlation_id = Uuid::new_v4().to_string();
        let channel = self.broker.channel().await?;

        // Declare the request queue so a call made before any popper has
        // started is queued rather than dropped.
        channel
            .queue_declare(
                &request_queue(service),
                QueueDeclareOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::from)?;

        let reply_queue = ReplyQueue::declare(&channel, &correlation_id).await?;

        let envelope = Envelope::json(&payload)?
            .with_correlation_id(&correlation_id)
            .with_reply_to(reply_queue.name());
        publish(&channel, &request_queue(service), &envelope, false).await?;

        debug!(service, %correlation_id, "Request published, awaiting reply");

        let outcome = reply_queue
            .await_reply(&channel, &correlation_id, self.config.reply_timeout)
            .await;

        if let Err(e) = reply_queue.delete(&channel).await {
            warn!(queue = reply_queue.name(), error = %e, "Failed to delete reply queue");
        }

        match outcome {
            Ok(reply) => Ok(reply.parse_json()?),
            Err(BrokerError::ReplyTimeout(_)) => Err(BridgeError::ReplyTimeout {
                service: service.to_string(),
                timeout: self.config.reply_timeout,
            }),
            Err(e) => Err(e.into()),
        }
    }
}

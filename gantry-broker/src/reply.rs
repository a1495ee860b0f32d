//! Ephemeral per-call reply queues.
//!
//! One reply queue exists per in-flight RPC call, named after the call's
//! correlation id. The queue is exclusive and auto-deleting, so an
//! abandoned call leaves nothing behind once its consumer drops.

use std::time::Duration;

use futures_util::StreamExt;
use lapin::options::{
    BasicAckOptions, BasicConsumeOptions, QueueDeclareOptions, QueueDeleteOptions,
};
use lapin::types::FieldTable;
use lapin::Channel;
use tracing::{debug, warn};
use uuid::Uuid;

use crate::{BrokerError, Envelope, Result};

/// An ephemeral, call-scoped reply queue.
#[derive(Debug, Clone)]
pub struct ReplyQueue {
    name: String,
}

impl ReplyQueue {
    /// Reply queue name for a correlation id.
    pub fn queue_name(correlation_id: &str) -> String {
        format!("reply_{correlation_id}")
    }

    /// Declare the reply queue for a correlation id.
    pub async fn declare(channel: &Channel, correlation_id: &str) -> Result<Self> {
        let name = Self::queue_name(correlation_id);
        channel
            .queue_declare(
                &name,
                QueueDeclareOptions {
                    exclusive: true,
                    auto_delete: true,
                    ..Default::default()
                },
                FieldTable::default(),
            )
            .await?;
        Ok(Self { name })
    }

    /// The queue name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Consume the queue until the envelope carrying `correlation_id`
    /// arrives, or until `timeout` elapses.
    ///
    /// Stray messages with a different correlation id are acknowledged
    /// and dropped; only the matching reply is returned.
    pub async fn await_reply(
        &self,
        channel: &Channel,
        correlation_id: &str,
        timeout: Duration,
    ) -> Result<Envelope> {
        let consumer_tag = format!("gantry-reply-{}", Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(
                &self.name,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(|e| BrokerError::Consume(e.to_string()))?;

        let deadline = tokio::time::Instant::now() + timeout;

        loop {
            let next = tokio::time::timeout_at(deadline, consumer.next()).await;
            match next {
                Err(_) => {
                    return Err(BrokerError::ReplyTimeout(self.name.clone()));
                }
                Ok(None) => {
                    return Err(BrokerError::Consume(format!(
                        "reply consumer on {} closed",
                        self.name
                    )));
                }
                Ok(Some(Err(e))) => return Err(e.into()),
                Ok(Some(Ok(delivery))) => {
                    let envelope = Envelope::from_delivery(&delivery);
                    channel
                        .basic_ack(delivery.delivery_tag, BasicAckOptions::default())
                        .await
                        .map_err(|e| BrokerError::Acknowledge(e.to_string()))?;

                    if envelope.correlation_id.as_deref() == Some(correlation_id) {
                        debug!(queue = %self.name, "Matching reply received");
                        return Ok(envelope);
                    }
                    warn!(
                        queue = %self.name,
                        correlation_id = ?envelope.correlation_id,
                        "Dropping stray reply with mismatched correlation id"
                    );
                }
            }
        }
    }

    /// Delete the queue. Best-effort cleanup after success or timeout;
    /// auto-delete covers the cases this misses.
    pub async fn delete(&self, channel: &Channel) -> Result<()> {
        channel
            .queue_delete(&self.name, QueueDeleteOptions::default())
            .await?;
        Ok(())
    }
}

//! Per-task-type queue topology.
//!
//! Each task type owns four queues. The ready queue dead-letters into the
//! DLQ when a task sits unfetched past its TTL; the lease queue
//! dead-letters back into the ready queue, which is what turns lease
//! expiry into redelivery rather than loss.

use lapin::options::QueueDeclareOptions;
use lapin::types::{AMQPValue, FieldTable};
use lapin::Channel;
use tracing::debug;

use crate::{BrokerConfig, Result};

/// The four queues backing one task type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct QueueFamily {
    task_type: String,
}

impl QueueFamily {
    /// Create the family for a task type.
    pub fn new(task_type: impl Into<String>) -> Self {
        Self {
            task_type: task_type.into(),
        }
    }

    /// The task type this family belongs to.
    pub fn task_type(&self) -> &str {
        &self.task_type
    }

    /// Ready queue: tasks awaiting a fetch.
    pub fn ready(&self) -> String {
        format!("task_queue:{}", self.task_type)
    }

    /// Lease queue: fetched tasks awaiting completion.
    pub fn lease(&self) -> String {
        format!("processing_delay:{}", self.task_type)
    }

    /// Result queue: durable completion records.
    pub fn results(&self) -> String {
        format!("result_queue:{}", self.task_type)
    }

    /// Dead-letter queue: tasks that expired without ever being fetched.
    pub fn dead_letter(&self) -> String {
        format!("task_queue:{}:dlq", self.task_type)
    }

    /// Declare all four queues. Idempotent; called before every operation
    /// that touches the family, so a task type needs no registration step.
    pub async fn declare(&self, channel: &Channel, config: &BrokerConfig) -> Result<()> {
        let durable = QueueDeclareOptions {
            durable: true,
            ..Default::default()
        };

        channel
            .queue_declare(&self.dead_letter(), durable, FieldTable::default())
            .await?;

        channel
            .queue_declare(
                &self.ready(),
                durable,
                expiring_into(config.ready_ttl, &self.dead_letter()),
            )
            .await?;

        channel
            .queue_declare(
                &self.lease(),
                durable,
                expiring_into(config.lease_ttl, &self.ready()),
            )
            .await?;

        channel
            .queue_declare(&self.results(), durable, FieldTable::default())
            .await?;

        debug!(task_type = %self.task_type, "Queue family declared");
        Ok(())
    }
}

/// Arguments for a queue whose messages expire into another queue on the
/// default exchange.
fn expiring_into(ttl: std::time::Duration, routing_key: &str) -> FieldTable {
    let mut args = FieldTable::default();
    args.insert(
        "x-message-ttl".into(),
        AMQPValue::LongLongInt(ttl.as_millis() as i64),
    );
    args.insert(
        "x-dead-letter-exchange".into(),
        AMQPValue::LongString("".into()),
    );
    args.insert(
        "x-dead-letter-routing-key".into(),
        AMQPValue::LongString(routing_key.into()),
    );
    args
}

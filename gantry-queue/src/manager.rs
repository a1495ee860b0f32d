//! Job queue operations over the broker topology and task index.

use chrono::Utc;
use gantry_broker::{ack, pop, publish, Broker, Envelope, QueueFamily};
use gantry_cache::CacheStore;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::task::{Task, TaskId, TaskPhase, TaskRecord, TaskState};
use crate::{QueueError, QueueResult};

/// A task handed to a fetcher, together with its lease.
#[derive(Debug, Clone, PartialEq)]
pub struct FetchedTask {
    pub task_id: TaskId,
    pub payload: Value,
}

/// Stateless coordinator for the per-task-type queue families.
///
/// Holds no task state of its own: the broker queues carry the durable
/// log and the index store carries per-task records. Clones share the
/// underlying broker connection and Redis connection.
#[derive(Clone)]
pub struct JobQueueManager {
    broker: Broker,
    store: CacheStore,
}

impl JobQueueManager {
    /// Create a manager over an established broker connection and index
    /// store.
    pub fn new(broker: Broker, store: CacheStore) -> Self {
        Self { broker, store }
    }

    fn record_key(task_id: TaskId) -> String {
        format!("task:{task_id}")
    }

    fn ready_ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.broker.config().ready_ttl.as_millis() as i64)
    }

    fn lease_ttl(&self) -> chrono::Duration {
        chrono::Duration::milliseconds(self.broker.config().lease_ttl.as_millis() as i64)
    }

    /// Submit a payload under a task type. Returns the minted task id.
    pub async fn submit(&self, task_type: &str, payload: Value) -> QueueResult<TaskId> {
        let channel = self.broker.channel().await?;
        let family = QueueFamily::new(task_type);
        family.declare(&channel, self.broker.config()).await?;

        let task = Task::new(task_type, payload);
        let record = TaskRecord::new(&task, Utc::now(), self.ready_ttl());

        // Record first, then publish: a fetch racing this submit must be
        // able to see the record once the message is poppable.
        self.store
            .put_json(&Self::record_key(task.task_id), &record)
            .await?;
        publish(&channel, &family.ready(), &Envelope::json(&task)?, true).await?;

        info!(task_type, task_id = %task.task_id, "Task submitted");
        Ok(task.task_id)
    }

    /// Fetch the head-of-queue task of a task type and lease it.
    ///
    /// The popped message is republished to the lease queue (opening a
    /// fresh lease TTL window) before being acknowledged off the ready
    /// queue, so a crash between the two leaves the task fetchable, never
    /// lost. Ready-queue copies of tasks the index already marks
    /// completed are discarded here; this is what lets `complete` skip
    /// hunting down the lease-queue copy.
    ///
    /// Returns `None` when the ready queue is empty.
    pub async fn fetch(&self, task_type: &str) -> QueueResult<Option<FetchedTask>> {
        let channel = self.broker.channel().await?;
        let family = QueueFamily::new(task_type);
        family.declare(&channel, self.broker.config()).await?;

        loop {
            let Some(popped) = pop(&channel, &family.ready()).await? else {
                return Ok(None);
            };

            let task: Task = match popped.envelope.parse_json() {
                Ok(task) => task,
                Err(e) => {
                    warn!(task_type, error = %e, "Dropping undecodable ready-queue message");
                    ack(&channel, popped.delivery_tag).await?;
                    continue;
                }
            };

            let key = Self::record_key(task.task_id);
            let record: Option<TaskRecord> = self.store.get_json(&key).await?;

            if let Some(ref existing) = record
                && existing.phase == TaskPhase::Completed
            {
                debug!(task_type, task_id = %task.task_id, "Discarding completed task redelivery");
                ack(&channel, popped.delivery_tag).await?;
                continue;
            }

            publish(&channel, &family.lease(), &popped.envelope, true).await?;
            ack(&channel, popped.delivery_tag).await?;

            let mut record = record
                .unwrap_or_else(|| TaskRecord::new(&task, Utc::now(), self.ready_ttl()));
            record.lease(Utc::now(), self.lease_ttl());
            self.store.put_json(&key, &record).await?;

            info!(task_type, task_id = %task.task_id, "Task leased");
            return Ok(Some(FetchedTask {
                task_id: task.task_id,
                payload: task.payload,
            }));
        }
    }

    /// Attach a result to a leased task and record completion.
    ///
    /// The completed message is published to the result queue as the
    /// durable completion record. The lease-queue copy is left to expire;
    /// its redelivery is discarded by `fetch`.
    pub async fn complete(
        &self,
        task_type: &str,
        task_id: TaskId,
        result: Value,
    ) -> QueueResult<()> {
        let key = Self::record_key(task_id);
        let record: Option<TaskRecord> = self.store.get_json(&key).await?;

        let mut record = match record {
            Some(record) if record.task_type == task_type => record,
            _ => return Err(QueueError::TaskNotFound(task_id)),
        };
        if record.phase == TaskPhase::Completed {
            // Nothing left to complete; callers see not-found.
            return Err(QueueError::TaskNotFound(task_id));
        }

        record.complete(result);
        self.store.put_json(&key, &record).await?;

        let channel = self.broker.channel().await?;
        let family = QueueFamily::new(task_type);
        family.declare(&channel, self.broker.config()).await?;

        let completed = Task {
            task_id: record.task_id,
            task_type: record.task_type.clone(),
            payload: record.payload.clone(),
            result: record.result.clone(),
        };
        publish(&channel, &family.results(), &Envelope::json(&completed)?, true).await?;

        info!(task_type, %task_id, "Task completed");
        Ok(())
    }

    /// Report the current state of a task. Never errors on unknown ids.
    pub async fn status(&self, task_type: &str, task_id: TaskId) -> QueueResult<TaskState> {
        let record: Option<TaskRecord> =
            self.store.get_json(&Self::record_key(task_id)).await?;

        Ok(match record {
            Some(record) if record.task_type == task_type => {
                record.reported_state(Utc::now(), self.ready_ttl())
            }
            _ => TaskState::Missing,
        })
    }

    /// Return the stored result of a completed task.
    pub async fn result(&self, task_type: &str, task_id: TaskId) -> QueueResult<Value> {
        let record: Option<TaskRecord> =
            self.store.get_json(&Self::record_key(task_id)).await?;

        match record {
            Some(record)
                if record.task_type == task_type && record.phase == TaskPhase::Completed =>
            {
                Ok(record.result.unwrap_or(Value::Null))
            }
            _ => Err(QueueError::TaskNotFound(task_id)),
        }
    }
}

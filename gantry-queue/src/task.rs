//! Task model and index records.

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Task unique identifier, minted at submission.
pub type TaskId = Uuid;

/// Wire body of every queue message.
///
/// This exact shape travels through the ready, lease and result queues;
/// `result` is `None` until completion attaches it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Task {
    pub task_id: TaskId,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub result: Option<serde_json::Value>,
}

impl Task {
    /// Create a freshly submitted task.
    pub fn new(task_type: impl Into<String>, payload: serde_json::Value) -> Self {
        Self {
            task_id: Uuid::new_v4(),
            task_type: task_type.into(),
            payload,
            result: None,
        }
    }
}

/// Lifecycle phase persisted in the index record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskPhase {
    /// Published to the ready queue, not yet fetched.
    Queued,
    /// Fetched; sitting in the lease queue until completed or expired.
    Leased,
    /// Completed with a result attached.
    Completed,
}

/// Externally reported task state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TaskState {
    /// In the ready or lease queue.
    Queued,
    /// Expired out of the ready queue into the dead-letter queue.
    Expired,
    /// Unknown id, wrong task type, or evicted record.
    Missing,
    /// Completed; result retrievable.
    Completed,
}

impl TaskState {
    /// The wire name of the state.
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskState::Queued => "queued",
            TaskState::Expired => "expired",
            TaskState::Missing => "missing",
            TaskState::Completed => "completed",
        }
    }
}

/// Index record kept per task, keyed by task id.
///
/// The record mirrors what the queues are doing with the task without
/// being authoritative for dispatch: the broker still decides redelivery
/// through queue TTLs. Deadlines recorded here let `status` derive where
/// the broker must have routed the message without scanning queues.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TaskRecord {
    pub task_id: TaskId,
    pub task_type: String,
    pub payload: serde_json::Value,
    pub phase: TaskPhase,
    pub result: Option<serde_json::Value>,
    pub submitted_at: DateTime<Utc>,
    /// When the ready-queue copy dead-letters if never fetched.
    pub ready_deadline: DateTime<Utc>,
    /// When the current lease expires, if the task has been fetched.
    pub lease_deadline: Option<DateTime<Utc>>,
}

impl TaskRecord {
    /// Record for a freshly submitted task.
    pub fn new(task: &Task, now: DateTime<Utc>, ready_ttl: Duration) -> Self {
        Self {
            task_id: task.task_id,
            task_type: task.task_type.clone(),
            payload: task.payload.clone(),
            phase: TaskPhase::Queued,
            result: None,
            submitted_at: now,
            ready_deadline: now + ready_ttl,
            lease_deadline: None,
        }
    }

    /// Mark the task leased as of `now`.
    pub fn lease(&mut self, now: DateTime<Utc>, lease_ttl: Duration) {
        self.phase = TaskPhase::Leased;
        self.lease_deadline = Some(now + lease_ttl);
    }

    /// Attach a result and mark the task completed.
    pub fn complete(&mut self, result: serde_json::Value) {
        self.phase = TaskPhase::Completed;
        self.result = Some(result);
    }

    /// Derive the externally reported state at `now`.
    ///
    /// A queued task past its ready deadline has been dead-lettered. A
    /// leased task past its lease deadline has been returned to the ready
    /// queue with a fresh ready TTL; only once that second window has
    /// also passed without a re-fetch (which would refresh this record)
    /// can the task have reached the dead-letter queue.
    pub fn reported_state(&self, now: DateTime<Utc>, ready_ttl: Duration) -> TaskState {
        match self.phase {
            TaskPhase::Completed => TaskState::Completed,
            TaskPhase::Queued => {
                if now > self.ready_deadline {
                    TaskState::Expired
                } else {
                    TaskState::Queued
                }
            }
            TaskPhase::Leased => match self.lease_deadline {
                Some(deadline) if now > deadline + ready_ttl => TaskState::Expired,
                _ => TaskState::Queued,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn ttl() -> Duration {
        Duration::milliseconds(300_000)
    }

    #[test]
    fn test_task_wire_shape() {
        let task = Task::new("demo", json!({"x": 1}));
        let wire = serde_json::to_value(&task).unwrap();

        assert_eq!(wire["task_type"], "demo");
        assert_eq!(wire["payload"], json!({"x": 1}));
        assert_eq!(wire["result"], serde_json::Value::Null);
        assert!(wire["task_id"].is_string());
    }

    #[test]
    fn test_task_ids_are_unique() {
        let a = Task::new("demo", json!({}));
        let b = Task::new("demo", json!({}));
        assert_ne!(a.task_id, b.task_id);
    }

    #[test]
    fn test_fresh_record_is_queued() {
        let now = Utc::now();
        let task = Task::new("demo", json!({}));
        let record = TaskRecord::new(&task, now, ttl());

        assert_eq!(record.phase, TaskPhase::Queued);
        assert_eq!(record.reported_state(now, ttl()), TaskState::Queued);
    }

    #[test]
    fn test_unfetched_record_expires_past_ready_deadline() {
        let now = Utc::now();
        let task = Task::new("demo", json!({}));
        let record = TaskRecord::new(&task, now, ttl());

        let later = now + ttl() + Duration::seconds(1);
        assert_eq!(record.reported_state(later, ttl()), TaskState::Expired);
    }

    #[test]
    fn test_leased_record_reports_queued() {
        let now = Utc::now();
        let task = Task::new("demo", json!({}));
        let mut record = TaskRecord::new(&task, now, ttl());
        record.lease(now, ttl());

        assert_eq!(record.reported_state(now, ttl()), TaskState::Queued);
    }

    #[test]
    fn test_expired_lease_still_queued_within_redelivery_window() {
        // Lease expired -> broker re-routed the task to the ready queue,
        // where it gets a fresh ready TTL before it can dead-letter.
        let now = Utc::now();
        let task = Task::new("demo", json!({}));
        let mut record = TaskRecord::new(&task, now, ttl());
        record.lease(now, ttl());

        let after_lease = now + ttl() + Duration::seconds(1);
        assert_eq!(record.reported_state(after_lease, ttl()), TaskState::Queued);

        let after_redelivery_window = now + ttl() + ttl() + Duration::seconds(1);
        assert_eq!(
            record.reported_state(after_redelivery_window, ttl()),
            TaskState::Expired
        );
    }

    #[test]
    fn test_completed_record_never_expires() {
        let now = Utc::now();
        let task = Task::new("demo", json!({}));
        let mut record = TaskRecord::new(&task, now, ttl());
        record.lease(now, ttl());
        record.complete(json!({"y": 2}));

        let much_later = now + ttl() + ttl() + Duration::days(1);
        assert_eq!(
            record.reported_state(much_later, ttl()),
            TaskState::Completed
        );
        assert_eq!(record.result, Some(json!({"y": 2})));
    }

    #[test]
    fn test_record_serde_roundtrip() {
        let now = Utc::now();
        let task = Task::new("demo", json!({"x": 1}));
        let mut record = TaskRecord::new(&task, now, ttl());
        record.lease(now, ttl());

        let json = serde_json::to_string(&record).unwrap();
        let parsed: TaskRecord = serde_json::from_str(&json).unwrap();

        assert_eq!(parsed.task_id, record.task_id);
        assert_eq!(parsed.phase, TaskPhase::Leased);
        assert_eq!(parsed.lease_deadline, record.lease_deadline);
    }

    #[test]
    fn test_state_wire_names() {
        assert_eq!(TaskState::Queued.as_str(), "queued");
        assert_eq!(TaskState::Expired.as_str(), "expired");
        assert_eq!(TaskState::Missing.as_str(), "missing");
        assert_eq!(TaskState::Completed.as_str(), "completed");
        assert_eq!(
            serde_json::to_value(TaskState::Completed).unwrap(),
            serde_json::json!("completed")
        );
    }
}

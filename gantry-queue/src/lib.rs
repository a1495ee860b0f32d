//! Lease-based job queues for the Gantry broker.
//!
//! A task type owns a four-queue family (ready, lease, result,
//! dead-letter) declared with TTL and dead-letter routing so that the
//! broker itself drives redelivery: a fetched-but-never-completed task
//! falls out of the lease queue back into the ready queue, and a task
//! nobody ever fetches falls into the dead-letter queue.
//!
//! Alongside the queues, the manager keeps a Redis index record per task.
//! The queues stay the durable log and dispatch order; the index answers
//! `complete`/`status`/`result` by task id in one lookup instead of the
//! scan-and-requeue the queue shapes would otherwise force.
//!
//! ## Quick start
//!
//! ```rust,ignore
//! use gantry_queue::JobQueueManager;
//!
//! async fn example(manager: &JobQueueManager) -> gantry_queue::QueueResult<()> {
//!     let task_id = manager.submit("demo", serde_json::json!({"x": 1})).await?;
//!
//!     if let Some(fetched) = manager.fetch("demo").await? {
//!         // ... work ...
//!         manager
//!             .complete("demo", fetched.task_id, serde_json::json!({"y": 2}))
//!             .await?;
//!     }
//!
//!     let state = manager.status("demo", task_id).await?;
//!     println!("{state:?}");
//!     Ok(())
//! }
//! ```

pub mod error;
pub mod manager;
pub mod task;

pub use error::{QueueError, QueueResult};
pub use manager::{FetchedTask, JobQueueManager};
pub use task::{Task, TaskId, TaskPhase, TaskRecord, TaskState};

/// Re-export commonly used types.
pub mod prelude {
    pub use crate::error::{QueueError, QueueResult};
    pub use crate::manager::{FetchedTask, JobQueueManager};
    pub use crate::task::{Task, TaskId, TaskPhase, TaskRecord, TaskState};
}

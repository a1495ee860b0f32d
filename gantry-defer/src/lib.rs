//! # Gantry Defer
//!
//! Deferred execution for any HTTP request. A tower [`DeferLayer`]
//! intercepts requests flagged with `X-Async-Request: true`, answers
//! `202 {"job_id"}` immediately, and re-dispatches the buffered request
//! through the same in-process service stack in the background — no
//! loopback call to the process's own listening socket.
//!
//! The eventual response is snapshotted (status, headers, body) and
//! either pushed to the `X-Async-Webhook-URL` target or written once to
//! a [`SnapshotStore`] for polling. Background executions are owned by a
//! [`Supervisor`] until they finish, so none is dropped mid-flight, and
//! a failed execution persists a failure snapshot instead of silently
//! losing the outcome.

pub mod error;
pub mod layer;
pub mod snapshot;
pub mod store;
pub mod supervisor;
pub mod webhook;

pub use error::{DeferError, DeferResult};
pub use layer::{DeferLayer, DeferService};
pub use snapshot::{
    JobId, ResponseSnapshot, ASYNC_REQUEST_HEADER, ASYNC_WEBHOOK_HEADER, JOB_ID_HEADER,
};
pub use store::{MemorySnapshotStore, RedisSnapshotStore, SnapshotStore};
pub use supervisor::Supervisor;
pub use webhook::WebhookNotifier;

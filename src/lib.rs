//! # Gantry
//!
//! Durable task brokering over RabbitMQ and Redis.
//!
//! Gantry decouples callers from long-running compute services across an
//! asynchronous broker while keeping completion state queryable. It ships
//! three mechanisms that share that goal:
//!
//! - **Job queues** ([`gantry_queue`]) — per-task-type queue families with
//!   lease-based redelivery and dead-lettering, fronted by submit/fetch/
//!   complete/status/result operations.
//! - **RPC bridge** ([`gantry_bridge`]) — a correlation-ID request/reply
//!   pair that makes a broker round-trip look like a blocking call.
//! - **Deferred execution** ([`gantry_defer`]) — a tower middleware that
//!   turns any HTTP request into a background job with a pollable or
//!   webhook-delivered result.
//!
//! The supporting layers are [`gantry_broker`] (AMQP topology and channel
//! plumbing) and [`gantry_cache`] (Redis-backed records and snapshots).
//! The deployable HTTP service lives in the `gantry-server` binary crate.

pub use gantry_bridge as bridge;
pub use gantry_broker as broker;
pub use gantry_cache as cache;
pub use gantry_defer as defer;
pub use gantry_queue as queue;

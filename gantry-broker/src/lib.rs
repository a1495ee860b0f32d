//! # Gantry Broker
//!
//! AMQP plumbing shared by every Gantry component: connection management
//! with bounded retry, per-task-type queue topology (TTL and dead-letter
//! routing), persistent JSON publishing, head-of-queue pops, and the
//! ephemeral reply queues behind correlation-ID RPC.
//!
//! Everything here is broker mechanics. The semantics built on top — job
//! leases, RPC matching, deferred execution — live in the sibling crates.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gantry_broker::{Broker, BrokerConfig, Envelope, QueueFamily};
//!
//! async fn example() -> Result<(), gantry_broker::BrokerError> {
//!     let broker = Broker::connect(&BrokerConfig::new("amqp://localhost:5672")).await?;
//!     let channel = broker.channel().await?;
//!
//!     let family = QueueFamily::new("demo");
//!     family.declare(&channel, broker.config()).await?;
//!
//!     let envelope = Envelope::json(&serde_json::json!({"x": 1}))?;
//!     gantry_broker::publish(&channel, &family.ready(), &envelope, true).await?;
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod connection;
pub mod error;
pub mod message;
pub mod reply;
pub mod topology;

pub use config::BrokerConfig;
pub use connection::Broker;
pub use error::{BrokerError, Result};
pub use message::{ack, pop, publish, requeue, Envelope, Popped};
pub use reply::ReplyQueue;
pub use topology::QueueFamily;

// Re-export lapin for callers that need channel-level access.
pub use lapin;

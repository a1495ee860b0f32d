//! # Gantry Cache
//!
//! Redis-backed record store. Two things live here: the task index the
//! job queue keeps alongside its AMQP queues (state lookup by task id
//! without scanning), and the response snapshots of deferred HTTP jobs.
//! Both are JSON records under a common key prefix with a shared
//! retention policy.
//!
//! ## Example
//!
//! ```rust,ignore
//! use gantry_cache::{CacheConfig, CacheStore};
//!
//! async fn example() -> gantry_cache::Result<()> {
//!     let store = CacheStore::connect(CacheConfig::new("redis://localhost:6379")).await?;
//!     store.put_json("task:abc", &serde_json::json!({"state": "queued"})).await?;
//!     let record: Option<serde_json::Value> = store.get_json("task:abc").await?;
//!     assert!(record.is_some());
//!     Ok(())
//! }
//! ```

mod config;
mod error;
mod store;

pub use config::CacheConfig;
pub use error::{CacheError, Result};
pub use store::CacheStore;

// Re-export redis for callers that need raw command access.
pub use redis;

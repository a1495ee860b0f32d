//! HTTP surface for Gantry.
//!
//! Exposes the job broker operations, the RPC proxy, and deferred-job
//! result lookup over axum, with the deferred-execution middleware
//! wrapped around every route. All state lives in an [`context::AppContext`]
//! constructed once at startup and passed to handlers through axum's
//! `State` — there are no process-wide singletons.

pub mod app;
pub mod config;
pub mod context;
pub mod error;
pub mod routes;

/// Initialize process-wide tracing.
///
/// Safe to call multiple times (subsequent calls are no-ops).
pub fn init_tracing() {
    use tracing_subscriber::EnvFilter;

    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .try_init();
}

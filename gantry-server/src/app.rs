//! Router construction.

use axum::routing::{get, post};
use axum::Router;
use gantry_defer::{DeferLayer, WebhookNotifier};

use crate::context::AppContext;
use crate::routes;

/// Build the application router.
///
/// The deferred-execution layer wraps every route, so any endpoint —
/// including the proxy and the broker surface — can be invoked with
/// `X-Async-Request: true` and polled later via `/job_result/{job_id}`.
pub fn build_app(ctx: AppContext) -> Router {
    let defer = DeferLayer::new(
        ctx.jobs.clone(),
        ctx.supervisor.clone(),
        WebhookNotifier::default(),
    );

    Router::new()
        .route("/submit/:task_type", post(routes::broker::submit))
        .route("/fetch_job/:task_type", post(routes::broker::fetch_job))
        .route(
            "/complete/:task_type/:task_id",
            post(routes::broker::complete),
        )
        .route("/status/:task_type/:task_id", get(routes::broker::status))
        .route("/result/:task_type/:task_id", get(routes::broker::result))
        .route("/proxy/:service", post(routes::proxy::proxy))
        .route("/job_result/:job_id", get(routes::jobs::job_result))
        .layer(defer)
        .with_state(ctx)
}

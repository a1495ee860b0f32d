//! Deferred-job result lookup.

use axum::extract::{Path, State};
use axum::response::Response;
use gantry_defer::JobId;

use crate::context::AppContext;
use crate::error::ApiError;

/// `GET /job_result/{job_id}` — replays the stored response verbatim.
///
/// Not-Found covers both "still running" and "never existed"; the store
/// deliberately cannot tell them apart.
pub async fn job_result(
    State(ctx): State<AppContext>,
    Path(job_id): Path<JobId>,
) -> Result<Response, ApiError> {
    match ctx.jobs.get(job_id).await? {
        Some(snapshot) => Ok(snapshot.into_response()),
        None => Err(ApiError::NotFound(format!("No result for job {job_id}"))),
    }
}

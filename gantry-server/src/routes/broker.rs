//! Job broker endpoints: submit, fetch, complete, status, result.

use axum::extract::{Path, State};
use axum::Json;
use gantry_queue::{TaskId, TaskState};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::context::AppContext;
use crate::error::ApiError;

#[derive(Debug, Deserialize)]
pub struct SubmitRequest {
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct SubmitResponse {
    pub task_id: TaskId,
}

#[derive(Debug, Serialize)]
pub struct FetchJobResponse {
    pub task_id: TaskId,
    pub payload: Value,
}

#[derive(Debug, Deserialize)]
pub struct CompleteRequest {
    pub result: Value,
}

#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub task_id: TaskId,
    pub state: TaskState,
}

#[derive(Debug, Serialize)]
pub struct ResultResponse {
    pub task_id: TaskId,
    pub state: TaskState,
    pub result: Value,
}

/// `POST /submit/{task_type}`
pub async fn submit(
    State(ctx): State<AppContext>,
    Path(task_type): Path<String>,
    Json(req): Json<SubmitRequest>,
) -> Result<Json<SubmitResponse>, ApiError> {
    let task_id = ctx.queue.submit(&task_type, req.payload).await?;
    Ok(Json(SubmitResponse { task_id }))
}

/// `POST /fetch_job/{task_type}`
pub async fn fetch_job(
    State(ctx): State<AppContext>,
    Path(task_type): Path<String>,
) -> Result<Json<FetchJobResponse>, ApiError> {
    match ctx.queue.fetch(&task_type).await? {
        Some(fetched) => Ok(Json(FetchJobResponse {
            task_id: fetched.task_id,
            payload: fetched.payload,
        })),
        None => Err(ApiError::NotFound("No pending jobs".to_string())),
    }
}

/// `POST /complete/{task_type}/{task_id}`
pub async fn complete(
    State(ctx): State<AppContext>,
    Path((task_type, task_id)): Path<(String, TaskId)>,
    Json(req): Json<CompleteRequest>,
) -> Result<Json<Value>, ApiError> {
    ctx.queue.complete(&task_type, task_id, req.result).await?;
    Ok(Json(serde_json::json!({"status": "ok"})))
}

/// `GET /status/{task_type}/{task_id}` — never 404s; unknown ids report
/// the `missing` state.
pub async fn status(
    State(ctx): State<AppContext>,
    Path((task_type, task_id)): Path<(String, TaskId)>,
) -> Result<Json<StatusResponse>, ApiError> {
    let state = ctx.queue.status(&task_type, task_id).await?;
    Ok(Json(StatusResponse { task_id, state }))
}

/// `GET /result/{task_type}/{task_id}`
pub async fn result(
    State(ctx): State<AppContext>,
    Path((task_type, task_id)): Path<(String, TaskId)>,
) -> Result<Json<ResultResponse>, ApiError> {
    let result = ctx.queue.result(&task_type, task_id).await?;
    Ok(Json(ResultResponse {
        task_id,
        state: TaskState::Completed,
        result,
    }))
}

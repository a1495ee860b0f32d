//! RPC proxy endpoint.

use axum::extract::{Path, State};
use axum::Json;
use serde_json::Value;

use crate::context::AppContext;
use crate::error::ApiError;

/// `POST /proxy/{service}` — forwards the body to the service's request
/// queue and blocks until the correlated reply arrives (bounded by the
/// configured reply timeout). The downstream body comes back verbatim.
pub async fn proxy(
    State(ctx): State<AppContext>,
    Path(service): Path<String>,
    Json(payload): Json<Value>,
) -> Result<Json<Value>, ApiError> {
    let reply = ctx.rpc.call(&service, payload).await?;
    Ok(Json(reply))
}

//! API error mapping.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use thiserror::Error;

/// Errors surfaced by the HTTP handlers.
#[derive(Debug, Error)]
pub enum ApiError {
    /// The requested task, result, or job does not exist.
    #[error("{0}")]
    NotFound(String),

    /// The broker could not be reached.
    #[error("{0}")]
    BrokerUnavailable(String),

    /// The RPC reply did not arrive in time.
    #[error("{0}")]
    GatewayTimeout(String),

    /// Anything else.
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// The HTTP status this error maps to.
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::BrokerUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            ApiError::GatewayTimeout(_) => StatusCode::GATEWAY_TIMEOUT,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::error!(%status, detail = %self, "Request failed");
        }
        (status, Json(json!({"detail": self.to_string()}))).into_response()
    }
}

impl From<gantry_queue::QueueError> for ApiError {
    fn from(err: gantry_queue::QueueError) -> Self {
        if err.is_not_found() {
            ApiError::NotFound(err.to_string())
        } else if err.is_broker_unavailable() {
            ApiError::BrokerUnavailable(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<gantry_bridge::BridgeError> for ApiError {
    fn from(err: gantry_bridge::BridgeError) -> Self {
        if err.is_timeout() {
            ApiError::GatewayTimeout(err.to_string())
        } else {
            ApiError::Internal(err.to_string())
        }
    }
}

impl From<gantry_defer::DeferError> for ApiError {
    fn from(err: gantry_defer::DeferError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<gantry_cache::CacheError> for ApiError {
    fn from(err: gantry_cache::CacheError) -> Self {
        ApiError::Internal(err.to_string())
    }
}

impl From<gantry_broker::BrokerError> for ApiError {
    fn from(err: gantry_broker::BrokerError) -> Self {
        match &err {
            gantry_broker::BrokerError::Unavailable { .. } => {
                ApiError::BrokerUnavailable(err.to_string())
            }
            _ => ApiError::Internal(err.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_mapping() {
        assert_eq!(
            ApiError::NotFound("x".into()).status(),
            StatusCode::NOT_FOUND
        );
        assert_eq!(
            ApiError::BrokerUnavailable("x".into()).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            ApiError::GatewayTimeout("x".into()).status(),
            StatusCode::GATEWAY_TIMEOUT
        );
        assert_eq!(
            ApiError::Internal("x".into()).status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_queue_not_found_maps_to_404() {
        let err = gantry_queue::QueueError::TaskNotFound(uuid::Uuid::new_v4());
        assert_eq!(ApiError::from(err).status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn test_reply_timeout_maps_to_504() {
        let err = gantry_bridge::BridgeError::ReplyTimeout {
            service: "addition".into(),
            timeout: std::time::Duration::from_secs(30),
        };
        assert_eq!(ApiError::from(err).status(), StatusCode::GATEWAY_TIMEOUT);
    }
}

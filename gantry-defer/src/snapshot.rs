//! Response snapshots of deferred executions.

use axum::body::Body;
use axum::http::{HeaderName, HeaderValue, Response, StatusCode};
use axum::response::IntoResponse;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Deferred job identifier.
pub type JobId = Uuid;

/// Request header that flags a request for deferral.
pub const ASYNC_REQUEST_HEADER: &str = "x-async-request";

/// Request header naming a webhook target for the eventual result.
pub const ASYNC_WEBHOOK_HEADER: &str = "x-async-webhook-url";

/// Header tagging webhook deliveries with the originating job.
pub const JOB_ID_HEADER: &str = "x-job-id";

/// A captured response: everything needed to replay it verbatim.
///
/// Written exactly once per job, by the background execution.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResponseSnapshot {
    pub status: u16,
    pub headers: Vec<(String, String)>,
    pub body: Vec<u8>,
}

impl ResponseSnapshot {
    /// Snapshot recording a background execution that failed before
    /// producing a response.
    pub fn failure(detail: impl Into<String>) -> Self {
        let body = serde_json::json!({"detail": detail.into()});
        Self {
            status: StatusCode::BAD_GATEWAY.as_u16(),
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: body.to_string().into_bytes(),
        }
    }

    /// Whether this snapshot records a failed execution.
    pub fn is_failure(&self) -> bool {
        self.status == StatusCode::BAD_GATEWAY.as_u16()
    }

    /// The body parsed as JSON when possible, else a lossy string.
    pub fn body_json(&self) -> serde_json::Value {
        serde_json::from_slice(&self.body).unwrap_or_else(|_| {
            serde_json::Value::String(String::from_utf8_lossy(&self.body).into_owned())
        })
    }

    /// Rebuild the HTTP response this snapshot captured.
    pub fn into_response(self) -> Response<Body> {
        let status = StatusCode::from_u16(self.status).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
        let mut response = Response::builder().status(status);

        if let Some(headers) = response.headers_mut() {
            for (name, value) in &self.headers {
                if let (Ok(name), Ok(value)) = (
                    name.parse::<HeaderName>(),
                    HeaderValue::from_str(value),
                ) {
                    headers.append(name, value);
                }
            }
        }

        match response.body(Body::from(self.body)) {
            Ok(response) => response,
            Err(_) => StatusCode::INTERNAL_SERVER_ERROR.into_response(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_snapshot() {
        let snapshot = ResponseSnapshot::failure("handler dispatch failed");
        assert_eq!(snapshot.status, 502);
        assert!(snapshot.is_failure());
        assert_eq!(
            snapshot.body_json()["detail"],
            "handler dispatch failed"
        );
    }

    #[test]
    fn test_snapshot_serde_roundtrip() {
        let snapshot = ResponseSnapshot {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: br#"{"ok":true}"#.to_vec(),
        };

        let json = serde_json::to_string(&snapshot).unwrap();
        let parsed: ResponseSnapshot = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed, snapshot);
    }

    #[test]
    fn test_body_json_falls_back_to_string() {
        let snapshot = ResponseSnapshot {
            status: 200,
            headers: vec![],
            body: b"plain text".to_vec(),
        };
        assert_eq!(
            snapshot.body_json(),
            serde_json::Value::String("plain text".to_string())
        );
    }

    #[test]
    fn test_into_response_replays_status_and_headers() {
        let snapshot = ResponseSnapshot {
            status: 201,
            headers: vec![("x-custom".to_string(), "yes".to_string())],
            body: b"created".to_vec(),
        };

        let response = snapshot.into_response();
        assert_eq!(response.status(), StatusCode::CREATED);
        assert_eq!(response.headers().get("x-custom").unwrap(), "yes");
    }
}

//! The deferred-execution middleware.

use std::convert::Infallible;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::task::{Context, Poll};

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;
use tower::{Layer, Service, ServiceExt};
use tracing::{error, info};
use uuid::Uuid;

use crate::snapshot::{ASYNC_REQUEST_HEADER, ASYNC_WEBHOOK_HEADER};
use crate::{JobId, ResponseSnapshot, SnapshotStore, Supervisor, WebhookNotifier};

const DEFAULT_MAX_BODY: usize = 10 * 1024 * 1024;

#[derive(Clone)]
struct DeferState {
    store: Arc<dyn SnapshotStore>,
    supervisor: Supervisor,
    notifier: WebhookNotifier,
    max_body: usize,
}

/// Layer that turns flagged requests into background jobs.
///
/// Requests without the `X-Async-Request: true` header pass through
/// untouched. Flagged requests are buffered, acknowledged with
/// `202 {"job_id"}`, and re-dispatched through a clone of the wrapped
/// service — the execution stays in-process and sees the same headers
/// (minus the two control headers) the caller sent.
#[derive(Clone)]
pub struct DeferLayer {
    state: DeferState,
}

impl DeferLayer {
    /// Create the layer.
    pub fn new(
        store: Arc<dyn SnapshotStore>,
        supervisor: Supervisor,
        notifier: WebhookNotifier,
    ) -> Self {
        Self {
            state: DeferState {
                store,
                supervisor,
                notifier,
                max_body: DEFAULT_MAX_BODY,
            },
        }
    }

    /// Set the maximum buffered request/response body size.
    pub fn with_max_body(mut self, max_body: usize) -> Self {
        self.state.max_body = max_body;
        self
    }
}

impl<S> Layer<S> for DeferLayer {
    type Service = DeferService<S>;

    fn layer(&self, inner: S) -> Self::Service {
        DeferService {
            inner,
            state: self.state.clone(),
        }
    }
}

/// Service produced by [`DeferLayer`].
#[derive(Clone)]
pub struct DeferService<S> {
    inner: S,
    state: DeferState,
}

impl<S> Service<Request<Body>> for DeferService<S>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible>
        + Clone
        + Send
        + 'static,
    S::Future: Send,
{
    type Response = Response;
    type Error = Infallible;
    type Future = Pin<Box<dyn Future<Output = Result<Response, Infallible>> + Send>>;

    fn poll_ready(&mut self, cx: &mut Context<'_>) -> Poll<Result<(), Self::Error>> {
        self.inner.poll_ready(cx)
    }

    fn call(&mut self, req: Request<Body>) -> Self::Future {
        if !is_flagged(&req) {
            return Box::pin(self.inner.call(req));
        }

        let inner = self.inner.clone();
        let state = self.state.clone();

        Box::pin(async move {
            let response = match defer(inner, state, req).await {
                Ok(job_id) => (
                    StatusCode::ACCEPTED,
                    Json(json!({"job_id": job_id})),
                )
                    .into_response(),
                Err(response) => response,
            };
            Ok(response)
        })
    }
}

fn is_flagged(req: &Request<Body>) -> bool {
    req.headers()
        .get(ASYNC_REQUEST_HEADER)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.eq_ignore_ascii_case("true"))
}

/// Buffer the request, register the background execution, and hand back
/// the job id.
async fn defer<S>(inner: S, state: DeferState, req: Request<Body>) -> Result<JobId, Response>
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Send + 'static,
    S::Future: Send,
{
    let (mut parts, body) = req.into_parts();
    let body = to_bytes(body, state.max_body).await.map_err(|e| {
        (
            StatusCode::BAD_REQUEST,
            Json(json!({"detail": format!("failed to read request body: {e}")})),
        )
            .into_response()
    })?;

    parts.headers.remove(ASYNC_REQUEST_HEADER);
    let callback = parts
        .headers
        .remove(ASYNC_WEBHOOK_HEADER)
        .and_then(|value| value.to_str().ok().map(str::to_string));

    let job_id = Uuid::new_v4();
    info!(%job_id, method = %parts.method, uri = %parts.uri, "Deferring request");

    let supervisor = state.supervisor.clone();
    supervisor.spawn(job_id, async move {
        let request = Request::from_parts(parts, Body::from(body));
        let snapshot = execute(inner, request, state.max_body).await;

        match callback {
            Some(target) => {
                if let Err(e) = state.notifier.deliver(&target, job_id, &snapshot).await {
                    error!(%job_id, target, error = %e, "Webhook delivery failed");
                }
            }
            None => {
                if let Err(e) = state.store.put(job_id, &snapshot).await {
                    error!(%job_id, error = %e, "Failed to store deferred result");
                }
            }
        }
    });

    Ok(job_id)
}

/// Run the buffered request through the service stack and capture the
/// response. Failures become failure snapshots; they are never dropped.
async fn execute<S>(inner: S, request: Request<Body>, max_body: usize) -> ResponseSnapshot
where
    S: Service<Request<Body>, Response = Response, Error = Infallible> + Send + 'static,
    S::Future: Send,
{
    use futures::FutureExt;

    let dispatch = std::panic::AssertUnwindSafe(inner.oneshot(request)).catch_unwind();
    let response = match dispatch.await {
        Ok(Ok(response)) => response,
        Ok(Err(never)) => match never {},
        Err(_) => {
            error!("Deferred handler panicked");
            return ResponseSnapshot::failure("deferred handler panicked");
        }
    };

    let (parts, body) = response.into_parts();
    let body = match to_bytes(body, max_body).await {
        Ok(bytes) => bytes,
        Err(e) => {
            error!(error = %e, "Failed to read deferred response body");
            return ResponseSnapshot::failure(format!("failed to read response body: {e}"));
        }
    };

    let headers = parts
        .headers
        .iter()
        .filter_map(|(name, value)| {
            value
                .to_str()
                .ok()
                .map(|value| (name.as_str().to_string(), value.to_string()))
        })
        .collect();

    ResponseSnapshot {
        status: parts.status.as_u16(),
        headers,
        body: body.to_vec(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MemorySnapshotStore;
    use axum::routing::{get, post};
    use axum::Router;
    use wiremock::matchers::{header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn app(store: Arc<MemorySnapshotStore>, supervisor: Supervisor) -> Router {
        let layer = DeferLayer::new(store, supervisor, WebhookNotifier::default());
        Router::new()
            .route(
                "/echo",
                post(|body: String| async move {
                    (
                        [("x-handler", "echo")],
                        Json(json!({"echoed": body})),
                    )
                }),
            )
            .route(
                "/flagged",
                get(|req: Request<Body>| async move {
                    // The control header must not reach the handler.
                    Json(json!({
                        "saw_flag": req.headers().contains_key(ASYNC_REQUEST_HEADER),
                    }))
                }),
            )
            .layer(layer)
    }

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_unflagged_requests_pass_through() {
        let store = Arc::new(MemorySnapshotStore::new());
        let app = app(store.clone(), Supervisor::new());

        let response = app
            .oneshot(
                Request::post("/echo")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(body_json(response).await["echoed"], "hello");
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_flagged_request_returns_job_id_then_snapshot() {
        let store = Arc::new(MemorySnapshotStore::new());
        let supervisor = Supervisor::new();
        let app = app(store.clone(), supervisor.clone());

        let response = app
            .clone()
            .oneshot(
                Request::post("/echo")
                    .header(ASYNC_REQUEST_HEADER, "true")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        let job_id: JobId = body_json(response).await["job_id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();

        supervisor.wait_idle().await;

        let snapshot = store.get(job_id).await.unwrap().expect("snapshot written");
        assert_eq!(snapshot.status, 200);
        assert_eq!(snapshot.body_json()["echoed"], "hello");
        assert!(snapshot
            .headers
            .iter()
            .any(|(name, value)| name == "x-handler" && value == "echo"));

        // Identical to what the unflagged path would have produced.
        let direct = app
            .oneshot(
                Request::post("/echo")
                    .body(Body::from("hello"))
                    .unwrap(),
            )
            .await
            .unwrap();
        assert_eq!(snapshot.status, direct.status().as_u16());
        assert_eq!(snapshot.body_json(), body_json(direct).await);
    }

    #[tokio::test]
    async fn test_control_headers_are_stripped() {
        let store = Arc::new(MemorySnapshotStore::new());
        let supervisor = Supervisor::new();
        let app = app(store.clone(), supervisor.clone());

        let response = app
            .oneshot(
                Request::get("/flagged")
                    .header(ASYNC_REQUEST_HEADER, "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let job_id: JobId = body_json(response).await["job_id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        supervisor.wait_idle().await;

        let snapshot = store.get(job_id).await.unwrap().unwrap();
        assert_eq!(snapshot.body_json()["saw_flag"], false);
    }

    #[tokio::test]
    async fn test_webhook_target_receives_snapshot_and_nothing_is_stored() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists(crate::JOB_ID_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let store = Arc::new(MemorySnapshotStore::new());
        let supervisor = Supervisor::new();
        let app = app(store.clone(), supervisor.clone());

        let response = app
            .oneshot(
                Request::post("/echo")
                    .header(ASYNC_REQUEST_HEADER, "true")
                    .header(ASYNC_WEBHOOK_HEADER, server.uri())
                    .body(Body::from("push me"))
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::ACCEPTED);
        supervisor.wait_idle().await;

        // Pushed, not persisted.
        assert!(store.is_empty());
        let requests = server.received_requests().await.unwrap();
        let payload: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(payload["status"], 200);
        assert_eq!(payload["body"]["echoed"], "push me");
    }

    #[tokio::test]
    async fn test_panicking_handler_leaves_failure_snapshot() {
        let store = Arc::new(MemorySnapshotStore::new());
        let supervisor = Supervisor::new();
        let layer = DeferLayer::new(
            store.clone(),
            supervisor.clone(),
            WebhookNotifier::default(),
        );
        async fn boom() -> Json<serde_json::Value> {
            panic!("kaboom")
        }
        let app = Router::new().route("/boom", post(boom)).layer(layer);

        let response = app
            .oneshot(
                Request::post("/boom")
                    .header(ASYNC_REQUEST_HEADER, "true")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        let job_id: JobId = body_json(response).await["job_id"]
            .as_str()
            .unwrap()
            .parse()
            .unwrap();
        supervisor.wait_idle().await;

        let snapshot = store.get(job_id).await.unwrap().expect("failure recorded");
        assert!(snapshot.is_failure());
    }
}

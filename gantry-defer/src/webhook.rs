//! Webhook delivery of deferred results.

use std::time::Duration;

use serde_json::json;
use tracing::{debug, info};

use crate::{DeferResult, JobId, ResponseSnapshot, JOB_ID_HEADER};

/// Pushes completed snapshots to caller-designated webhook targets.
#[derive(Debug, Clone)]
pub struct WebhookNotifier {
    client: reqwest::Client,
}

impl Default for WebhookNotifier {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl WebhookNotifier {
    /// Create a notifier with the given delivery timeout.
    pub fn new(timeout: Duration) -> Self {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Self { client }
    }

    /// POST a snapshot to the target, tagged with the job id.
    ///
    /// The payload carries the captured status, headers and body; the
    /// `X-Job-Id` header carries the job id for correlation on the
    /// receiving side.
    pub async fn deliver(
        &self,
        target: &str,
        job_id: JobId,
        snapshot: &ResponseSnapshot,
    ) -> DeferResult<()> {
        let payload = json!({
            "job_id": job_id,
            "status": snapshot.status,
            "headers": snapshot
                .headers
                .iter()
                .map(|(k, v)| (k.clone(), serde_json::Value::String(v.clone())))
                .collect::<serde_json::Map<String, serde_json::Value>>(),
            "body": snapshot.body_json(),
        });

        debug!(%job_id, target, "Delivering deferred result");

        let response = self
            .client
            .post(target)
            .header(JOB_ID_HEADER, job_id.to_string())
            .json(&payload)
            .send()
            .await?
            .error_for_status()?;

        info!(%job_id, target, status = %response.status(), "Deferred result delivered");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{header_exists, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_delivery_tags_job_id() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(header_exists(JOB_ID_HEADER))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::default();
        let job_id = uuid::Uuid::new_v4();
        let snapshot = ResponseSnapshot {
            status: 200,
            headers: vec![("content-type".to_string(), "application/json".to_string())],
            body: br#"{"ok":true}"#.to_vec(),
        };

        notifier
            .deliver(&server.uri(), job_id, &snapshot)
            .await
            .unwrap();

        let requests = server.received_requests().await.unwrap();
        let payload: serde_json::Value = requests[0].body_json().unwrap();
        assert_eq!(payload["job_id"], job_id.to_string());
        assert_eq!(payload["status"], 200);
        assert_eq!(payload["body"]["ok"], true);
    }

    #[tokio::test]
    async fn test_delivery_failure_surfaces() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let notifier = WebhookNotifier::default();
        let snapshot = ResponseSnapshot::failure("x");
        let result = notifier
            .deliver(&server.uri(), uuid::Uuid::new_v4(), &snapshot)
            .await;

        assert!(result.is_err());
    }
}

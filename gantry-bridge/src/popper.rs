//! Server-side forwarder: request queue to downstream HTTP and back.

use futures_util::StreamExt;
use gantry_broker::lapin::options::{BasicConsumeOptions, BasicQosOptions, QueueDeclareOptions};
use gantry_broker::lapin::types::FieldTable;
use gantry_broker::{ack, publish, Broker, BrokerError, Envelope};
use serde_json::{json, Value};
use tracing::{error, info, warn};
use uuid::Uuid;

use crate::{request_queue, BridgeResult, PopperConfig};

/// Long-lived consumer that forwards a service's request queue to its
/// downstream HTTP endpoint.
///
/// One message at a time (prefetch 1): processing is serialized within a
/// process, and horizontal scale-out is additional popper processes
/// competing on the same queue.
pub struct Popper {
    broker: Broker,
    http: reqwest::Client,
    config: PopperConfig,
}

impl Popper {
    /// Create a popper over an established broker connection.
    pub fn new(broker: Broker, config: PopperConfig) -> Self {
        let http = reqwest::Client::builder()
            .timeout(config.forward_timeout)
            .build()
            .expect("Failed to build HTTP client");

        Self {
            broker,
            http,
            config,
        }
    }

    /// Consume the request queue until the consumer stream ends.
    ///
    /// Runs for the process lifetime under normal conditions; intended to
    /// be spawned once at startup.
    pub async fn run(&self) -> BridgeResult<()> {
        let queue = request_queue(&self.config.service);
        let channel = self.broker.channel().await?;

        channel
            .queue_declare(&queue, QueueDeclareOptions::default(), FieldTable::default())
            .await
            .map_err(BrokerError::from)?;
        channel
            .basic_qos(1, BasicQosOptions::default())
            .await
            .map_err(BrokerError::from)?;

        let consumer_tag = format!("gantry-popper-{}", Uuid::new_v4());
        let mut consumer = channel
            .basic_consume(
                &queue,
                &consumer_tag,
                BasicConsumeOptions::default(),
                FieldTable::default(),
            )
            .await
            .map_err(BrokerError::from)?;

        info!(
            service = %self.config.service,
            queue = %queue,
            downstream = %self.config.downstream_url,
            "Popper consuming"
        );

        while let Some(delivery) = consumer.next().await {
            match delivery {
                Ok(delivery) => {
                    let tag = delivery.delivery_tag;
                    let envelope = Envelope::from_delivery(&delivery);
                    if let Err(e) = self.handle(&channel, envelope, tag).await {
                        error!(service = %self.config.service, error = %e, "Failed to handle request");
                    }
                }
                Err(e) => {
                    error!(service = %self.config.service, error = %e, "Consumer error");
                    break;
                }
            }
        }

        warn!(service = %self.config.service, "Popper consumer stream ended");
        Ok(())
    }

    async fn handle(
        &self,
        channel: &gantry_broker::lapin::Channel,
        envelope: Envelope,
        delivery_tag: u64,
    ) -> BridgeResult<()> {
        let Some(reply_to) = envelope.reply_to.clone() else {
            warn!(service = %self.config.service, "Request without reply_to, dropping");
            ack(channel, delivery_tag).await?;
            return Ok(());
        };
        let correlation_id = envelope.correlation_id.clone().unwrap_or_default();

        let payload: Value = match envelope.parse_json() {
            Ok(payload) => payload,
            Err(e) => {
                warn!(service = %self.config.service, error = %e, "Undecodable request, dropping");
                ack(channel, delivery_tag).await?;
                return Ok(());
            }
        };

        let (body, status) = forward(&self.http, &self.config.downstream_url, &payload).await;

        let mut reply = Envelope::json(&body)?.with_correlation_id(correlation_id);
        if let Some(status) = status {
            reply = reply.with_header("x-status-code", status.to_string());
        }
        publish(channel, &reply_to, &reply, false).await?;
        ack(channel, delivery_tag).await?;
        Ok(())
    }
}

/// POST a payload to the downstream endpoint.
///
/// The downstream body is forwarded without inspecting its HTTP status;
/// the status is returned separately so callers can surface it as a
/// reply header. A transport failure yields an error envelope instead of
/// a body, so the caller's wait always resolves.
async fn forward(client: &reqwest::Client, url: &str, payload: &Value) -> (Value, Option<u16>) {
    match client.post(url).json(payload).send().await {
        Ok(response) => {
            let status = response.status().as_u16();
            match response.json::<Value>().await {
                Ok(body) => (body, Some(status)),
                Err(e) => (
                    json!({"error": format!("downstream returned a non-JSON body: {e}")}),
                    Some(status),
                ),
            }
        }
        Err(e) => (json!({"error": format!("downstream request failed: {e}")}), None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_forward_returns_body_and_status() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/add"))
            .and(body_json(json!({"a": 1.0, "b": 2.0})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"result": 3.0})))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let (body, status) = forward(
            &client,
            &format!("{}/add", server.uri()),
            &json!({"a": 1.0, "b": 2.0}),
        )
        .await;

        assert_eq!(status, Some(200));
        assert_eq!(body, json!({"result": 3.0}));
    }

    #[tokio::test]
    async fn test_forward_passes_error_bodies_through() {
        // Downstream failures are payloads, not errors: the body comes
        // back verbatim with the status alongside.
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(
                ResponseTemplate::new(500).set_body_json(json!({"detail": "boom"})),
            )
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let (body, status) = forward(&client, &server.uri(), &json!({})).await;

        assert_eq!(status, Some(500));
        assert_eq!(body, json!({"detail": "boom"}));
    }

    #[tokio::test]
    async fn test_forward_envelopes_transport_failures() {
        let client = reqwest::Client::new();
        let (body, status) = forward(&client, "http://127.0.0.1:1/unreachable", &json!({})).await;

        assert_eq!(status, None);
        assert!(body["error"].as_str().unwrap().contains("failed"));
    }

    #[tokio::test]
    async fn test_forward_handles_non_json_downstream() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_string("plain text"))
            .mount(&server)
            .await;

        let client = reqwest::Client::new();
        let (body, status) = forward(&client, &server.uri(), &json!({})).await;

        assert_eq!(status, Some(200));
        assert!(body["error"].as_str().unwrap().contains("non-JSON"));
    }
}

//! Message envelope and channel-level publish/pop primitives.

use std::collections::HashMap;

use lapin::message::Delivery;
use lapin::options::{BasicAckOptions, BasicGetOptions, BasicNackOptions, BasicPublishOptions};
use lapin::types::{AMQPValue, FieldTable};
use lapin::{BasicProperties, Channel};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{BrokerError, Result};

/// A message flowing through the broker.
///
/// Carries the payload bytes plus the AMQP properties Gantry cares about:
/// the correlation id and reply queue of the RPC bridge, and string
/// headers (used e.g. to surface a downstream status code on a reply).
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Message payload as bytes.
    pub payload: Vec<u8>,
    /// Correlation ID for request/reply matching.
    pub correlation_id: Option<String>,
    /// Reply queue name for request/reply flows.
    pub reply_to: Option<String>,
    /// Content type, `application/json` for every Gantry body.
    pub content_type: Option<String>,
    /// String headers.
    pub headers: HashMap<String, String>,
}

impl Envelope {
    /// Create an envelope from raw bytes.
    pub fn new<T: Into<Vec<u8>>>(payload: T) -> Self {
        Self {
            payload: payload.into(),
            correlation_id: None,
            reply_to: None,
            content_type: None,
            headers: HashMap::new(),
        }
    }

    /// Create an envelope from a JSON-serializable value.
    pub fn json<T: Serialize>(value: &T) -> Result<Self> {
        let payload = serde_json::to_vec(value)?;
        let mut envelope = Self::new(payload);
        envelope.content_type = Some("application/json".to_string());
        Ok(envelope)
    }

    /// Parse the payload as JSON.
    pub fn parse_json<T: for<'de> Deserialize<'de>>(&self) -> Result<T> {
        serde_json::from_slice(&self.payload)
            .map_err(|e| BrokerError::Deserialization(e.to_string()))
    }

    /// Set the correlation ID.
    pub fn with_correlation_id(mut self, id: impl Into<String>) -> Self {
        self.correlation_id = Some(id.into());
        self
    }

    /// Set the reply queue.
    pub fn with_reply_to(mut self, reply_to: impl Into<String>) -> Self {
        self.reply_to = Some(reply_to.into());
        self
    }

    /// Add a string header.
    pub fn with_header(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(key.into(), value.into());
        self
    }

    /// Build an envelope from a received delivery.
    pub fn from_delivery(delivery: &Delivery) -> Self {
        let props = &delivery.properties;
        let mut headers = HashMap::new();

        if let Some(amqp_headers) = props.headers() {
            for (key, value) in amqp_headers.inner() {
                if let AMQPValue::LongString(s) = value {
                    headers.insert(key.to_string(), s.to_string());
                }
            }
        }

        Self {
            payload: delivery.data.clone(),
            correlation_id: props.correlation_id().as_ref().map(|s| s.to_string()),
            reply_to: props.reply_to().as_ref().map(|s| s.to_string()),
            content_type: props.content_type().as_ref().map(|s| s.to_string()),
            headers,
        }
    }

    fn build_properties(&self, persistent: bool) -> BasicProperties {
        let mut props = BasicProperties::default();

        if persistent {
            props = props.with_delivery_mode(2);
        }
        if let Some(ref content_type) = self.content_type {
            props = props.with_content_type(content_type.clone().into());
        }
        if let Some(ref correlation_id) = self.correlation_id {
            props = props.with_correlation_id(correlation_id.clone().into());
        }
        if let Some(ref reply_to) = self.reply_to {
            props = props.with_reply_to(reply_to.clone().into());
        }
        if !self.headers.is_empty() {
            let mut headers = FieldTable::default();
            for (key, value) in &self.headers {
                headers.insert(
                    key.clone().into(),
                    AMQPValue::LongString(value.clone().into()),
                );
            }
            props = props.with_headers(headers);
        }

        props
    }
}

/// Publish an envelope to a queue on the default exchange.
pub async fn publish(
    channel: &Channel,
    queue: &str,
    envelope: &Envelope,
    persistent: bool,
) -> Result<()> {
    debug!(queue, size = envelope.payload.len(), "Publishing message");

    channel
        .basic_publish(
            "",
            queue,
            BasicPublishOptions::default(),
            &envelope.payload,
            envelope.build_properties(persistent),
        )
        .await
        .map_err(|e| BrokerError::Publish(e.to_string()))?;

    Ok(())
}

/// A message pulled from the head of a queue, pending acknowledgement.
pub struct Popped {
    /// The received envelope.
    pub envelope: Envelope,
    /// Delivery tag for ack/requeue.
    pub delivery_tag: u64,
}

/// Pull the head-of-queue message without auto-ack.
///
/// Returns `None` when the queue is empty. The caller must either
/// [`ack`] or [`requeue`] the returned delivery tag.
pub async fn pop(channel: &Channel, queue: &str) -> Result<Option<Popped>> {
    let message = channel
        .basic_get(queue, BasicGetOptions { no_ack: false })
        .await
        .map_err(|e| BrokerError::Consume(e.to_string()))?;

    Ok(message.map(|m| Popped {
        envelope: Envelope::from_delivery(&m.delivery),
        delivery_tag: m.delivery.delivery_tag,
    }))
}

/// Acknowledge a delivery, removing it from its queue.
pub async fn ack(channel: &Channel, delivery_tag: u64) -> Result<()> {
    channel
        .basic_ack(delivery_tag, BasicAckOptions::default())
        .await
        .map_err(|e| BrokerError::Acknowledge(e.to_string()))
}

/// Negatively acknowledge a delivery, putting it back on its queue.
pub async fn requeue(channel: &Channel, delivery_tag: u64) -> Result<()> {
    channel
        .basic_nack(
            delivery_tag,
            BasicNackOptions {
                requeue: true,
                ..Default::default()
            },
        )
        .await
        .map_err(|e| BrokerError::Acknowledge(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_envelope_json_roundtrip() {
        #[derive(Serialize, Deserialize, Debug, PartialEq)]
        struct Body {
            a: i32,
            b: String,
        }

        let body = Body {
            a: 7,
            b: "seven".to_string(),
        };
        let envelope = Envelope::json(&body).unwrap();
        assert_eq!(
            envelope.content_type,
            Some("application/json".to_string())
        );

        let parsed: Body = envelope.parse_json().unwrap();
        assert_eq!(parsed, body);
    }

    #[test]
    fn test_envelope_builder() {
        let envelope = Envelope::new(b"data".to_vec())
            .with_correlation_id("corr-1")
            .with_reply_to("reply_corr-1")
            .with_header("x-status-code", "200");

        assert_eq!(envelope.correlation_id, Some("corr-1".to_string()));
        assert_eq!(envelope.reply_to, Some("reply_corr-1".to_string()));
        assert_eq!(
            envelope.headers.get("x-status-code"),
            Some(&"200".to_string())
        );
    }

    #[test]
    fn test_parse_json_rejects_garbage() {
        let envelope = Envelope::new(b"not json".to_vec());
        let parsed: Result<serde_json::Value> = envelope.parse_json();
        assert!(matches!(parsed, Err(BrokerError::Deserialization(_))));
    }
}

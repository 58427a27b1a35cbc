use anyhow::Result;
use async_trait::async_trait;
use rdkafka::{
    config::ClientConfig,
    message::{Header, OwnedHeaders},
    producer::{FutureProducer, FutureRecord},
    util::Timeout,
};
use std::time::Duration;

use super::backbone::EventBackbone;
use super::event::Envelope;

/// Kafka-compatible backbone (Redpanda, Kafka).
///
/// The record key is the envelope's partition key, so the broker keeps all
/// events of one product on one partition, in order.
pub struct RedpandaClient {
    producer: FutureProducer,
    send_timeout: Duration,
}

impl RedpandaClient {
    pub fn new(brokers: &str, message_timeout: Duration) -> Result<Self> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("message.timeout.ms", message_timeout.as_millis().to_string())
            .set("enable.idempotence", "true")
            .create()
            .map_err(|e| anyhow::anyhow!("Failed to create Redpanda producer: {}", e))?;

        Ok(Self {
            producer,
            send_timeout: message_timeout,
        })
    }
}

#[async_trait]
impl EventBackbone for RedpandaClient {
    async fn send(&self, topic: &str, envelope: &Envelope) -> Result<()> {
        let message_id = envelope.message_id.to_string();
        let headers = OwnedHeaders::new()
            .insert(Header {
                key: "partitionKey",
                value: Some(envelope.partition_key.as_str()),
            })
            .insert(Header {
                key: "id",
                value: Some(message_id.as_str()),
            })
            .insert(Header {
                key: "eventType",
                value: Some(envelope.event_type.as_str()),
            });

        let record = FutureRecord::to(topic)
            .key(&envelope.partition_key)
            .payload(&envelope.payload)
            .headers(headers);

        let delivery = self
            .producer
            .send(record, Timeout::After(self.send_timeout))
            .await
            .map_err(|(e, _)| anyhow::anyhow!("Kafka send error: {}", e))?;

        tracing::debug!(
            topic = %topic,
            key = %envelope.partition_key,
            delivery = ?delivery,
            "Published to Redpanda"
        );
        Ok(())
    }
}

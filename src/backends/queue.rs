//! Kafka-protocol queue publisher (Kafka, Redpanda, MSK, ...).
//!
//! # Responsibilities
//! - Publish serialized workflow messages to one topic
//! - Fetch topic metadata as a readiness probe

use std::time::Duration;

use async_trait::async_trait;
use rdkafka::config::ClientConfig;
use rdkafka::producer::{FutureProducer, FutureRecord, Producer};
use rdkafka::util::Timeout;

use crate::backends::{BackendError, QueuePublisher};

/// Upper bound handed to the blocking metadata call. Matches librdkafka's
/// default `socket.timeout.ms`, so the probe waits no longer than the client
/// would on its own.
const METADATA_TIMEOUT: Duration = Duration::from_millis(60_000);

/// Publisher bound to a single topic.
#[derive(Clone)]
pub struct KafkaQueue {
    producer: FutureProducer,
    topic: String,
}

impl KafkaQueue {
    /// Create a producer for `topic`.
    ///
    /// # Errors
    ///
    /// Returns error if the producer configuration is rejected.
    pub fn new(brokers: &str, topic: &str, client_id: &str) -> Result<Self, BackendError> {
        let producer: FutureProducer = ClientConfig::new()
            .set("bootstrap.servers", brokers)
            .set("client.id", client_id)
            .create()?;

        Ok(Self {
            producer,
            topic: topic.to_string(),
        })
    }

    /// Topic messages are published to.
    pub fn topic(&self) -> &str {
        &self.topic
    }
}

#[async_trait]
impl QueuePublisher for KafkaQueue {
    async fn publish(&self, body: &str) -> Result<(), BackendError> {
        let record = FutureRecord::<(), [u8]>::to(&self.topic).payload(body.as_bytes());

        // Never: wait for queue space; delivery itself is bounded by
        // librdkafka's message.timeout.ms.
        let (partition, offset) = self
            .producer
            .send(record, Timeout::Never)
            .await
            .map_err(|(err, _message)| BackendError::Kafka(err))?;

        tracing::debug!(topic = %self.topic, partition, offset, "Message delivered");
        Ok(())
    }

    async fn fetch_metadata(&self) -> Result<(), BackendError> {
        let producer = self.producer.clone();
        let topic = self.topic.clone();

        tokio::task::spawn_blocking(move || {
            let metadata = producer
                .client()
                .fetch_metadata(Some(topic.as_str()), METADATA_TIMEOUT)?;

            match metadata.topics().iter().find(|t| t.name() == topic) {
                Some(t) => match t.error() {
                    Some(code) => Err(BackendError::Unavailable(format!(
                        "topic '{}' metadata error: {:?}",
                        topic, code
                    ))),
                    None => Ok(()),
                },
                None => Err(BackendError::Unavailable(format!(
                    "topic '{}' not found",
                    topic
                ))),
            }
        })
        .await
        .map_err(|e| BackendError::Unavailable(format!("metadata task failed: {}", e)))?
    }
}

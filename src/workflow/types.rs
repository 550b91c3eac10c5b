//! Workflow data types.

use chrono::{DateTime, Utc};
use opentelemetry::Context;
use serde::{Deserialize, Serialize};

/// One durable access row. Written once, never read back.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AccessRecord {
    pub created_at: DateTime<Utc>,
}

impl AccessRecord {
    /// A record stamped with the current time.
    pub fn now() -> Self {
        Self {
            created_at: Utc::now(),
        }
    }
}

/// Message published to the queue after a successful write.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueueMessage {
    pub source: String,
    pub hits: i64,
}

/// Successful `/data` response body.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DataResponse {
    pub hits: i64,
}

/// Per-request inputs handed to the orchestrator by the HTTP layer.
#[derive(Debug, Clone, Default)]
pub struct RequestContext {
    /// Inbound W3C trace context, if the caller sent a valid one.
    pub parent: Option<Context>,
    /// Value of `x-request-id`.
    pub request_id: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_queue_message_json_key_order() {
        let msg = QueueMessage {
            source: "inventory-service".into(),
            hits: 3,
        };
        assert_eq!(
            serde_json::to_string(&msg).unwrap(),
            r#"{"source":"inventory-service","hits":3}"#
        );
    }

    #[test]
    fn test_access_record_is_stamped_now() {
        let before = Utc::now();
        let record = AccessRecord::now();
        assert!(record.created_at >= before);
        assert!(record.created_at <= Utc::now());
    }
}

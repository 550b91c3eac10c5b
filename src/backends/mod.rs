//! Backend client subsystem.
//!
//! # Data Flow
//! ```text
//! lifecycle::startup
//!     → counter.rs  (Redis connection manager)
//!     → store.rs    (sqlx PgPool)
//!     → queue.rs    (rdkafka FutureProducer)
//!     → Arc<dyn Trait> handed to workflow and health
//! ```
//!
//! # Design Decisions
//! - One trait per backend role, so the orchestrator and the readiness
//!   aggregator never name a concrete client
//! - Each trait carries both the workflow operation and the readiness probe
//! - Handles are shared and internally pooled; nothing here holds a lock
//!   across calls

use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

pub mod counter;
pub mod queue;
pub mod store;

pub use counter::RedisCounter;
pub use queue::KafkaQueue;
pub use store::PostgresStore;

use crate::workflow::AccessRecord;

/// Error raised by any backend client. Display is the backend's own text.
#[derive(Debug, Error)]
pub enum BackendError {
    #[error(transparent)]
    Redis(#[from] redis::RedisError),

    #[error(transparent)]
    Postgres(#[from] sqlx::Error),

    #[error(transparent)]
    Migrate(#[from] sqlx::migrate::MigrateError),

    #[error(transparent)]
    Kafka(#[from] rdkafka::error::KafkaError),

    /// Anything else (missing topic, join failure, injected fault).
    #[error("{0}")]
    Unavailable(String),
}

/// Fast counter store.
#[async_trait]
pub trait CounterStore: Send + Sync {
    /// Atomically increment `key` and return the post-increment value.
    async fn increment(&self, key: &str) -> Result<i64, BackendError>;

    /// Liveness probe.
    async fn ping(&self) -> Result<(), BackendError>;
}

/// Durable store for access records.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Write one access record.
    async fn insert_access(&self, record: &AccessRecord) -> Result<(), BackendError>;

    /// Trivial query used as a readiness probe.
    async fn probe(&self) -> Result<(), BackendError>;
}

/// Message queue publisher.
#[async_trait]
pub trait QueuePublisher: Send + Sync {
    /// Publish one serialized message body.
    async fn publish(&self, body: &str) -> Result<(), BackendError>;

    /// Fetch queue metadata as a readiness probe.
    async fn fetch_metadata(&self) -> Result<(), BackendError>;
}

/// The three shared backend handles.
#[derive(Clone)]
pub struct Backends {
    pub counter: Arc<dyn CounterStore>,
    pub store: Arc<dyn RecordStore>,
    pub queue: Arc<dyn QueuePublisher>,
}

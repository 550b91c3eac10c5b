//! Workflow error taxonomy.
//!
//! Each variant tags the step that failed. `Display` is the backend's own
//! message text, which is all the HTTP caller ever sees; the tag only
//! reaches the span and the error log.

use thiserror::Error;

use crate::backends::BackendError;

#[derive(Debug, Error)]
pub enum WorkflowError {
    /// Counter increment failed.
    #[error("{0}")]
    Cache(BackendError),

    /// Access record write failed.
    #[error("{0}")]
    Store(BackendError),

    /// Queue publish failed.
    #[error("{0}")]
    Queue(BackendError),

    /// Anything unclassified.
    #[error("{0}")]
    Internal(String),
}

impl WorkflowError {
    /// Error class name recorded on the span.
    pub fn kind(&self) -> &'static str {
        match self {
            WorkflowError::Cache(_) => "CacheError",
            WorkflowError::Store(_) => "StoreError",
            WorkflowError::Queue(_) => "QueueError",
            WorkflowError::Internal(_) => "InternalError",
        }
    }

    /// Metrics outcome label.
    pub fn outcome(&self) -> &'static str {
        match self {
            WorkflowError::Cache(_) => "cache_error",
            WorkflowError::Store(_) => "store_error",
            WorkflowError::Queue(_) => "queue_error",
            WorkflowError::Internal(_) => "internal_error",
        }
    }
}

impl From<serde_json::Error> for WorkflowError {
    fn from(e: serde_json::Error) -> Self {
        WorkflowError::Internal(format!("failed to serialize queue message: {}", e))
    }
}

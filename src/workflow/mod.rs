//! Request orchestration subsystem.
//!
//! # Data Flow
//! ```text
//! GET /data
//!     → orchestrator.rs (open span "process-data")
//!         1. counter.increment("hits")      → CacheError on failure
//!         2. store.insert_access(now)       → StoreError on failure
//!         3. queue.publish({source, hits})  → QueueError on failure
//!         4. log sink: {level, msg, hits, trace_id}
//!     → span closed (guard drop)
//!     → {hits} | error.rs::WorkflowError
//! ```

pub mod error;
pub mod orchestrator;
pub mod types;

pub use error::WorkflowError;
pub use orchestrator::{RequestOrchestrator, SPAN_NAME};
pub use types::{AccessRecord, DataResponse, QueueMessage, RequestContext};

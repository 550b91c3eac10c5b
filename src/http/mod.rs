//! HTTP protocol handling subsystem.
//!
//! # Data Flow
//! ```text
//! TCP connection
//!     → server.rs (Axum setup, request ID + trace layers)
//!     → request.rs (traceparent / x-request-id → RequestContext, metrics)
//!     → handlers.rs
//!         /data    → workflow::RequestOrchestrator
//!         /healthz → health::ReadinessAggregator
//!         /metrics → observability::MetricsRegistry
//!     → response.rs (workflow errors → 500 JSON)
//!     → Send to client
//! ```

pub mod handlers;
pub mod request;
pub mod response;
pub mod server;

pub use request::{request_context, X_REQUEST_ID};
pub use response::{ApiError, ErrorBody};
pub use server::{AppState, HttpServer};

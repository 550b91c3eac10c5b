//! Observability subsystem.
//!
//! # Data Flow
//! ```text
//! workflow::RequestOrchestrator produces:
//!     → tracing.rs (one span per request, trace id)
//!     → logging.rs (one "Processed data" line carrying that trace id)
//!     → metrics.rs (outcome counter, step latencies)
//!
//! Consumers:
//!     → Log aggregation (stdout JSON lines, stderr diagnostics)
//!     → Metrics endpoint (Prometheus scrape of /metrics)
//!     → Distributed tracing (OpenTelemetry, OTLP export when configured)
//! ```
//!
//! # Design Decisions
//! - Trace id is the only correlation key between logs and spans
//! - Metrics are cheap (atomic increments) and never fail a request
//! - Span and metrics backends sit behind small traits

pub mod logging;
pub mod metrics;
pub mod tracing;

pub use self::logging::{init_logging, JsonLineSink, LogSink, ProcessedLog, TelemetryError};
pub use self::metrics::{MetricsRegistry, PrometheusRegistry};
pub use self::tracing::{
    extract_parent, shutdown_tracer, Span, SpanGuard, SpanStatus, TraceId, Tracer, TracingTracer,
};

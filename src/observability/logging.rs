//! Structured logging.
//!
//! # Responsibilities
//! - Initialize the diagnostic logging subsystem and the span bridge
//! - Emit the one correlated "Processed data" line per request
//!
//! # Design Decisions
//! - Uses tracing crate for diagnostics, written to stderr
//! - JSON format for production, pretty format for development
//! - Log level configurable via config and `RUST_LOG`
//! - Spans reach OpenTelemetry through a `tracing-opentelemetry` layer
//! - The correlated line has a fixed shape (`level`, `msg`, `hits`,
//!   `trace_id`) and goes to stdout through a `LogSink`, written off the
//!   request path by a `tracing-appender` worker

use std::io::{self, Write};
use std::sync::{Mutex, PoisonError};

use opentelemetry::trace::TraceError;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing_appender::non_blocking::{NonBlocking, NonBlockingBuilder, WorkerGuard};
use tracing_subscriber::util::TryInitError;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use crate::config::{LogFormat, ObservabilityConfig};
use crate::observability::tracing::{init_tracer, TraceId};

/// Errors from telemetry setup.
#[derive(Debug, Error)]
pub enum TelemetryError {
    #[error("Failed to install subscriber: {0}")]
    Subscriber(#[from] TryInitError),

    #[error("Failed to build span exporter: {0}")]
    Exporter(#[from] TraceError),
}

/// Install the global tracing subscriber with the OpenTelemetry layer.
///
/// `RUST_LOG` takes precedence over the configured level.
pub fn init_logging(
    config: &ObservabilityConfig,
    service_name: &str,
) -> Result<(), TelemetryError> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "inventory_service={0},tower_http={0}",
            config.log_level
        ))
    });
    let tracer = init_tracer(service_name, config.otlp_endpoint.as_deref())?;

    let registry = tracing_subscriber::registry()
        .with(filter)
        .with(tracing_opentelemetry::layer().with_tracer(tracer));
    match config.log_format {
        LogFormat::Json => registry
            .with(fmt::layer().json().with_writer(io::stderr))
            .try_init()?,
        LogFormat::Pretty => registry
            .with(fmt::layer().with_writer(io::stderr))
            .try_init()?,
    }

    if let Some(endpoint) = &config.otlp_endpoint {
        tracing::info!(endpoint = %endpoint, "OTLP span export enabled");
    }
    Ok(())
}

/// The structured line emitted once per processed request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProcessedLog {
    pub level: String,
    pub msg: String,
    pub hits: i64,
    pub trace_id: String,
}

impl ProcessedLog {
    pub fn new(hits: i64, trace_id: TraceId) -> Self {
        Self {
            level: "info".to_string(),
            msg: "Processed data".to_string(),
            hits,
            trace_id: trace_id.to_string(),
        }
    }
}

/// Destination for correlated request log lines.
pub trait LogSink: Send + Sync {
    fn emit(&self, entry: &ProcessedLog);
}

/// Writes each entry as a single JSON line.
pub struct JsonLineSink<W> {
    writer: Mutex<W>,
}

impl JsonLineSink<NonBlocking> {
    /// Stdout sink backed by a worker thread. Lines still queued are
    /// flushed when the returned guard drops, so keep it until exit.
    pub fn stdout() -> (Self, WorkerGuard) {
        Self::non_blocking(io::stdout())
    }

    /// Sink handing lines to a worker thread that owns `writer`.
    pub fn non_blocking<T: Write + Send + 'static>(writer: T) -> (Self, WorkerGuard) {
        // Correlated lines are never dropped; a full buffer applies
        // backpressure instead.
        let (writer, guard) = NonBlockingBuilder::default().lossy(false).finish(writer);
        (Self::new(writer), guard)
    }
}

impl<W: Write + Send> JsonLineSink<W> {
    pub fn new(writer: W) -> Self {
        Self {
            writer: Mutex::new(writer),
        }
    }

    pub fn into_inner(self) -> W {
        self.writer
            .into_inner()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl<W: Write + Send> LogSink for JsonLineSink<W> {
    fn emit(&self, entry: &ProcessedLog) {
        let line = match serde_json::to_string(entry) {
            Ok(line) => line,
            Err(e) => {
                tracing::error!(error = %e, "Failed to serialize log line");
                return;
            }
        };

        let mut writer = self.writer.lock().unwrap_or_else(PoisonError::into_inner);
        if let Err(e) = writeln!(writer, "{}", line).and_then(|()| writer.flush()) {
            tracing::warn!(error = %e, "Failed to write log line");
        }
    }
}

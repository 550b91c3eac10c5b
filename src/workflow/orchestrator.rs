//! Per-request workflow.
//!
//! # Responsibilities
//! - Run counter → store → queue strictly in order under one span
//! - Short-circuit on the first failing step, tagging the error by step
//! - Emit the correlated log line only when every step succeeded
//!
//! # Design Decisions
//! - No rollback: earlier effects stand when a later step fails
//! - No retries and no deadlines; each call waits on its client's defaults
//! - The span is owned by a guard, so it closes even if the request future
//!   is dropped mid-flight
//! - Every backend call runs with the request span active, so client
//!   instrumentation and logs nest under it

use std::sync::Arc;
use std::time::Instant;

use tracing::Instrument;

use crate::backends::Backends;
use crate::observability::metrics;
use crate::observability::{LogSink, ProcessedLog, SpanGuard, TraceId, Tracer};
use crate::workflow::error::WorkflowError;
use crate::workflow::types::{AccessRecord, DataResponse, QueueMessage, RequestContext};

/// Name of the span wrapping each request.
pub const SPAN_NAME: &str = "process-data";

/// Executes the `/data` workflow against the shared backends.
pub struct RequestOrchestrator {
    backends: Backends,
    tracer: Arc<dyn Tracer>,
    log_sink: Arc<dyn LogSink>,
    service_name: String,
    counter_key: String,
}

impl RequestOrchestrator {
    pub fn new(backends: Backends, tracer: Arc<dyn Tracer>, log_sink: Arc<dyn LogSink>) -> Self {
        Self {
            backends,
            tracer,
            log_sink,
            service_name: "inventory-service".to_string(),
            counter_key: "hits".to_string(),
        }
    }

    /// Set the `source` written into queue messages.
    pub fn with_service_name(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = service_name.into();
        self
    }

    /// Set the counter key incremented per request.
    pub fn with_counter_key(mut self, counter_key: impl Into<String>) -> Self {
        self.counter_key = counter_key.into();
        self
    }

    /// Run the workflow once.
    pub async fn handle(&self, ctx: RequestContext) -> Result<DataResponse, WorkflowError> {
        let mut span = SpanGuard::new(self.tracer.start(SPAN_NAME, ctx.parent.as_ref()));
        let trace_id = span.trace_id();
        let active = span.tracing_span();

        match self.run(trace_id).instrument(active.clone()).await {
            Ok(hits) => {
                span.succeed();
                metrics::record_workflow("success");
                Ok(DataResponse { hits })
            }
            Err(err) => {
                span.fail(err.kind(), &err);
                metrics::record_workflow(err.outcome());
                active.in_scope(|| {
                    tracing::error!(
                        trace_id = %trace_id,
                        request_id = ctx.request_id.as_deref().unwrap_or("-"),
                        error.kind = err.kind(),
                        error = %err,
                        "/data error"
                    )
                });
                Err(err)
            }
        }
    }

    async fn run(&self, trace_id: TraceId) -> Result<i64, WorkflowError> {
        // 1. Counter
        let started = Instant::now();
        let result = self.backends.counter.increment(&self.counter_key).await;
        metrics::record_step("counter", started);
        let hits = result.map_err(WorkflowError::Cache)?;

        // 2. Store
        let started = Instant::now();
        let result = self.backends.store.insert_access(&AccessRecord::now()).await;
        metrics::record_step("store", started);
        result.map_err(WorkflowError::Store)?;

        // 3. Queue
        let body = serde_json::to_string(&QueueMessage {
            source: self.service_name.clone(),
            hits,
        })?;
        let started = Instant::now();
        let result = self.backends.queue.publish(&body).await;
        metrics::record_step("queue", started);
        result.map_err(WorkflowError::Queue)?;

        self.log_sink.emit(&ProcessedLog::new(hits, trace_id));
        Ok(hits)
    }
}

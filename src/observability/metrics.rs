//! Metrics collection and exposition.
//!
//! # Responsibilities
//! - Define service metrics (requests, workflow outcomes, step latency, readiness)
//! - Expose a Prometheus-compatible snapshot for the `/metrics` endpoint
//!
//! # Metrics
//! - `http_requests_total` (counter): requests by method, path, status
//! - `http_request_duration_seconds` (histogram): latency by method, path
//! - `workflow_requests_total` (counter): orchestrated requests by outcome
//! - `workflow_step_duration_seconds` (histogram): per backend step
//! - `readiness_checks_total` (counter): readiness results
//! - `service_info` (gauge): always 1, labelled with service and version
//!
//! # Design Decisions
//! - Recording goes through the `metrics` facade; a missing recorder makes
//!   every call a no-op
//! - The exposition path never fails: rendering is infallible
//! - Histogram buckets tuned for typical web latencies

use std::time::Instant;

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use metrics_exporter_prometheus::{BuildError, Matcher, PrometheusBuilder, PrometheusHandle};
use thiserror::Error;

/// Content type of the text exposition format.
pub const CONTENT_TYPE: &str = "text/plain; version=0.0.4; charset=utf-8";

const LATENCY_BUCKETS: &[f64] = &[
    0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0,
];

/// Errors from metrics setup.
#[derive(Debug, Error)]
pub enum MetricsError {
    #[error("Failed to install metrics recorder: {0}")]
    Install(#[from] BuildError),
}

/// Point-in-time view over a metrics registry.
pub trait MetricsRegistry: Send + Sync {
    /// Bring the registry up to date (e.g. drain histogram windows).
    fn collect(&self);

    /// Serialize every sample in exposition format.
    fn serialize_exposition(&self) -> String;

    /// `collect` followed by `serialize_exposition`.
    fn snapshot(&self) -> String {
        self.collect();
        self.serialize_exposition()
    }
}

/// Prometheus-backed registry.
#[derive(Clone)]
pub struct PrometheusRegistry {
    handle: PrometheusHandle,
}

impl PrometheusRegistry {
    /// Install the global recorder and describe the service metrics.
    ///
    /// # Errors
    ///
    /// Returns error if a recorder is already installed.
    pub fn install(service_name: &str) -> Result<Self, MetricsError> {
        let handle = builder()?.install_recorder()?;
        describe_metrics();
        gauge!(
            "service_info",
            "service" => service_name.to_string(),
            "version" => env!("CARGO_PKG_VERSION")
        )
        .set(1.0);

        tracing::info!("Prometheus recorder installed");
        Ok(Self { handle })
    }

    pub fn from_handle(handle: PrometheusHandle) -> Self {
        Self { handle }
    }
}

impl MetricsRegistry for PrometheusRegistry {
    fn collect(&self) {
        self.handle.run_upkeep();
    }

    fn serialize_exposition(&self) -> String {
        self.handle.render()
    }
}

/// Exporter builder with the service's histogram buckets.
pub fn builder() -> Result<PrometheusBuilder, MetricsError> {
    Ok(PrometheusBuilder::new().set_buckets_for_metric(
        Matcher::Suffix("duration_seconds".to_string()),
        LATENCY_BUCKETS,
    )?)
}

fn describe_metrics() {
    describe_counter!("http_requests_total", "Total HTTP requests");
    describe_histogram!(
        "http_request_duration_seconds",
        metrics::Unit::Seconds,
        "HTTP request latency"
    );
    describe_counter!(
        "workflow_requests_total",
        "Orchestrated requests by outcome"
    );
    describe_histogram!(
        "workflow_step_duration_seconds",
        metrics::Unit::Seconds,
        "Latency of each backend step"
    );
    describe_counter!("readiness_checks_total", "Readiness checks by result");
    describe_gauge!("service_info", "Service build information");
}

/// Record one HTTP request.
pub fn record_request(method: &str, path: &str, status: u16, start: Instant) {
    counter!(
        "http_requests_total",
        "method" => method.to_string(),
        "path" => path.to_string(),
        "status" => status.to_string()
    )
    .increment(1);
    histogram!(
        "http_request_duration_seconds",
        "method" => method.to_string(),
        "path" => path.to_string()
    )
    .record(start.elapsed().as_secs_f64());
}

/// Record the outcome of one orchestrated request.
pub fn record_workflow(outcome: &'static str) {
    counter!("workflow_requests_total", "outcome" => outcome).increment(1);
}

/// Record the latency of one backend step.
pub fn record_step(step: &'static str, start: Instant) {
    histogram!("workflow_step_duration_seconds", "step" => step)
        .record(start.elapsed().as_secs_f64());
}

/// Record a readiness check result.
pub fn record_readiness(ready: bool) {
    counter!(
        "readiness_checks_total",
        "ready" => if ready { "true" } else { "false" }
    )
    .increment(1);
}

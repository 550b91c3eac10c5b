//! Readiness checking.
//!
//! # Responsibilities
//! - Probe each backend in a fixed order
//! - Stop at the first failure and report its message

use serde::Serialize;

use crate::backends::{BackendError, Backends};
use crate::observability::metrics;

/// Result of one readiness check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ReadinessReport {
    pub ready: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

impl ReadinessReport {
    pub fn ready() -> Self {
        Self {
            ready: true,
            detail: None,
        }
    }

    pub fn not_ready(detail: impl Into<String>) -> Self {
        Self {
            ready: false,
            detail: Some(detail.into()),
        }
    }
}

/// Aggregates the counter, store and queue probes into one verdict.
pub struct ReadinessAggregator {
    backends: Backends,
}

impl ReadinessAggregator {
    pub fn new(backends: Backends) -> Self {
        Self { backends }
    }

    /// Probe counter, then store, then queue. The first failure wins.
    pub async fn check(&self) -> ReadinessReport {
        let report = match self.probe_all().await {
            Ok(()) => ReadinessReport::ready(),
            Err((probe, e)) => {
                tracing::warn!(probe, error = %e, "Readiness probe failed");
                ReadinessReport::not_ready(e.to_string())
            }
        };

        metrics::record_readiness(report.ready);
        report
    }

    async fn probe_all(&self) -> Result<(), (&'static str, BackendError)> {
        self.backends.counter.ping().await.map_err(|e| ("counter", e))?;
        self.backends.store.probe().await.map_err(|e| ("store", e))?;
        self.backends
            .queue
            .fetch_metadata()
            .await
            .map_err(|e| ("queue", e))?;
        Ok(())
    }
}

//! Shutdown coordination.
//!
//! # Responsibilities
//! - Fan one stop request out to the HTTP server and background tasks
//! - Flush telemetry once the server has drained
//!
//! # Design Decisions
//! - Backed by a `watch` channel: the flag is sticky, so a component that
//!   subscribes after the trigger still stops
//! - Dropping the coordinator counts as a trigger

use tokio::sync::watch;
use tracing_appender::non_blocking::WorkerGuard;

use crate::observability::shutdown_tracer;

/// Owner of the service's stop flag.
#[derive(Debug)]
pub struct Shutdown {
    tx: watch::Sender<bool>,
}

impl Shutdown {
    pub fn new() -> Self {
        let (tx, _) = watch::channel(false);
        Self { tx }
    }

    /// A handle that resolves once shutdown is requested.
    pub fn subscribe(&self) -> ShutdownSignal {
        ShutdownSignal {
            rx: self.tx.subscribe(),
        }
    }

    /// Request shutdown. Idempotent; safe with no subscribers.
    pub fn trigger(&self) {
        if !self.tx.send_replace(true) {
            tracing::debug!(listeners = self.tx.receiver_count(), "Shutdown requested");
        }
    }

    pub fn is_triggered(&self) -> bool {
        *self.tx.borrow()
    }
}

impl Default for Shutdown {
    fn default() -> Self {
        Self::new()
    }
}

/// Held by a component that must stop on shutdown.
#[derive(Debug, Clone)]
pub struct ShutdownSignal {
    rx: watch::Receiver<bool>,
}

impl ShutdownSignal {
    /// Resolve when shutdown is requested or the coordinator is gone.
    pub async fn recv(mut self) {
        let _ = self.rx.wait_for(|stopping| *stopping).await;
    }

    pub fn is_triggered(&self) -> bool {
        *self.rx.borrow()
    }
}

/// Final step after the server has drained.
///
/// Exports spans still batched in the tracer provider, then drops the log
/// writer guard so queued stdout lines are written before exit.
pub async fn flush_telemetry(log_guard: WorkerGuard) {
    // Provider shutdown blocks on the exporter.
    if let Err(e) = tokio::task::spawn_blocking(shutdown_tracer).await {
        tracing::warn!(error = %e, "Tracer shutdown did not complete");
    }
    tracing::info!("Telemetry flushed");
    drop(log_guard);
}

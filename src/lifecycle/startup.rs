//! Startup orchestration.
//!
//! # Responsibilities
//! - Connect every backend from configuration
//! - Install the metrics recorder and tracer
//! - Assemble the HTTP application state
//! - Start the stdout log writer
//!
//! # Design Decisions
//! - Fail fast: any startup error is fatal
//! - Subsystems initialize in order, not concurrently
//! - The listener is bound by the caller, after this succeeds

use std::sync::Arc;

use thiserror::Error;
use tracing_appender::non_blocking::WorkerGuard;

use crate::backends::{BackendError, Backends, KafkaQueue, PostgresStore, RedisCounter};
use crate::config::ServiceConfig;
use crate::health::ReadinessAggregator;
use crate::http::AppState;
use crate::observability::metrics::MetricsError;
use crate::observability::{JsonLineSink, LogSink, PrometheusRegistry, TracingTracer};
use crate::workflow::RequestOrchestrator;

#[derive(Debug, Error)]
pub enum StartupError {
    #[error("Failed to connect counter: {0}")]
    Counter(#[source] BackendError),

    #[error("Failed to connect store: {0}")]
    Store(#[source] BackendError),

    #[error("Failed to create queue producer: {0}")]
    Queue(#[source] BackendError),

    #[error(transparent)]
    Metrics(#[from] MetricsError),
}

/// Connect the production backends.
pub async fn connect_backends(config: &ServiceConfig) -> Result<Backends, StartupError> {
    let counter = RedisCounter::connect(&config.counter.url)
        .await
        .map_err(StartupError::Counter)?;

    let store = PostgresStore::connect(&config.store.dsn, config.store.max_connections)
        .await
        .map_err(StartupError::Store)?;
    if config.store.ensure_schema {
        store.run_migrations().await.map_err(StartupError::Store)?;
    }

    let queue = KafkaQueue::new(
        &config.queue.brokers,
        &config.queue.topic,
        &config.service_name,
    )
    .map_err(StartupError::Queue)?;
    tracing::info!(
        brokers = %config.queue.brokers,
        topic = %queue.topic(),
        "Kafka producer created"
    );

    Ok(Backends {
        counter: Arc::new(counter),
        store: Arc::new(store),
        queue: Arc::new(queue),
    })
}

/// Wire backends, tracer, log sink and metrics into application state.
pub fn assemble_state(
    config: &ServiceConfig,
    backends: Backends,
    log_sink: Arc<dyn LogSink>,
    metrics: PrometheusRegistry,
) -> AppState {
    let tracer = Arc::new(TracingTracer::new(config.service_name.clone()));
    let orchestrator = RequestOrchestrator::new(backends.clone(), tracer, log_sink)
        .with_service_name(config.service_name.clone())
        .with_counter_key(config.counter.key.clone());

    AppState {
        orchestrator: Arc::new(orchestrator),
        readiness: Arc::new(ReadinessAggregator::new(backends)),
        metrics: Arc::new(metrics),
    }
}

/// Full production startup.
///
/// The returned guard owns the stdout log writer; hold it until the server
/// has stopped.
pub async fn build_state(
    config: &ServiceConfig,
) -> Result<(AppState, WorkerGuard), StartupError> {
    let metrics = PrometheusRegistry::install(&config.service_name)?;
    let backends = connect_backends(config).await?;
    let (log_sink, log_guard) = JsonLineSink::stdout();
    let state = assemble_state(config, backends, Arc::new(log_sink), metrics);
    Ok((state, log_guard))
}

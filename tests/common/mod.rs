//! Shared utilities for integration and load testing.

use std::net::SocketAddr;
use std::sync::Arc;

use inventory_service::health::ReadinessAggregator;
use inventory_service::http::{AppState, HttpServer};
use inventory_service::lifecycle::Shutdown;
use inventory_service::testing::{MemoryLogSink, RecordingTracer, StaticMetrics, TestBackends};
use inventory_service::workflow::RequestOrchestrator;

pub const METRICS_BODY: &str = "# TYPE workflow_requests_total counter\nworkflow_requests_total{outcome=\"success\"} 1\n";

/// A running service on an ephemeral port, wired to in-memory fakes.
#[allow(dead_code)]
pub struct TestService {
    pub addr: SocketAddr,
    pub backends: TestBackends,
    pub tracer: RecordingTracer,
    pub logs: Arc<MemoryLogSink>,
    pub metrics: Arc<StaticMetrics>,
    pub client: reqwest::Client,
    shutdown: Shutdown,
}

#[allow(dead_code)]
impl TestService {
    pub async fn start() -> Self {
        let backends = TestBackends::new();
        let tracer = RecordingTracer::new();
        let logs = Arc::new(MemoryLogSink::new());
        let metrics = Arc::new(StaticMetrics::new(METRICS_BODY));

        let orchestrator =
            RequestOrchestrator::new(backends.handles(), Arc::new(tracer.clone()), logs.clone());
        let state = AppState {
            orchestrator: Arc::new(orchestrator),
            readiness: Arc::new(ReadinessAggregator::new(backends.handles())),
            metrics: metrics.clone(),
        };

        // Bound before spawning, so connections queue until the server accepts.
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();

        let shutdown = Shutdown::new();
        let server_shutdown = shutdown.subscribe();
        let server = HttpServer::new(state);
        tokio::spawn(async move {
            let _ = server.run(listener, server_shutdown).await;
        });

        let client = reqwest::Client::builder()
            .pool_max_idle_per_host(0)
            .no_proxy()
            .build()
            .unwrap();

        Self {
            addr,
            backends,
            tracer,
            logs,
            metrics,
            client,
            shutdown,
        }
    }

    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> reqwest::Response {
        self.client
            .get(self.url(path))
            .send()
            .await
            .expect("service unreachable")
    }

    pub fn stop(&self) {
        self.shutdown.trigger();
    }
}

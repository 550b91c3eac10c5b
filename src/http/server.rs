//! HTTP server setup and configuration.
//!
//! # Responsibilities
//! - Create Axum Router with the three service routes
//! - Wire up middleware (request ID, tracing, metrics)
//! - Bind server to listener
//! - Stop accepting on shutdown and drain in-flight requests

use std::sync::Arc;

use axum::{middleware, routing::get, Router};
use tokio::net::TcpListener;
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::TraceLayer,
};

use crate::health::ReadinessAggregator;
use crate::http::handlers::{data_handler, healthz_handler, metrics_handler};
use crate::http::request::track_metrics;
use crate::lifecycle::ShutdownSignal;
use crate::observability::MetricsRegistry;
use crate::workflow::RequestOrchestrator;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub orchestrator: Arc<RequestOrchestrator>,
    pub readiness: Arc<ReadinessAggregator>,
    pub metrics: Arc<dyn MetricsRegistry>,
}

/// HTTP server for the inventory service.
pub struct HttpServer {
    router: Router,
}

impl HttpServer {
    pub fn new(state: AppState) -> Self {
        Self {
            router: Self::build_router(state),
        }
    }

    /// The fully layered router, for in-process tests.
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Build the Axum router with all middleware layers.
    fn build_router(state: AppState) -> Router {
        Router::new()
            .route("/data", get(data_handler))
            .route("/metrics", get(metrics_handler))
            .route("/healthz", get(healthz_handler))
            .route_layer(middleware::from_fn(track_metrics))
            .with_state(state)
            .layer(
                ServiceBuilder::new()
                    .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                    .layer(TraceLayer::new_for_http())
                    .layer(PropagateRequestIdLayer::x_request_id()),
            )
    }

    /// Run the server until `shutdown` fires, then drain.
    pub async fn run(
        self,
        listener: TcpListener,
        shutdown: ShutdownSignal,
    ) -> Result<(), std::io::Error> {
        let addr = listener.local_addr()?;
        tracing::info!(address = %addr, "HTTP server starting");

        axum::serve(listener, self.router)
            .with_graceful_shutdown(async move {
                shutdown.recv().await;
                tracing::info!("Shutdown signal received, draining connections");
            })
            .await?;

        tracing::info!("HTTP server stopped");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use tower::ServiceExt;

    use crate::observability::tracing::{
        inject_headers, new_root_context, trace_id_of, TRACEPARENT,
    };
    use crate::testing::{MemoryLogSink, RecordingTracer, StaticMetrics, TestBackends};

    fn server(backends: &TestBackends, tracer: RecordingTracer) -> HttpServer {
        let orchestrator = RequestOrchestrator::new(
            backends.handles(),
            Arc::new(tracer),
            Arc::new(MemoryLogSink::new()),
        );
        HttpServer::new(AppState {
            orchestrator: Arc::new(orchestrator),
            readiness: Arc::new(ReadinessAggregator::new(backends.handles())),
            metrics: Arc::new(StaticMetrics::new("# EOF\n")),
        })
    }

    #[tokio::test]
    async fn test_request_id_generated_and_propagated() {
        let backends = TestBackends::new();
        let app = server(&backends, RecordingTracer::new()).router();

        let response = app
            .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().contains_key("x-request-id"));
    }

    #[tokio::test]
    async fn test_inbound_request_id_kept() {
        let backends = TestBackends::new();
        let app = server(&backends, RecordingTracer::new()).router();

        let response = app
            .oneshot(
                Request::get("/data")
                    .header("x-request-id", "abc-123")
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.headers()["x-request-id"], "abc-123");
    }

    #[tokio::test]
    async fn test_traceparent_joins_parent_trace() {
        let backends = TestBackends::new();
        let tracer = RecordingTracer::new();
        let app = server(&backends, tracer.clone()).router();
        let parent = new_root_context();
        let headers = inject_headers(&parent);

        let response = app
            .oneshot(
                Request::get("/data")
                    .header(TRACEPARENT, headers[TRACEPARENT].as_str())
                    .body(Body::empty())
                    .unwrap(),
            )
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let spans = tracer.spans();
        assert_eq!(spans.len(), 1);
        assert_eq!(spans[0].trace_id, trace_id_of(&parent));
    }

    #[tokio::test]
    async fn test_metrics_content_type_names_charset() {
        let backends = TestBackends::new();
        let app = server(&backends, RecordingTracer::new()).router();

        let response = app
            .oneshot(Request::get("/metrics").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(
            response.headers()["content-type"],
            "text/plain; version=0.0.4; charset=utf-8"
        );
    }

    #[tokio::test]
    async fn test_unknown_route_is_404() {
        let backends = TestBackends::new();
        let app = server(&backends, RecordingTracer::new()).router();

        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(backends.counter.value("hits"), 0);
    }
}

//! Distributed tracing support.
//!
//! # Responsibilities
//! - Extract W3C trace context from incoming requests
//! - Create one span per orchestrated request and expose it as the active
//!   `tracing` span for the work it covers
//! - Guarantee every span is ended exactly once
//! - Install the OpenTelemetry tracer (OTLP export when configured)
//!
//! # Design Decisions
//! - Span backend is a trait (`Tracer` / `Span`) so tests can record lifecycles
//! - Production spans are `tracing` spans bridged to OpenTelemetry by
//!   `tracing-opentelemetry`; trace ids come from the OpenTelemetry context
//! - Propagation uses the W3C `TraceContextPropagator`

use std::borrow::Cow;
use std::collections::HashMap;
use std::time::Instant;

use axum::http::HeaderMap;
use opentelemetry::propagation::{Extractor, TextMapPropagator};
use opentelemetry::trace::{
    SpanContext, TraceContextExt, TraceError, TraceFlags, TraceState, TracerProvider as _,
};
use opentelemetry::{global, Context, KeyValue};
use opentelemetry_otlp::WithExportConfig;
use opentelemetry_sdk::propagation::TraceContextPropagator;
use opentelemetry_sdk::trace::{self as sdktrace, IdGenerator, RandomIdGenerator};
use opentelemetry_sdk::Resource;
use tracing::field::{self, display};
use tracing_opentelemetry::OpenTelemetrySpanExt;

pub use opentelemetry::trace::TraceId;

/// W3C trace context header name.
pub const TRACEPARENT: &str = "traceparent";

/// Reads propagation fields out of HTTP headers.
struct HeaderExtractor<'a>(&'a HeaderMap);

impl Extractor for HeaderExtractor<'_> {
    fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).and_then(|v| v.to_str().ok())
    }

    fn keys(&self) -> Vec<&str> {
        self.0.keys().map(|k| k.as_str()).collect()
    }
}

/// Remote parent carried by `traceparent`/`tracestate`, if valid.
pub fn extract_parent(headers: &HeaderMap) -> Option<Context> {
    let cx = TraceContextPropagator::new().extract(&HeaderExtractor(headers));
    let valid = cx.span().span_context().is_valid();
    valid.then_some(cx)
}

/// Propagation headers for `cx`.
pub fn inject_headers(cx: &Context) -> HashMap<String, String> {
    let mut headers = HashMap::new();
    TraceContextPropagator::new().inject_context(cx, &mut headers);
    headers
}

/// A sampled root context, for callers starting a new trace.
pub fn new_root_context() -> Context {
    let ids = RandomIdGenerator::default();
    let span_context = SpanContext::new(
        ids.new_trace_id(),
        ids.new_span_id(),
        TraceFlags::SAMPLED,
        true,
        TraceState::default(),
    );
    Context::new().with_remote_span_context(span_context)
}

/// Trace id of the span held by `cx`.
pub fn trace_id_of(cx: &Context) -> TraceId {
    cx.span().span_context().trace_id()
}

pub fn random_trace_id() -> TraceId {
    RandomIdGenerator::default().new_trace_id()
}

/// Build the OpenTelemetry tracer backing `tracing` spans.
///
/// With an endpoint, spans are batched and exported over OTLP/gRPC.
/// Without one, spans still get real ids but are dropped on end. Either
/// way the provider is registered globally so [`shutdown_tracer`] can
/// flush it.
///
/// # Errors
///
/// Returns error if the OTLP exporter cannot be built.
pub fn init_tracer(
    service_name: &str,
    otlp_endpoint: Option<&str>,
) -> Result<sdktrace::Tracer, TraceError> {
    let resource = Resource::new(vec![KeyValue::new(
        "service.name",
        service_name.to_string(),
    )]);
    let config = sdktrace::Config::default().with_resource(resource);

    match otlp_endpoint {
        Some(endpoint) => {
            let tracer = opentelemetry_otlp::new_pipeline()
                .tracing()
                .with_exporter(
                    opentelemetry_otlp::new_exporter()
                        .tonic()
                        .with_endpoint(endpoint),
                )
                .with_trace_config(config)
                .install_batch(opentelemetry_sdk::runtime::Tokio)?;
            Ok(tracer)
        }
        None => {
            let provider = sdktrace::TracerProvider::builder()
                .with_config(config)
                .build();
            let tracer = provider.tracer(Cow::Owned(service_name.to_string()));
            global::set_tracer_provider(provider);
            Ok(tracer)
        }
    }
}

/// Flush pending spans and shut the global provider down.
///
/// Blocks while the batch exporter drains; call off the async workers.
pub fn shutdown_tracer() {
    global::shutdown_tracer_provider();
}

/// Final outcome recorded on a span.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum SpanStatus {
    #[default]
    Unset,
    Ok,
    Error { message: String },
}

/// A timing/correlation context for one logical operation.
pub trait Span: Send {
    /// Trace this span belongs to.
    fn trace_id(&self) -> TraceId;

    /// Attach a failure to the span. `kind` names the error class.
    fn record_exception(&mut self, kind: &str, error: &dyn std::error::Error);

    /// Set the span's final status.
    fn set_status(&mut self, status: SpanStatus);

    /// Close the span. Called exactly once, by [`SpanGuard`].
    fn end(&mut self);

    /// The `tracing` span that work under this span should run in.
    fn tracing_span(&self) -> tracing::Span {
        tracing::Span::none()
    }
}

/// Factory for spans.
pub trait Tracer: Send + Sync {
    /// Start a span, joining `parent`'s trace when given.
    fn start(&self, name: &'static str, parent: Option<&Context>) -> Box<dyn Span>;
}

/// Owns a span and ends it when dropped, on every exit path.
pub struct SpanGuard {
    span: Box<dyn Span>,
}

impl SpanGuard {
    pub fn new(span: Box<dyn Span>) -> Self {
        Self { span }
    }

    pub fn trace_id(&self) -> TraceId {
        self.span.trace_id()
    }

    /// Handle for `Instrument::instrument` / `in_scope`.
    pub fn tracing_span(&self) -> tracing::Span {
        self.span.tracing_span()
    }

    /// Record `error` and mark the span failed.
    pub fn fail(&mut self, kind: &str, error: &dyn std::error::Error) {
        self.span.record_exception(kind, error);
        self.span.set_status(SpanStatus::Error {
            message: error.to_string(),
        });
    }

    pub fn succeed(&mut self) {
        self.span.set_status(SpanStatus::Ok);
    }
}

impl Drop for SpanGuard {
    fn drop(&mut self) {
        self.span.end();
    }
}

/// Tracer producing `tracing` spans.
#[derive(Debug, Clone)]
pub struct TracingTracer {
    service_name: String,
}

impl TracingTracer {
    pub fn new(service_name: impl Into<String>) -> Self {
        Self {
            service_name: service_name.into(),
        }
    }
}

impl Tracer for TracingTracer {
    fn start(&self, name: &'static str, parent: Option<&Context>) -> Box<dyn Span> {
        let span = tracing::info_span!(
            "span",
            otel.name = name,
            otel.kind = "internal",
            service.name = %self.service_name,
            trace_id = field::Empty,
            otel.status_code = field::Empty,
            otel.status_message = field::Empty,
            error.kind = field::Empty,
            exception.message = field::Empty,
        );
        if let Some(parent) = parent {
            span.set_parent(parent.clone());
        }

        // Without an OpenTelemetry layer the span context is empty; keep the
        // parent's trace, or start a fresh one, so log correlation still holds.
        let mut trace_id = trace_id_of(&span.context());
        if trace_id == TraceId::INVALID {
            trace_id = parent.map_or_else(random_trace_id, trace_id_of);
        }
        span.record("trace_id", display(trace_id));

        Box::new(TracingSpan {
            inner: Some(span),
            trace_id,
            started: Instant::now(),
        })
    }
}

/// A span backed by `tracing`.
struct TracingSpan {
    inner: Option<tracing::Span>,
    trace_id: TraceId,
    started: Instant,
}

impl Span for TracingSpan {
    fn trace_id(&self) -> TraceId {
        self.trace_id
    }

    fn record_exception(&mut self, kind: &str, error: &dyn std::error::Error) {
        if let Some(span) = &self.inner {
            span.record("error.kind", kind);
            span.record("exception.message", display(error));
            tracing::error!(parent: span, error.kind = kind, error = %error, "exception");
        }
    }

    fn set_status(&mut self, status: SpanStatus) {
        let Some(span) = &self.inner else { return };
        match status {
            SpanStatus::Unset => {}
            SpanStatus::Ok => {
                span.record("otel.status_code", "OK");
            }
            SpanStatus::Error { message } => {
                span.record("otel.status_code", "ERROR");
                span.record("otel.status_message", message.as_str());
            }
        }
    }

    fn end(&mut self) {
        // Dropping the last handle closes the span and hands it to the exporter.
        if let Some(span) = self.inner.take() {
            tracing::debug!(
                parent: &span,
                elapsed_ms = self.started.elapsed().as_millis() as u64,
                "span ended"
            );
        }
    }

    fn tracing_span(&self) -> tracing::Span {
        self.inner.clone().unwrap_or_else(tracing::Span::none)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use opentelemetry::trace::TracerProvider as _;
    use std::sync::Arc;
    use tracing_subscriber::layer::SubscriberExt;

    fn headers(traceparent: &str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, HeaderValue::from_str(traceparent).unwrap());
        headers
    }

    #[test]
    fn test_extract_valid_traceparent() {
        let cx = extract_parent(&headers(
            "00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01",
        ))
        .unwrap();
        let span_context = cx.span().span_context().clone();
        assert_eq!(
            span_context.trace_id().to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert!(span_context.is_remote());
        assert!(span_context.is_sampled());
    }

    #[test]
    fn test_reject_bad_traceparent() {
        for value in [
            "garbage",
            "00-00000000000000000000000000000000-00f067aa0ba902b7-01",
            "00-4bf92f3577b34da6a3ce929d0e0e4736-0000000000000000-01",
            "00-4bf92f3577b34da6a3ce929d0e0e473-00f067aa0ba902b7-01",
        ] {
            assert!(extract_parent(&headers(value)).is_none(), "{value}");
        }
        assert!(extract_parent(&HeaderMap::new()).is_none());
    }

    #[test]
    fn test_inject_then_extract_keeps_trace() {
        let root = new_root_context();
        let injected = inject_headers(&root);
        let traceparent = &injected[TRACEPARENT];
        assert!(traceparent.starts_with("00-"));
        assert_eq!(trace_id_of(&root).to_string().len(), 32);

        let cx = extract_parent(&headers(traceparent)).unwrap();
        assert_eq!(trace_id_of(&cx), trace_id_of(&root));
    }

    struct CountingSpan {
        ends: Arc<AtomicUsize>,
    }

    impl Span for CountingSpan {
        fn trace_id(&self) -> TraceId {
            TraceId::from_hex("1").unwrap()
        }
        fn record_exception(&mut self, _kind: &str, _error: &dyn std::error::Error) {}
        fn set_status(&mut self, _status: SpanStatus) {}
        fn end(&mut self) {
            self.ends.fetch_add(1, Ordering::SeqCst);
        }
    }

    #[test]
    fn test_guard_ends_once() {
        let ends = Arc::new(AtomicUsize::new(0));
        {
            let mut guard = SpanGuard::new(Box::new(CountingSpan { ends: ends.clone() }));
            guard.succeed();
            assert!(guard.tracing_span().is_none());
        }
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_guard_ends_on_early_return() {
        fn work(ends: Arc<AtomicUsize>) -> Result<(), std::fmt::Error> {
            let mut guard = SpanGuard::new(Box::new(CountingSpan { ends }));
            let err = std::fmt::Error;
            guard.fail("InternalError", &err);
            Err(err)
        }

        let ends = Arc::new(AtomicUsize::new(0));
        assert!(work(ends.clone()).is_err());
        assert_eq!(ends.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_tracing_tracer_without_layer_still_correlates() {
        let tracer = TracingTracer::new("inventory-service");
        let parent = new_root_context();

        let mut span = tracer.start("process-data", Some(&parent));
        assert_eq!(span.trace_id(), trace_id_of(&parent));
        span.set_status(SpanStatus::Ok);
        span.end();
        // Second end is a no-op.
        span.end();

        let root = tracer.start("process-data", None);
        assert_ne!(root.trace_id(), TraceId::INVALID);
        assert_ne!(root.trace_id(), trace_id_of(&parent));
    }

    #[test]
    fn test_tracing_tracer_uses_opentelemetry_ids() {
        let provider = sdktrace::TracerProvider::builder().build();
        let subscriber = tracing_subscriber::registry()
            .with(tracing_opentelemetry::layer().with_tracer(provider.tracer("test")));
        let _default = tracing::subscriber::set_default(subscriber);

        let tracer = TracingTracer::new("inventory-service");
        let parent = new_root_context();
        let span = tracer.start("process-data", Some(&parent));

        let active = span.tracing_span();
        assert!(!active.is_none());
        assert_eq!(trace_id_of(&active.context()), span.trace_id());
        assert_eq!(span.trace_id(), trace_id_of(&parent));

        let root = tracer.start("process-data", None);
        assert_eq!(trace_id_of(&root.tracing_span().context()), root.trace_id());
        assert_ne!(root.trace_id(), span.trace_id());
    }
}

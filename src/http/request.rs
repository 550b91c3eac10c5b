//! Request handling.
//!
//! # Responsibilities
//! - Build the orchestrator's `RequestContext` from inbound headers
//! - Record per-request HTTP metrics
//!
//! # Design Decisions
//! - Request ID is added as early as possible (outermost layer) for tracing
//! - A malformed `traceparent` is ignored, never rejected: the request gets
//!   a fresh trace instead

use std::time::Instant;

use axum::{
    body::Body,
    extract::MatchedPath,
    http::{HeaderMap, Request},
    middleware::Next,
    response::Response,
};

use crate::observability::metrics;
use crate::observability::tracing::extract_parent;
use crate::workflow::RequestContext;

/// Request id header, set by `SetRequestIdLayer` when absent.
pub const X_REQUEST_ID: &str = "x-request-id";

/// Extract trace parent and request id.
pub fn request_context(headers: &HeaderMap) -> RequestContext {
    let parent = extract_parent(headers);

    let request_id = headers
        .get(X_REQUEST_ID)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string);

    RequestContext { parent, request_id }
}

/// Route-level middleware recording `http_requests_total` and latency.
pub async fn track_metrics(request: Request<Body>, next: Next) -> Response {
    let start = Instant::now();
    let path = request
        .extensions()
        .get::<MatchedPath>()
        .map_or_else(|| request.uri().path().to_string(), |p| p.as_str().to_string());
    let method = request.method().clone();

    let response = next.run(request).await;

    metrics::record_request(method.as_str(), &path, response.status().as_u16(), start);
    response
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::observability::tracing::{trace_id_of, TRACEPARENT};
    use axum::http::HeaderValue;

    #[test]
    fn test_context_from_headers() {
        let mut headers = HeaderMap::new();
        headers.insert(
            TRACEPARENT,
            HeaderValue::from_static("00-4bf92f3577b34da6a3ce929d0e0e4736-00f067aa0ba902b7-01"),
        );
        headers.insert(X_REQUEST_ID, HeaderValue::from_static("req-42"));

        let ctx = request_context(&headers);
        assert_eq!(
            trace_id_of(&ctx.parent.unwrap()).to_string(),
            "4bf92f3577b34da6a3ce929d0e0e4736"
        );
        assert_eq!(ctx.request_id.as_deref(), Some("req-42"));
    }

    #[test]
    fn test_bad_traceparent_is_ignored() {
        let mut headers = HeaderMap::new();
        headers.insert(TRACEPARENT, HeaderValue::from_static("not-a-trace"));

        let ctx = request_context(&headers);
        assert!(ctx.parent.is_none());
        assert!(ctx.request_id.is_none());
    }
}

//! Route handlers.
//!
//! Each handler is a thin adapter: it pulls what it needs out of the
//! request, delegates to the orchestrator, readiness aggregator or metrics
//! registry, and maps the result onto a status code and body.

use axum::{
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};

use crate::http::request::request_context;
use crate::http::response::ApiError;
use crate::http::server::AppState;
use crate::observability::metrics::CONTENT_TYPE;
use crate::workflow::DataResponse;

/// `GET /data`: run the counter/store/queue/log workflow once.
pub async fn data_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<Json<DataResponse>, ApiError> {
    let ctx = request_context(&headers);
    let response = state.orchestrator.handle(ctx).await?;
    Ok(Json(response))
}

/// `GET /metrics`: Prometheus text exposition.
pub async fn metrics_handler(State(state): State<AppState>) -> Response {
    let body = state.metrics.snapshot();
    ([(header::CONTENT_TYPE, CONTENT_TYPE)], body).into_response()
}

/// `GET /healthz`: `200 ok` or `503 not ready <detail>`.
pub async fn healthz_handler(State(state): State<AppState>) -> Response {
    let report = state.readiness.check().await;
    if report.ready {
        return (StatusCode::OK, "ok").into_response();
    }

    let detail = report.detail.unwrap_or_default();
    (
        StatusCode::SERVICE_UNAVAILABLE,
        format!("not ready {detail}"),
    )
        .into_response()
}

//! Response handling.
//!
//! # Responsibilities
//! - Map workflow errors to HTTP responses
//!
//! # Design Decisions
//! - Every workflow error becomes `500 {"error": message}`; the step that
//!   failed is not exposed to the caller
//! - No partial-success shape exists

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};

use crate::workflow::WorkflowError;

/// Error body returned to clients.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}

/// Error returned by the `/data` handler.
#[derive(Debug)]
pub struct ApiError(WorkflowError);

impl From<WorkflowError> for ApiError {
    fn from(err: WorkflowError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: self.0.to_string(),
        };
        (StatusCode::INTERNAL_SERVER_ERROR, Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::BackendError;

    #[tokio::test]
    async fn test_all_kinds_collapse_to_500() {
        for err in [
            WorkflowError::Cache(BackendError::Unavailable("a".into())),
            WorkflowError::Store(BackendError::Unavailable("b".into())),
            WorkflowError::Queue(BackendError::Unavailable("c".into())),
            WorkflowError::Internal("d".into()),
        ] {
            let message = err.to_string();
            let response = ApiError::from(err).into_response();
            assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

            let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
                .await
                .unwrap();
            let body: ErrorBody = serde_json::from_slice(&bytes).unwrap();
            assert_eq!(body.error, message);
        }
    }
}

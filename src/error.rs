//! Application error types with Axum response mapping.
//!
//! Gateway errors answer `{"error": ...}`. Errors relayed from the API
//! gateway keep its status and `{"message": ...}` shape so console pages see
//! the same body they would have received directly.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde_json::json;

use crate::api::client::ApiError;

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not authenticated")]
    NotAuthenticated,

    #[error("CSRF validation failed")]
    CsrfFailed,

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Identity provider unavailable: {0}")]
    ProviderUnavailable(String),

    #[error("Upstream error {status}: {message}")]
    Upstream { status: StatusCode, message: String },

    #[error("Upstream request failed: {0}")]
    UpstreamUnreachable(String),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<ApiError> for AppError {
    fn from(err: ApiError) -> Self {
        match err {
            ApiError::Status { status, message } => AppError::Upstream { status, message },
            ApiError::Cancelled => AppError::Internal("Request cancelled".into()),
            other => AppError::UpstreamUnreachable(other.to_string()),
        }
    }
}

impl AppError {
    fn status_and_body(&self) -> (StatusCode, serde_json::Value) {
        match self {
            AppError::NotAuthenticated => (
                StatusCode::UNAUTHORIZED,
                json!({"error": "Not authenticated"}),
            ),
            AppError::CsrfFailed => (
                StatusCode::FORBIDDEN,
                json!({
                    "error": "CSRF validation failed",
                    "message": "Missing X-Console-CSRF header"
                }),
            ),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, json!({"error": msg})),
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, json!({"error": msg})),
            AppError::ProviderUnavailable(_) => (
                StatusCode::BAD_GATEWAY,
                json!({"error": "Identity provider unavailable"}),
            ),
            AppError::Upstream { status, message } => (*status, json!({"message": message})),
            AppError::UpstreamUnreachable(_) => (
                StatusCode::BAD_GATEWAY,
                json!({"message": "An unexpected error occurred"}),
            ),
            AppError::Internal(msg) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                json!({"error": msg}),
            ),
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, body) = self.status_and_body();
        if status.is_server_error() {
            tracing::error!("{}", self);
        }
        (status, axum::Json(body)).into_response()
    }
}

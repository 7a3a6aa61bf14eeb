//! CSRF guard: state-changing console calls must carry `X-Console-CSRF: 1`.
//!
//! A cross-site form post cannot set custom headers, and CORS only admits the
//! header from the configured console origin.

use axum::extract::Request;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};

use crate::error::AppError;

pub const CSRF_HEADER: &str = "x-console-csrf";

pub async fn require_csrf(req: Request, next: Next) -> Result<Response, impl IntoResponse> {
    if req.headers().get(CSRF_HEADER).and_then(|v| v.to_str().ok()) != Some("1") {
        tracing::debug!(path = %req.uri().path(), "request rejected: missing CSRF header");
        return Err(AppError::CsrfFailed);
    }
    Ok(next.run(req).await)
}

//! `/api/tenant-context`: onboarding result stored in the `tenant_info`
//! cookie.

use axum::Json;
use axum::extract::State;
use axum::http::{HeaderMap, HeaderValue, header};
use axum::response::{IntoResponse, Response};
use serde_json::json;
use std::sync::Arc;

use crate::error::AppError;
use crate::middleware::route_gate::DASHBOARD_PATH;
use crate::session::middleware::SessionHandle;
use crate::tenant::{TenantContext, tenant_from_headers};

pub async fn get_context(headers: HeaderMap) -> Result<Json<TenantContext>, AppError> {
    tenant_from_headers(&headers)
        .map(Json)
        .ok_or_else(|| AppError::NotFound("No tenant context".into()))
}

/// Complete onboarding: validate and set the cookie the route gate checks.
pub async fn save_context(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
    Json(context): Json<TenantContext>,
) -> Result<Response, AppError> {
    if state.config.gate_require_auth && state.sessions.current_user(&session).await.is_none() {
        return Err(AppError::NotAuthenticated);
    }
    context.validate()?;

    let cookie = context.set_cookie_header(
        state.config.session_https_only,
        state.config.cookie_domain.as_deref(),
    );
    let cookie = HeaderValue::from_str(&cookie)
        .map_err(|e| AppError::Internal(format!("invalid tenant cookie: {e}")))?;

    tracing::info!(organization = %context.organization_name, "tenant onboarding completed");

    let mut response = Json(json!({
        "success": true,
        "redirect_to": DASHBOARD_PATH,
    }))
    .into_response();
    response.headers_mut().append(header::SET_COOKIE, cookie);
    Ok(response)
}

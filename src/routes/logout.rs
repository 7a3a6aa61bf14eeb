//! POST /auth/logout

use axum::Json;
use axum::extract::State;
use axum::http::HeaderName;
use axum::response::IntoResponse;
use std::sync::Arc;

use crate::session::middleware::SessionHandle;
use crate::types::LogoutResponse;

const CLEAR_SITE_DATA: HeaderName = HeaderName::from_static("clear-site-data");

/// Local sign-out. The browser is also told to drop script-side storage
/// (`oidc.*` / `auth.*` keys left by older console builds).
pub async fn logout(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
) -> impl IntoResponse {
    let redirect_to = state.sessions.sign_out(&session).await;
    (
        [(CLEAR_SITE_DATA, "\"storage\"")],
        Json(LogoutResponse {
            success: true,
            redirect_to,
        }),
    )
}

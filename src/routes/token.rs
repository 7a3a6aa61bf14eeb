//! GET /auth/token

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::TokenResponse;

/// Access token for direct gateway calls; refreshed first if needed. The
/// refresh token never leaves the server.
pub async fn get_token(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
) -> Result<Json<TokenResponse>, AppError> {
    let user = state
        .sessions
        .current_user(&session)
        .await
        .ok_or(AppError::NotAuthenticated)?;

    Ok(Json(TokenResponse {
        access_token: user.access_token,
        expires_at: user.expires_at,
    }))
}

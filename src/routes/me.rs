//! GET /auth/me

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;
use crate::types::UserInfoResponse;

/// Profile of the signed-in user (claims are display-only).
pub async fn me(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
) -> Result<Json<UserInfoResponse>, AppError> {
    let user = state
        .sessions
        .current_user(&session)
        .await
        .ok_or(AppError::NotAuthenticated)?;

    Ok(Json(UserInfoResponse {
        sub: user.subject,
        name: user.profile.name,
        email: user.profile.email,
        role: user.profile.role,
    }))
}

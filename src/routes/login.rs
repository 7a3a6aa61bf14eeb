//! GET /auth/login

use axum::extract::State;
use axum::response::Redirect;
use std::sync::Arc;

use crate::error::AppError;
use crate::session::middleware::SessionHandle;

/// Start the authorization-code flow and send the browser to the provider.
pub async fn login(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
) -> Result<Redirect, AppError> {
    let url = state.sessions.sign_in_redirect(&session).await?;
    Ok(Redirect::temporary(&url))
}

//! GET /auth/callback

use axum::extract::{Query, State};
use axum::response::Redirect;
use std::sync::Arc;

use crate::session::manager::CallbackParams;
use crate::session::middleware::SessionHandle;

/// Provider redirect target. Lands on the dashboard or, on any failure,
/// the landing page; the reason is only logged.
pub async fn oauth_callback(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
    Query(params): Query<CallbackParams>,
) -> Redirect {
    let target = state.sessions.complete_sign_in(&session, params).await;
    Redirect::temporary(&target)
}

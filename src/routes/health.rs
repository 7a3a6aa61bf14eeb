//! GET /health

use axum::Json;
use axum::extract::State;
use std::sync::Arc;

use crate::types::HealthResponse;

pub async fn health(State(state): State<Arc<crate::AppState>>) -> Json<HealthResponse> {
    let status = if state.sessions.is_disposed() {
        "shutting-down"
    } else {
        "ok"
    };
    Json(HealthResponse {
        status: status.into(),
        mode: "console-gateway".into(),
        sessions: format!("memory ({} stored)", state.session_layer.backend.len()),
    })
}

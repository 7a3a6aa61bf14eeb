//! Page-level route gate.
//!
//! Runs before page and static routes: unauthenticated visitors go to the
//! login page, authenticated users without a tenant go to onboarding, and
//! users who already onboarded are sent past it to the dashboard. API, auth
//! and asset paths are never gated here.

use axum::extract::{Request, State};
use axum::middleware::Next;
use axum::response::{IntoResponse, Redirect, Response};
use std::sync::Arc;

use crate::session::middleware::SessionHandle;
use crate::tenant::has_tenant_cookie;

pub const LOGIN_PATH: &str = "/auth/login";
pub const ONBOARDING_PATH: &str = "/onboarding";
pub const DASHBOARD_PATH: &str = "/modules/dashboard";

const EXEMPT_PREFIXES: &[&str] = &[
    "/_next", "/api", "/store", "/admin", "/auth", "/fonts", "/examples",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GateDecision {
    Pass,
    Redirect(&'static str),
}

pub fn is_exempt(path: &str) -> bool {
    path == "/"
        || EXEMPT_PREFIXES.iter().any(|prefix| path.starts_with(prefix))
        || is_root_file(path)
}

/// `/name.ext...`: files served from the site root (favicon, robots, ...).
fn is_root_file(path: &str) -> bool {
    let Some(rest) = path.strip_prefix('/') else {
        return false;
    };
    let is_word = |c: char| c.is_ascii_alphanumeric() || c == '_';

    let stem_len = rest
        .find(|c: char| !(is_word(c) || c == '-'))
        .unwrap_or(rest.len());
    if stem_len == 0 {
        return false;
    }
    rest[stem_len..]
        .strip_prefix('.')
        .and_then(|ext| ext.chars().next())
        .is_some_and(is_word)
}

/// Decide what to do with a page request. Pure and idempotent.
pub fn decide(path: &str, authenticated: bool, has_tenant: bool) -> GateDecision {
    if is_exempt(path) {
        return GateDecision::Pass;
    }
    if !authenticated {
        return GateDecision::Redirect(LOGIN_PATH);
    }
    if path.starts_with(DASHBOARD_PATH) && !has_tenant {
        return GateDecision::Redirect(ONBOARDING_PATH);
    }
    if path == ONBOARDING_PATH && has_tenant {
        return GateDecision::Redirect(DASHBOARD_PATH);
    }
    GateDecision::Pass
}

pub async fn route_gate(
    State(state): State<Arc<crate::AppState>>,
    session: SessionHandle,
    req: Request,
    next: Next,
) -> Response {
    let path = req.uri().path();
    if is_exempt(path) {
        return next.run(req).await;
    }

    let authenticated = !state.config.gate_require_auth
        || session
            .data
            .lock()
            .await
            .tokens()
            .is_some_and(|t| t.is_live());
    let has_tenant = has_tenant_cookie(req.headers());

    match decide(path, authenticated, has_tenant) {
        GateDecision::Pass => next.run(req).await,
        GateDecision::Redirect(to) => {
            tracing::debug!(path, to, authenticated, has_tenant, "route gate redirect");
            Redirect::temporary(to).into_response()
        }
    }
}

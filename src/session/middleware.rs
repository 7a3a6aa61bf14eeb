//! Axum session middleware.
//!
//! Resolves the signed `pc_session` cookie to server-side data, hands the
//! request a `SessionHandle` through extensions, and after the handler runs
//! persists changed data (re-issuing the cookie) or deletes a destroyed
//! session (expiring the cookie).

use axum::extract::{FromRequestParts, Request};
use axum::http::request::Parts;
use axum::http::{HeaderValue, header};
use axum::middleware::Next;
use axum::response::Response;
use std::sync::Arc;
use tokio::sync::Mutex;

use super::cookie::{sign_session_id, verify_cookie};
use super::{SessionBackend, SessionData};
use crate::oidc::pkce::random_token;

pub const COOKIE_NAME: &str = "pc_session";
const MAX_AGE_SECS: u64 = 30 * 24 * 3600;

/// Shared handle to session state, inserted into request extensions.
#[derive(Clone)]
pub struct SessionHandle {
    pub id: String,
    pub data: Arc<Mutex<SessionData>>,
    pub destroyed: Arc<Mutex<bool>>,
}

impl<S> FromRequestParts<S> for SessionHandle
where
    S: Send + Sync,
{
    type Rejection = crate::error::AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionHandle>()
            .cloned()
            .ok_or(crate::error::AppError::Internal(
                "Session middleware not configured".into(),
            ))
    }
}

impl SessionHandle {
    pub fn new(id: String, data: SessionData) -> Self {
        Self {
            id,
            data: Arc::new(Mutex::new(data)),
            destroyed: Arc::new(Mutex::new(false)),
        }
    }

    /// Clear the data and have the middleware delete the session.
    pub async fn destroy(&self) {
        *self.destroyed.lock().await = true;
        self.data.lock().await.clear();
    }

    pub async fn is_destroyed(&self) -> bool {
        *self.destroyed.lock().await
    }
}

/// Session middleware configuration.
pub struct SessionLayer<B: SessionBackend> {
    pub backend: Arc<B>,
    pub secret: String,
    pub https_only: bool,
    pub cookie_domain: Option<String>,
}

/// Axum middleware function for session handling.
pub async fn session_middleware<B: SessionBackend + 'static>(
    layer: Arc<SessionLayer<B>>,
    mut req: Request,
    next: Next,
) -> Response {
    let session_id = req
        .headers()
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| parse_cookie(h, COOKIE_NAME))
        .and_then(|v| verify_cookie(layer.secret.as_bytes(), v));

    let loaded = match session_id {
        Some(id) => layer.backend.load(&id).await.map(|data| (id, data)),
        None => None,
    };

    // Unknown, expired or forged cookies all start a fresh session.
    let (id, initial_data) = loaded.unwrap_or_else(|| (random_token(), SessionData::new()));
    let handle = SessionHandle::new(id, initial_data.clone());
    req.extensions_mut().insert(handle.clone());

    let mut response = next.run(req).await;

    let destroyed = handle.is_destroyed().await;
    let current_data = handle.data.lock().await.clone();
    let domain = layer.cookie_domain.as_deref();

    let cookie = if destroyed {
        layer.backend.delete(&handle.id).await;
        Some(make_delete_cookie(layer.https_only, domain))
    } else if current_data != initial_data {
        // Untouched sessions are never persisted, so anonymous traffic
        // does not fill the store.
        layer.backend.save(&handle.id, &current_data).await;
        Some(make_set_cookie(&layer.secret, &handle.id, layer.https_only, domain))
    } else {
        None
    };

    if let Some(cookie) = cookie {
        match HeaderValue::from_str(&cookie) {
            Ok(value) => {
                response.headers_mut().append(header::SET_COOKIE, value);
            }
            Err(e) => tracing::error!("invalid session cookie header: {}", e),
        }
    }

    response
}

fn cookie_attributes(parts: &mut Vec<String>, https_only: bool, cookie_domain: Option<&str>) {
    parts.push("Path=/".into());
    parts.push("HttpOnly".into());
    parts.push("SameSite=Lax".into());
    if https_only {
        parts.push("Secure".into());
    }
    if let Some(domain) = cookie_domain {
        parts.push(format!("Domain={domain}"));
    }
}

fn make_set_cookie(
    secret: &str,
    session_id: &str,
    https_only: bool,
    cookie_domain: Option<&str>,
) -> String {
    let signed = sign_session_id(secret.as_bytes(), session_id);
    let mut parts = vec![
        format!("{}={}", COOKIE_NAME, signed),
        format!("Max-Age={}", MAX_AGE_SECS),
    ];
    cookie_attributes(&mut parts, https_only, cookie_domain);
    parts.join("; ")
}

fn make_delete_cookie(https_only: bool, cookie_domain: Option<&str>) -> String {
    let mut parts = vec![format!("{}=", COOKIE_NAME), "Max-Age=0".into()];
    cookie_attributes(&mut parts, https_only, cookie_domain);
    parts.join("; ")
}

/// Parse a specific cookie from a Cookie header value.
pub fn parse_cookie<'a>(header: &'a str, name: &str) -> Option<&'a str> {
    header.split(';').find_map(|part| {
        part.trim()
            .strip_prefix(name)
            .and_then(|rest| rest.strip_prefix('='))
    })
}

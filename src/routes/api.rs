//! `/api/{products,tenants,subscriptions,billing}`: console-facing proxy to
//! the API gateway.
//!
//! The session's access token is attached server-side. Callers without a
//! session may present their own bearer token, which is forwarded as-is for
//! the gateway to judge. Gateway errors come back with their status and
//! `{"message": ...}` body.

use axum::extract::{Path, State};
use axum::http::{HeaderMap, StatusCode, header};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::Value;
use std::sync::Arc;
use tokio_util::sync::{CancellationToken, DropGuard};

use crate::AppState;
use crate::api::resources::Resource;
use crate::error::AppError;
use crate::oidc::jwt::subject_from_request;
use crate::session::middleware::SessionHandle;

/// CRUD routes for one resource, to be nested at its console path.
pub fn router<R: Resource>() -> Router<Arc<AppState>> {
    let router = Router::new()
        .route("/", get(list::<R>).post(create::<R>))
        .route("/{id}", get(get_one::<R>).patch(update::<R>).delete(remove::<R>));

    if R::LIST_WITH_FILTER {
        router.route("/search", post(search::<R>))
    } else {
        router
    }
}

/// Credentials and cancellation for one proxied call.
///
/// Dropping the call (handler finished, or the client went away and axum
/// dropped the handler future) cancels the upstream request.
struct ProxyCall {
    bearer: Option<String>,
    cancel: CancellationToken,
    _guard: DropGuard,
}

impl ProxyCall {
    async fn begin<R: Resource>(state: &AppState, session: &SessionHandle, headers: &HeaderMap) -> Self {
        let user = state.sessions.current_user(session).await;
        let (bearer, subject) = match user {
            Some(user) => (Some(user.access_token), Some(user.subject)),
            None => (bearer_from_headers(headers), subject_from_request(headers)),
        };

        tracing::debug!(
            resource = R::PATH,
            subject = subject.as_deref().unwrap_or("anonymous"),
            "proxying to API gateway"
        );

        let cancel = state.sessions.shutdown_token();
        Self {
            bearer,
            _guard: cancel.clone().drop_guard(),
            cancel,
        }
    }

    fn bearer(&self) -> Option<&str> {
        self.bearer.as_deref()
    }
}

fn bearer_from_headers(headers: &HeaderMap) -> Option<String> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|t| !t.is_empty())
        .map(String::from)
}

async fn list<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
) -> Result<Json<Vec<R::Item>>, AppError> {
    let call = ProxyCall::begin::<R>(&state, &session, &headers).await;
    let items = state
        .api
        .resource::<R>(call.bearer(), &call.cancel)
        .list(None)
        .await?;
    Ok(Json(items))
}

async fn search<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
    Json(filter): Json<Value>,
) -> Result<Json<Vec<R::Item>>, AppError> {
    let call = ProxyCall::begin::<R>(&state, &session, &headers).await;
    let items = state
        .api
        .resource::<R>(call.bearer(), &call.cancel)
        .list(Some(&filter))
        .await?;
    Ok(Json(items))
}

async fn get_one<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<Json<R::Item>, AppError> {
    let call = ProxyCall::begin::<R>(&state, &session, &headers).await;
    let item = state
        .api
        .resource::<R>(call.bearer(), &call.cancel)
        .get(&id)
        .await?;
    Ok(Json(item))
}

async fn create<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
    Json(data): Json<Value>,
) -> Result<Json<R::Item>, AppError> {
    let call = ProxyCall::begin::<R>(&state, &session, &headers).await;
    let item = state
        .api
        .resource::<R>(call.bearer(), &call.cancel)
        .create(&data)
        .await?;
    Ok(Json(item))
}

async fn update<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
    Path(id): Path<String>,
    Json(data): Json<Value>,
) -> Result<Json<R::Item>, AppError> {
    let call = ProxyCall::begin::<R>(&state, &session, &headers).await;
    let item = state
        .api
        .resource::<R>(call.bearer(), &call.cancel)
        .update(&id, &data)
        .await?;
    Ok(Json(item))
}

async fn remove<R: Resource>(
    State(state): State<Arc<AppState>>,
    session: SessionHandle,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<StatusCode, AppError> {
    let call = ProxyCall::begin::<R>(&state, &session, &headers).await;
    state
        .api
        .resource::<R>(call.bearer(), &call.cancel)
        .delete(&id)
        .await?;
    Ok(StatusCode::NO_CONTENT)
}

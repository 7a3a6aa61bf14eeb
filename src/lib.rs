//! Product Cloud console gateway.
//!
//! Backend-for-frontend for the admin console: holds OIDC tokens in a
//! server-side session, gates console pages on sign-in and onboarding state,
//! and proxies API calls to the Product Cloud gateway with the session's
//! bearer token.

pub mod api;
pub mod config;
pub mod error;
pub mod middleware;
pub mod ocsf;
pub mod oidc;
pub mod routes;
pub mod session;
pub mod tenant;
pub mod types;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use axum::middleware::{from_fn, from_fn_with_state};
use axum::routing::{get, post};
use std::sync::Arc;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::api::client::ApiClient;
use crate::api::resources::{Billing, Products, Subscriptions, Tenants};
use crate::config::Config;
use crate::error::AppError;
use crate::middleware::csrf::{CSRF_HEADER, require_csrf};
use crate::session::manager::SessionManager;
use crate::session::memory::InMemoryBackend;
use crate::session::middleware::{SessionLayer, session_middleware};

pub type ConsoleSessionManager = SessionManager<InMemoryBackend>;

/// Shared application state available to all route handlers.
pub struct AppState {
    pub config: Config,
    pub sessions: Arc<ConsoleSessionManager>,
    pub session_layer: Arc<SessionLayer<InMemoryBackend>>,
    pub api: ApiClient,
}

impl AppState {
    /// Wire the session store, session manager and API client together.
    pub fn new(config: Config, http_client: reqwest::Client) -> Arc<Self> {
        let backend = Arc::new(InMemoryBackend::new());
        let session_layer = Arc::new(SessionLayer {
            backend: backend.clone(),
            secret: config.session_secret.clone(),
            https_only: config.session_https_only,
            cookie_domain: config.cookie_domain.clone(),
        });
        let sessions = Arc::new(SessionManager::new(
            config.clone(),
            http_client.clone(),
            backend,
        ));
        let api = ApiClient::new(http_client, config.api_gateway_url.clone());

        Arc::new(Self {
            config,
            sessions,
            session_layer,
            api,
        })
    }
}

fn cors_layer(config: &Config) -> CorsLayer {
    let cors = CorsLayer::new()
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([
            header::CONTENT_TYPE,
            header::AUTHORIZATION,
            HeaderName::from_static(CSRF_HEADER),
        ])
        .allow_credentials(true);

    match HeaderValue::from_str(&config.app_base_url) {
        Ok(origin) => cors.allow_origin(AllowOrigin::exact(origin)),
        Err(e) => {
            tracing::warn!("APP_BASE_URL is not a valid origin, CORS disabled: {}", e);
            cors
        }
    }
}

async fn not_found() -> AppError {
    AppError::NotFound("Not found".into())
}

/// Build the Axum router with all middleware and routes.
pub fn create_app(state: Arc<AppState>) -> Router {
    let session_layer = state.session_layer.clone();
    let cors = cors_layer(&state.config);

    let auth_routes = Router::new()
        .route(
            "/logout",
            post(routes::logout::logout).layer(from_fn(require_csrf)),
        )
        .route("/login", get(routes::login::login))
        .route("/callback", get(routes::callback::oauth_callback))
        .route("/me", get(routes::me::me))
        .route("/token", get(routes::token::get_token))
        .route("/events", get(routes::events::auth_events));

    let api_routes = Router::new()
        .route(
            "/tenant-context",
            post(routes::tenant::save_context)
                .layer(from_fn(require_csrf))
                .get(routes::tenant::get_context),
        )
        .nest("/products", routes::api::router::<Products>())
        .nest("/tenants", routes::api::router::<Tenants>())
        .nest("/subscriptions", routes::api::router::<Subscriptions>())
        .nest("/billing", routes::api::router::<Billing>());

    let mut gated = Router::new()
        .nest("/auth", auth_routes)
        .nest("/api", api_routes);

    gated = match &state.config.static_dir {
        Some(dir) => gated.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true)),
        None => gated.fallback(not_found),
    };

    let gated = gated.layer(from_fn_with_state(
        state.clone(),
        middleware::route_gate::route_gate,
    ));

    Router::new()
        .route("/health", get(routes::health::health))
        .merge(gated)
        .layer(from_fn(move |req, next| {
            let layer = session_layer.clone();
            session_middleware(layer, req, next)
        }))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

//! Console gateway entrypoint.
//!
//! Loads `.env` when present, initializes tracing (JSON with
//! `LOG_FORMAT=json`), serves until Ctrl-C, then disposes the session
//! manager so open auth streams and in-flight proxy calls wind down.

use std::env;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{EnvFilter, fmt};

use product_cloud_console::config::Config;
use product_cloud_console::{AppState, create_app};

const PURGE_INTERVAL: Duration = Duration::from_secs(300);

#[tokio::main]
async fn main() {
    let _ = dotenvy::dotenv();

    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    if env::var("LOG_FORMAT").is_ok_and(|f| f.eq_ignore_ascii_case("json")) {
        fmt().json().with_env_filter(filter).init();
    } else {
        fmt().with_env_filter(filter).init();
    }

    let config = Config::from_env().expect("Failed to load configuration");
    let http_client = reqwest::Client::builder()
        .timeout(Duration::from_secs(30))
        .build()
        .expect("Failed to build HTTP client");

    let state = AppState::new(config.clone(), http_client);
    let sessions = state.sessions.clone();
    let backend = state.session_layer.backend.clone();
    let shutdown = CancellationToken::new();

    let purge_shutdown = shutdown.clone();
    let purge = tokio::spawn(async move {
        let mut ticker = tokio::time::interval(PURGE_INTERVAL);
        loop {
            tokio::select! {
                _ = purge_shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    let purged = backend.purge_expired();
                    if purged > 0 {
                        tracing::debug!(purged, "expired sessions purged");
                    }
                }
            }
        }
    });

    let app = create_app(state);

    let addr = format!("0.0.0.0:{}", config.port);
    tracing::info!(
        authority = %config.oidc_authority,
        gateway = %config.api_gateway_url,
        "Starting console gateway on {}",
        addr
    );
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .expect("Failed to bind");

    let signal_shutdown = shutdown.clone();
    let signal_sessions = sessions.clone();
    axum::serve(listener, app)
        .with_graceful_shutdown(async move {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("failed to listen for shutdown signal: {}", e);
            }
            tracing::info!("shutdown signal received");
            // Ends SSE streams so graceful shutdown is not held open.
            signal_sessions.dispose();
            signal_shutdown.cancel();
        })
        .await
        .expect("Server error");

    sessions.dispose();
    shutdown.cancel();
    let _ = purge.await;
    tracing::info!("console gateway stopped");
}

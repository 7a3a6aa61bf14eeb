//! Route gate behavior through the full middleware stack.

mod common;

use axum::http::StatusCode;
use common::{build_test_app, get, live_tokens, location, now_secs, seed_session};
use http_body_util::BodyExt;
use product_cloud_console::config::Config;
use product_cloud_console::tenant::TenantContext;
use product_cloud_console::types::SessionTokens;

fn tenant_cookie() -> String {
    let context = TenantContext {
        organization_name: "Acme".into(),
        timezone: "UTC+00:00".into(),
        industry: String::new(),
    };
    format!("tenant_info={}", context.to_cookie_value())
}

#[tokio::test]
async fn test_anonymous_dashboard_redirects_to_login() {
    let (app, _state) = build_test_app(Config::test_default());

    let resp = get(&app, "/modules/dashboard", None).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/auth/login");
}

#[tokio::test]
async fn test_anonymous_with_tenant_cookie_still_redirects_to_login() {
    let (app, _state) = build_test_app(Config::test_default());

    let resp = get(&app, "/modules/products", Some(&tenant_cookie())).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/auth/login");
}

#[tokio::test]
async fn test_signed_in_without_tenant_goes_to_onboarding() {
    let (app, state) = build_test_app(Config::test_default());
    let session = seed_session(&state, "sid-1", &live_tokens("user-1", "ada@example.com")).await;

    let resp = get(&app, "/modules/dashboard", Some(&session)).await;

    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/onboarding");
}

#[tokio::test]
async fn test_onboarded_user_skips_onboarding() {
    let (app, state) = build_test_app(Config::test_default());
    let session = seed_session(&state, "sid-2", &live_tokens("user-1", "ada@example.com")).await;
    let cookies = format!("{session}; {}", tenant_cookie());

    let resp = get(&app, "/onboarding", Some(&cookies)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/modules/dashboard");

    // the target itself passes the gate (no static dir: plain 404)
    let resp = get(&app, "/modules/dashboard", Some(&cookies)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_empty_tenant_cookie_counts_as_onboarded() {
    let (app, state) = build_test_app(Config::test_default());
    let session = seed_session(&state, "sid-5", &live_tokens("user-1", "ada@example.com")).await;
    let cookies = format!("{session}; tenant_info=");

    let resp = get(&app, "/onboarding", Some(&cookies)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/modules/dashboard");
}

#[tokio::test]
async fn test_refreshable_session_counts_as_signed_in() {
    let (app, state) = build_test_app(Config::test_default());
    let tokens = SessionTokens {
        expires_at: Some(now_secs() - 60),
        ..live_tokens("user-1", "ada@example.com")
    };
    let session = seed_session(&state, "sid-3", &tokens).await;

    let resp = get(&app, "/onboarding", Some(&session)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_dead_session_redirects_to_login() {
    let (app, state) = build_test_app(Config::test_default());
    let tokens = SessionTokens {
        expires_at: Some(now_secs() - 60),
        refresh_token: None,
        ..live_tokens("user-1", "ada@example.com")
    };
    let session = seed_session(&state, "sid-4", &tokens).await;

    let resp = get(&app, "/settings", Some(&session)).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/auth/login");
}

#[tokio::test]
async fn test_exempt_paths_are_not_gated() {
    let (app, _state) = build_test_app(Config::test_default());

    for path in ["/", "/api/unknown", "/favicon.ico", "/_next/static/app.js", "/store/cart", "/admin"] {
        let resp = get(&app, path, None).await;
        assert_eq!(resp.status(), StatusCode::NOT_FOUND, "{path} was gated");
    }
}

#[tokio::test]
async fn test_gate_can_be_relaxed() {
    let mut config = Config::test_default();
    config.gate_require_auth = false;
    let (app, _state) = build_test_app(config);

    let resp = get(&app, "/modules/dashboard", None).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);
    assert_eq!(location(&resp), "/onboarding");

    let resp = get(&app, "/modules/dashboard", Some(&tenant_cookie())).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_static_files_served_behind_gate() {
    let mut config = Config::test_default();
    config.static_dir = Some(format!("{}/tests/fixtures/static", env!("CARGO_MANIFEST_DIR")));
    let (app, state) = build_test_app(config);

    let resp = get(&app, "/", None).await;
    assert_eq!(resp.status(), StatusCode::OK);
    let body = resp.into_body().collect().await.unwrap().to_bytes();
    assert!(String::from_utf8_lossy(&body).contains("landing"));

    let resp = get(&app, "/index.html", None).await;
    assert_eq!(resp.status(), StatusCode::OK);

    let resp = get(&app, "/modules/dashboard", None).await;
    assert_eq!(resp.status(), StatusCode::TEMPORARY_REDIRECT);

    let session = seed_session(&state, "sid-5", &live_tokens("user-1", "ada@example.com")).await;
    let cookies = format!("{session}; {}", tenant_cookie());
    let resp = get(&app, "/modules/dashboard", Some(&cookies)).await;
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}

//! Test utilities: RSA keypair, JWT factory, mock identity provider, test
//! app builder and request helpers.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, Response};
use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use http_body_util::BodyExt;
use product_cloud_console::config::Config;
use product_cloud_console::session::SessionData;
use product_cloud_console::session::SessionBackend;
use product_cloud_console::session::cookie::sign_session_id;
use product_cloud_console::types::SessionTokens;
use product_cloud_console::{AppState, create_app};
use rsa::RsaPrivateKey;
use rsa::pkcs1::{EncodeRsaPrivateKey, LineEnding};
use rsa::traits::PublicKeyParts;
use serde_json::json;
use std::sync::{Arc, OnceLock};
use tower::ServiceExt;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

pub const CLIENT_ID: &str = "test-client-id";

/// Test RSA keypair for signing JWTs.
pub struct TestKeys {
    pub private_key: RsaPrivateKey,
    pub kid: String,
}

impl TestKeys {
    /// One keypair per test binary; 2048-bit generation is slow.
    pub fn shared() -> &'static TestKeys {
        static KEYS: OnceLock<TestKeys> = OnceLock::new();
        KEYS.get_or_init(|| {
            let mut rng = rand::thread_rng();
            let private_key = RsaPrivateKey::new(&mut rng, 2048).expect("failed to generate key");
            TestKeys {
                private_key,
                kid: "test-key-1".into(),
            }
        })
    }

    /// Build a signed JWT with the given claims.
    pub fn sign_jwt(&self, claims: &serde_json::Value) -> String {
        let pem = self
            .private_key
            .to_pkcs1_pem(LineEnding::LF)
            .expect("failed to encode private key");
        let encoding_key =
            jsonwebtoken::EncodingKey::from_rsa_pem(pem.as_bytes()).expect("invalid PEM");

        let mut header = jsonwebtoken::Header::new(jsonwebtoken::Algorithm::RS256);
        header.kid = Some(self.kid.clone());

        jsonwebtoken::encode(&header, claims, &encoding_key).expect("failed to sign JWT")
    }

    /// Unsigned JWT for tokens that are only ever decoded, never verified.
    pub fn make_unsigned_jwt(claims: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","typ":"JWT","kid":"test-key-1"}"#);
        let payload = URL_SAFE_NO_PAD.encode(claims.to_string().as_bytes());
        let sig = URL_SAFE_NO_PAD.encode(b"fake-signature");
        format!("{header}.{payload}.{sig}")
    }

    pub fn jwks_json(&self) -> serde_json::Value {
        let public_key = self.private_key.to_public_key();
        json!({
            "keys": [{
                "kid": self.kid,
                "kty": "RSA",
                "alg": "RS256",
                "use": "sig",
                "n": URL_SAFE_NO_PAD.encode(public_key.n().to_bytes_be()),
                "e": URL_SAFE_NO_PAD.encode(public_key.e().to_bytes_be())
            }]
        })
    }
}

pub fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

/// ID token claims as the mock provider issues them.
pub fn id_claims(issuer: &str, sub: &str, email: &str, nonce: &str) -> serde_json::Value {
    let now = now_secs();
    json!({
        "sub": sub,
        "name": "Ada Lovelace",
        "email": email,
        "role": "admin",
        "iss": issuer,
        "aud": CLIENT_ID,
        "exp": now + 3600,
        "iat": now,
        "nonce": nonce
    })
}

/// Start a mock OIDC provider serving discovery and JWKS.
pub async fn start_idp() -> MockServer {
    let server = MockServer::start().await;
    let base = server.uri();

    Mock::given(method("GET"))
        .and(path("/.well-known/openid-configuration"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "issuer": base,
            "authorization_endpoint": format!("{base}/authorize"),
            "token_endpoint": format!("{base}/token"),
            "jwks_uri": format!("{base}/jwks"),
            "end_session_endpoint": format!("{base}/logout")
        })))
        .mount(&server)
        .await;

    Mock::given(method("GET"))
        .and(path("/jwks"))
        .respond_with(ResponseTemplate::new(200).set_body_json(TestKeys::shared().jwks_json()))
        .mount(&server)
        .await;

    server
}

/// Answer the next token request with a signed ID token for `nonce`.
pub async fn mount_token_response(idp: &MockServer, sub: &str, email: &str, nonce: &str) {
    let id_token = TestKeys::shared().sign_jwt(&id_claims(&idp.uri(), sub, email, nonce));
    Mock::given(method("POST"))
        .and(path("/token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "access_token": format!("at-{sub}"),
            "id_token": id_token,
            "refresh_token": format!("rt-{sub}"),
            "token_type": "Bearer",
            "expires_in": 300
        })))
        .mount(idp)
        .await;
}

pub fn test_config(idp_uri: Option<&str>, gateway_uri: Option<&str>) -> Config {
    let mut config = Config::test_default();
    if let Some(uri) = idp_uri {
        config.oidc_authority = uri.to_string();
    }
    if let Some(uri) = gateway_uri {
        config.api_gateway_url = uri.to_string();
    }
    config
}

pub fn build_test_app(config: Config) -> (axum::Router, Arc<AppState>) {
    let state = AppState::new(config, reqwest::Client::new());
    let app = create_app(state.clone());
    (app, state)
}

/// Live tokens for `sub`, as a completed sign-in would store them.
pub fn live_tokens(sub: &str, email: &str) -> SessionTokens {
    SessionTokens {
        access_token: format!("at-{sub}"),
        id_token: TestKeys::make_unsigned_jwt(&json!({
            "sub": sub,
            "name": "Ada Lovelace",
            "email": email,
            "exp": now_secs() + 3600
        })),
        refresh_token: Some(format!("rt-{sub}")),
        expires_at: Some(now_secs() + 300),
    }
}

/// Store a session directly and return the `pc_session=...` cookie pair.
pub async fn seed_session(state: &AppState, session_id: &str, tokens: &SessionTokens) -> String {
    let mut data = SessionData::new();
    data.set_tokens(tokens);
    state.session_layer.backend.save(session_id, &data).await;
    format!(
        "pc_session={}",
        sign_session_id(state.config.session_secret.as_bytes(), session_id)
    )
}

pub async fn send(app: &axum::Router, req: Request<Body>) -> Response<Body> {
    app.clone().oneshot(req).await.unwrap()
}

pub async fn get(app: &axum::Router, uri: &str, cookie: Option<&str>) -> Response<Body> {
    let mut builder = Request::builder().method("GET").uri(uri);
    if let Some(cookie) = cookie {
        builder = builder.header("Cookie", cookie);
    }
    send(app, builder.body(Body::empty()).unwrap()).await
}

pub async fn body_json(response: Response<Body>) -> serde_json::Value {
    let bytes = response.into_body().collect().await.unwrap().to_bytes();
    serde_json::from_slice(&bytes).unwrap()
}

pub fn location(response: &Response<Body>) -> String {
    response
        .headers()
        .get("location")
        .expect("no Location header")
        .to_str()
        .unwrap()
        .to_string()
}

/// `name=value` pair from a response's `Set-Cookie` headers.
pub fn set_cookie(response: &Response<Body>, name: &str) -> Option<String> {
    response
        .headers()
        .get_all("set-cookie")
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find(|c| c.starts_with(&format!("{name}=")))
        .and_then(|c| c.split(';').next())
        .map(String::from)
}

/// Decoded query parameter from a URL.
pub fn query_param(url: &str, name: &str) -> Option<String> {
    let (_, query) = url.split_once('?')?;
    query.split('&').find_map(|pair| {
        let (key, value) = pair.split_once('=')?;
        (key == name).then(|| urlencoding::decode(value).unwrap().into_owned())
    })
}

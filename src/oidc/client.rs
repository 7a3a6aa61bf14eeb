//! OIDC authorization-code client: authorize URL, code exchange, refresh.

use serde::Deserialize;

use super::discovery::ProviderMetadata;
use super::pkce::PendingSignIn;
use crate::config::Config;

/// Token endpoint success response.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenSet {
    pub access_token: String,
    #[serde(default)]
    pub id_token: Option<String>,
    #[serde(default)]
    pub refresh_token: Option<String>,
    #[serde(default)]
    pub expires_in: Option<u64>,
    #[serde(default)]
    pub token_type: Option<String>,
}

/// Token endpoint error response (RFC 6749 §5.2).
#[derive(Debug, Deserialize)]
struct TokenErrorBody {
    error: String,
    #[serde(default)]
    error_description: Option<String>,
}

/// Build the provider authorization URL for a sign-in attempt.
pub fn authorization_url(
    metadata: &ProviderMetadata,
    config: &Config,
    pending: &PendingSignIn,
) -> String {
    let redirect_uri = config.redirect_uri();
    let challenge = pending.code_challenge();
    let params = [
        ("response_type", "code"),
        ("client_id", config.oidc_client_id.as_str()),
        ("redirect_uri", redirect_uri.as_str()),
        ("scope", config.oidc_scopes.as_str()),
        ("state", pending.state.as_str()),
        ("nonce", pending.nonce.as_str()),
        ("code_challenge", challenge.as_str()),
        ("code_challenge_method", "S256"),
    ];

    let query = params
        .iter()
        .map(|(k, v)| format!("{}={}", k, urlencoding::encode(v)))
        .collect::<Vec<_>>()
        .join("&");

    let separator = if metadata.authorization_endpoint.contains('?') {
        '&'
    } else {
        '?'
    };
    format!("{}{}{}", metadata.authorization_endpoint, separator, query)
}

/// Exchange an authorization code (plus PKCE verifier) for tokens.
pub async fn exchange_code_for_tokens(
    http_client: &reqwest::Client,
    config: &Config,
    token_endpoint: &str,
    code: &str,
    code_verifier: &str,
) -> Result<TokenSet, OidcError> {
    let mut params = vec![
        ("grant_type", "authorization_code".to_string()),
        ("client_id", config.oidc_client_id.clone()),
        ("code", code.to_string()),
        ("redirect_uri", config.redirect_uri()),
        ("code_verifier", code_verifier.to_string()),
    ];

    if !config.oidc_client_secret.is_empty() {
        params.push(("client_secret", config.oidc_client_secret.clone()));
    }

    token_request(http_client, token_endpoint, &params).await
}

/// Refresh tokens with the `refresh_token` grant.
pub async fn refresh_tokens(
    http_client: &reqwest::Client,
    config: &Config,
    token_endpoint: &str,
    refresh_token: &str,
) -> Result<TokenSet, OidcError> {
    let mut params = vec![
        ("grant_type", "refresh_token".to_string()),
        ("client_id", config.oidc_client_id.clone()),
        ("refresh_token", refresh_token.to_string()),
    ];

    if !config.oidc_client_secret.is_empty() {
        params.push(("client_secret", config.oidc_client_secret.clone()));
    }

    token_request(http_client, token_endpoint, &params).await
}

async fn token_request(
    http_client: &reqwest::Client,
    token_endpoint: &str,
    params: &[(&str, String)],
) -> Result<TokenSet, OidcError> {
    let resp = http_client
        .post(token_endpoint)
        .form(params)
        .send()
        .await
        .map_err(|e| OidcError::RequestFailed(e.to_string()))?;

    if !resp.status().is_success() {
        let status = resp.status();
        let text = resp.text().await.unwrap_or_default();
        let msg = match serde_json::from_str::<TokenErrorBody>(&text) {
            Ok(body) => match body.error_description {
                Some(desc) => format!("{}: {}", body.error, desc),
                None => body.error,
            },
            Err(_) => format!("HTTP {status}"),
        };
        return Err(OidcError::TokenEndpoint(msg));
    }

    resp.json()
        .await
        .map_err(|e| OidcError::RequestFailed(e.to_string()))
}

#[derive(Debug, thiserror::Error)]
pub enum OidcError {
    #[error("HTTP request failed: {0}")]
    RequestFailed(String),

    #[error("Provider discovery failed: {0}")]
    Discovery(String),

    #[error("Token endpoint error: {0}")]
    TokenEndpoint(String),
}

//! JWT decode, verify, and JWKS cache.
//!
//! Two very different trust levels live here. `decode_jwt_unverified` reads
//! claims without checking the signature; its output is a UX hint (display
//! name, log context) and must never gate access. `verify_id_token` checks
//! the RS256 signature against the provider's JWKS and is what the sign-in
//! callback relies on before a session is created.

use axum::http::HeaderMap;
use axum::http::header;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use jsonwebtoken::{Algorithm, DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

/// Claims read from a token without signature verification.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UntrustedClaims {
    pub sub: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Option<String>,
    #[serde(default)]
    pub iss: Option<String>,
    #[serde(default)]
    pub exp: Option<u64>,
    #[serde(default)]
    pub iat: Option<u64>,
    #[serde(default)]
    pub nonce: Option<String>,
}

/// JWKS key entry from the provider's `jwks_uri`.
#[derive(Debug, Clone, Deserialize)]
pub struct JwkKey {
    pub kid: String,
    pub kty: String,
    #[serde(default)]
    pub n: Option<String>,
    #[serde(default)]
    pub e: Option<String>,
    #[serde(default)]
    pub alg: Option<String>,
    #[serde(rename = "use", default)]
    pub key_use: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JwksResponse {
    pub keys: Vec<JwkKey>,
}

/// Cached JWKS keys with TTL-based expiry.
pub struct JwksCache {
    keys: RwLock<Option<(HashMap<String, DecodingKey>, Instant)>>,
    ttl: Duration,
    http_client: reqwest::Client,
}

impl JwksCache {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            keys: RwLock::new(None),
            ttl: Duration::from_secs(3600),
            http_client,
        }
    }

    /// Fetch or return cached JWKS keys.
    pub async fn get_keys(&self, jwks_uri: &str) -> Result<HashMap<String, DecodingKey>, JwtError> {
        {
            let guard = self.keys.read().await;
            if let Some((keys, fetched_at)) = guard.as_ref()
                && fetched_at.elapsed() < self.ttl
            {
                return Ok(keys.clone());
            }
        }

        self.refetch(jwks_uri).await
    }

    /// Fetch the key set regardless of the cache's age and replace it.
    pub async fn refetch(&self, jwks_uri: &str) -> Result<HashMap<String, DecodingKey>, JwtError> {
        let resp = self
            .http_client
            .get(jwks_uri)
            .send()
            .await
            .map_err(|e| JwtError::JwksFetchFailed(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(JwtError::JwksFetchFailed(format!("HTTP {}", resp.status())));
        }

        let jwks: JwksResponse = resp
            .json()
            .await
            .map_err(|e| JwtError::JwksFetchFailed(e.to_string()))?;

        let mut key_map = HashMap::new();
        for key in jwks.keys.iter().filter(|k| k.kty == "RSA") {
            let (Some(n), Some(e)) = (key.n.as_deref(), key.e.as_deref()) else {
                continue;
            };
            if let Ok(dk) = DecodingKey::from_rsa_components(n, e) {
                key_map.insert(key.kid.clone(), dk);
            }
        }

        tracing::debug!(keys = key_map.len(), "JWKS refreshed");

        let mut guard = self.keys.write().await;
        *guard = Some((key_map.clone(), Instant::now()));

        Ok(key_map)
    }
}

/// Decode a JWT payload without signature verification.
///
/// Untrusted claim extraction: fine for showing a name or tagging a log
/// line, never for deciding access.
pub fn decode_jwt_unverified(token: &str) -> Result<UntrustedClaims, JwtError> {
    let parts: Vec<&str> = token.split('.').collect();
    if parts.len() != 3 {
        return Err(JwtError::InvalidFormat);
    }

    // Some issuers pad their segments; URL_SAFE_NO_PAD rejects '='.
    let payload = parts[1].trim_end_matches('=');
    let payload_bytes = URL_SAFE_NO_PAD
        .decode(payload)
        .map_err(|_| JwtError::InvalidFormat)?;

    serde_json::from_slice(&payload_bytes).map_err(|_| JwtError::InvalidFormat)
}

/// Subject of the caller's access token, if one can be found.
///
/// Looks at the `access_token` cookie first, then an `Authorization: Bearer`
/// header. Any decode failure yields `None`.
pub fn subject_from_request(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| crate::session::middleware::parse_cookie(h, "access_token"))
        .map(str::to_string);

    let token = from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .filter(|t| !t.is_empty())
            .map(str::to_string)
    })?;

    match decode_jwt_unverified(&token) {
        Ok(claims) => Some(claims.sub),
        Err(e) => {
            tracing::debug!("could not read subject from request token: {}", e);
            None
        }
    }
}

/// Check if a JWT is expired based on its `exp` claim.
pub fn is_token_expired(token: &str) -> bool {
    match decode_jwt_unverified(token) {
        Ok(claims) => claims.exp.is_none_or(|exp| now_secs() >= exp),
        Err(_) => true,
    }
}

pub(crate) fn now_secs() -> u64 {
    std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}

/// Verify an ID token's RS256 signature, issuer, audience, and expiry.
pub async fn verify_id_token(
    token: &str,
    jwks_cache: &JwksCache,
    jwks_uri: &str,
    issuer: &str,
    audience: &str,
) -> Result<UntrustedClaims, JwtError> {
    let header = jsonwebtoken::decode_header(token).map_err(|_| JwtError::InvalidFormat)?;
    let kid = header.kid.ok_or(JwtError::MissingKid)?;

    let mut keys = jwks_cache.get_keys(jwks_uri).await?;
    if !keys.contains_key(&kid) {
        // The provider may have rotated its signing key since the last fetch.
        tracing::info!(kid = %kid, "unknown signing key, refetching JWKS");
        keys = jwks_cache.refetch(jwks_uri).await?;
    }
    let decoding_key = keys.get(&kid).ok_or(JwtError::KeyNotFound(kid))?;

    let mut validation = Validation::new(Algorithm::RS256);
    validation.set_issuer(&[issuer]);
    validation.set_audience(&[audience]);
    validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);

    let token_data = decode::<UntrustedClaims>(token, decoding_key, &validation)
        .map_err(|e| JwtError::Validation(e.to_string()))?;

    Ok(token_data.claims)
}

#[derive(Debug, thiserror::Error)]
pub enum JwtError {
    #[error("Invalid JWT format")]
    InvalidFormat,

    #[error("Token missing kid header")]
    MissingKid,

    #[error("Signing key not found for kid: {0}")]
    KeyNotFound(String),

    #[error("JWKS fetch failed: {0}")]
    JwksFetchFailed(String),

    #[error("JWT validation failed: {0}")]
    Validation(String),
}

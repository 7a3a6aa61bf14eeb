//! OIDC discovery document, cached with a TTL.

use serde::Deserialize;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use super::client::OidcError;

/// The subset of `/.well-known/openid-configuration` the gateway uses.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct ProviderMetadata {
    pub issuer: String,
    pub authorization_endpoint: String,
    pub token_endpoint: String,
    pub jwks_uri: String,
    #[serde(default)]
    pub userinfo_endpoint: Option<String>,
    #[serde(default)]
    pub end_session_endpoint: Option<String>,
}

pub struct ProviderMetadataCache {
    metadata: RwLock<Option<(ProviderMetadata, Instant)>>,
    ttl: Duration,
    http_client: reqwest::Client,
}

impl ProviderMetadataCache {
    pub fn new(http_client: reqwest::Client) -> Self {
        Self {
            metadata: RwLock::new(None),
            ttl: Duration::from_secs(3600),
            http_client,
        }
    }

    /// Fetch or return cached provider metadata.
    pub async fn get(&self, discovery_url: &str) -> Result<ProviderMetadata, OidcError> {
        {
            let guard = self.metadata.read().await;
            if let Some((metadata, fetched_at)) = guard.as_ref()
                && fetched_at.elapsed() < self.ttl
            {
                return Ok(metadata.clone());
            }
        }

        let resp = self
            .http_client
            .get(discovery_url)
            .send()
            .await
            .map_err(|e| OidcError::Discovery(e.to_string()))?;

        if !resp.status().is_success() {
            return Err(OidcError::Discovery(format!("HTTP {}", resp.status())));
        }

        let metadata: ProviderMetadata = resp
            .json()
            .await
            .map_err(|e| OidcError::Discovery(e.to_string()))?;

        tracing::info!(issuer = %metadata.issuer, "OIDC provider metadata loaded");

        let mut guard = self.metadata.write().await;
        *guard = Some((metadata.clone(), Instant::now()));

        Ok(metadata)
    }
}

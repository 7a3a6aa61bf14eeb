//! Shared request/response DTOs and the session model.

use serde::{Deserialize, Serialize};

use crate::oidc::jwt::{UntrustedClaims, decode_jwt_unverified, now_secs};

/// Tokens stored in the server-side session under the `tokens` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct SessionTokens {
    pub access_token: String,
    pub id_token: String,
    pub refresh_token: Option<String>,
    /// Unix seconds. Falls back to the ID token's `exp` when absent.
    #[serde(default)]
    pub expires_at: Option<u64>,
}

impl SessionTokens {
    pub fn is_expired(&self) -> bool {
        let expires_at = self.expires_at.or_else(|| {
            decode_jwt_unverified(&self.id_token)
                .ok()
                .and_then(|c| c.exp)
        });
        expires_at.is_none_or(|exp| now_secs() >= exp)
    }

    pub fn can_refresh(&self) -> bool {
        self.refresh_token.as_deref().is_some_and(|t| !t.is_empty())
    }

    /// Usable now, or usable after a silent refresh.
    pub fn is_live(&self) -> bool {
        !self.is_expired() || self.can_refresh()
    }
}

/// Profile claims shown in the console chrome.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Default)]
pub struct UserProfile {
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// The authenticated user as the console sees it.
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct Session {
    #[serde(skip_serializing)]
    pub access_token: String,
    pub subject: String,
    pub profile: UserProfile,
    pub expires_at: Option<u64>,
}

impl Session {
    /// Build from stored tokens; profile claims come from the ID token.
    pub fn from_tokens(tokens: &SessionTokens) -> Option<Self> {
        let claims: UntrustedClaims = decode_jwt_unverified(&tokens.id_token).ok()?;
        Some(Self {
            access_token: tokens.access_token.clone(),
            subject: claims.sub,
            profile: UserProfile {
                name: claims.name,
                email: claims.email,
                role: claims.role,
            },
            expires_at: tokens.expires_at.or(claims.exp),
        })
    }
}

/// GET /auth/token response.
#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub expires_at: Option<u64>,
}

/// GET /health response.
#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub mode: String,
    pub sessions: String,
}

/// GET /auth/me response.
#[derive(Debug, Serialize)]
pub struct UserInfoResponse {
    pub sub: String,
    pub name: Option<String>,
    pub email: Option<String>,
    pub role: Option<String>,
}

/// POST /auth/logout response.
#[derive(Debug, Serialize)]
pub struct LogoutResponse {
    pub success: bool,
    pub redirect_to: String,
}

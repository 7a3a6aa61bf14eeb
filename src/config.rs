//! Application configuration via environment variables.
//!
//! Identity-provider, app and API-gateway locations all come from the
//! environment; nothing here is defined by the gateway itself.

use std::env;

/// Application configuration loaded from environment variables.
#[derive(Debug, Clone)]
pub struct Config {
    pub oidc_authority: String,
    pub oidc_client_id: String,
    pub oidc_client_secret: String,
    pub oidc_scopes: String,
    pub app_base_url: String,
    pub api_gateway_url: String,
    pub session_secret: String,
    pub session_https_only: bool,
    pub cookie_domain: Option<String>,
    pub gate_require_auth: bool,
    pub static_dir: Option<String>,
    pub port: u16,
}

impl Config {
    /// Load configuration from the process environment.
    ///
    /// Required: `OIDC_AUTHORITY`, `OIDC_CLIENT_ID`.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build a configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let required = |key: &str| {
            lookup(key)
                .filter(|v| !v.is_empty())
                .ok_or_else(|| ConfigError::MissingEnv(key.into()))
        };
        let flag = |key: &str, default: bool| match lookup(key) {
            None => Ok(default),
            Some(v) => parse_flag(&v).ok_or_else(|| ConfigError::Invalid(key.into(), v)),
        };

        let port = match lookup("PORT") {
            Some(v) => v
                .parse()
                .map_err(|_| ConfigError::Invalid("PORT".into(), v))?,
            None => 3000,
        };

        Ok(Self {
            oidc_authority: trim_slash(required("OIDC_AUTHORITY")?),
            oidc_client_id: required("OIDC_CLIENT_ID")?,
            oidc_client_secret: lookup("OIDC_CLIENT_SECRET").unwrap_or_default(),
            oidc_scopes: lookup("OIDC_SCOPES")
                .unwrap_or_else(|| "openid profile email".into()),
            app_base_url: trim_slash(
                lookup("APP_BASE_URL").unwrap_or_else(|| "http://localhost:3000".into()),
            ),
            api_gateway_url: trim_slash(
                lookup("API_GATEWAY_URL").unwrap_or_else(|| "https://localhost:7168".into()),
            ),
            session_secret: lookup("SESSION_SECRET")
                .unwrap_or_else(|| "change-me-in-production".into()),
            session_https_only: flag("SESSION_HTTPS_ONLY", false)?,
            cookie_domain: lookup("COOKIE_DOMAIN").filter(|v| !v.is_empty()),
            gate_require_auth: flag("GATE_REQUIRE_AUTH", true)?,
            static_dir: lookup("STATIC_DIR").filter(|v| !v.is_empty()),
            port,
        })
    }

    /// OIDC discovery document URL.
    pub fn discovery_url(&self) -> String {
        format!("{}/.well-known/openid-configuration", self.oidc_authority)
    }

    /// Redirect URI registered with the identity provider.
    pub fn redirect_uri(&self) -> String {
        format!("{}/auth/callback", self.app_base_url)
    }

    /// Where a successful sign-in lands.
    pub fn dashboard_url(&self) -> String {
        format!("{}/modules/dashboard", self.app_base_url)
    }

    /// Public landing page.
    pub fn landing_url(&self) -> String {
        format!("{}/", self.app_base_url)
    }
}

/// Fixed values for tests; every field is public and can be overridden.
impl Config {
    pub fn test_default() -> Self {
        Self {
            oidc_authority: "https://idp.example.com/realms/product-cloud".into(),
            oidc_client_id: "test-client-id".into(),
            oidc_client_secret: String::new(),
            oidc_scopes: "openid profile email".into(),
            app_base_url: "http://localhost:3000".into(),
            api_gateway_url: "https://localhost:7168".into(),
            session_secret: "test-secret-key".into(),
            session_https_only: false,
            cookie_domain: None,
            gate_require_auth: true,
            static_dir: None,
            port: 3000,
        }
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnv(String),

    #[error("invalid value for {0}: {1}")]
    Invalid(String, String),
}

/// Boolean env value, case-insensitive. Unrecognized values are an error.
fn parse_flag(value: &str) -> Option<bool> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => None,
    }
}

fn trim_slash(value: String) -> String {
    value.trim_end_matches('/').to_string()
}

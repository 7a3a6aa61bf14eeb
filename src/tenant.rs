//! Tenant context captured during onboarding.
//!
//! Stored client-readable in the `tenant_info` cookie as URL-encoded JSON.
//! The route gate only checks that the cookie exists; the contents are
//! informational and never trusted for authorization.

use axum::http::HeaderMap;
use axum::http::header::COOKIE;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::session::middleware::parse_cookie;

pub const TENANT_COOKIE: &str = "tenant_info";

const DEFAULT_TIMEZONE: &str = "UTC+00:00";

fn default_timezone() -> String {
    DEFAULT_TIMEZONE.to_string()
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TenantContext {
    pub organization_name: String,
    #[serde(default = "default_timezone")]
    pub timezone: String,
    #[serde(default)]
    pub industry: String,
}

impl TenantContext {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.organization_name.trim().is_empty() {
            return Err(AppError::BadRequest("Organization name is required".into()));
        }
        Ok(())
    }

    pub fn to_cookie_value(&self) -> String {
        // Serializing three strings cannot fail.
        let json = serde_json::to_string(self).unwrap_or_default();
        urlencoding::encode(&json).into_owned()
    }

    /// Accepts both encoded and raw JSON values.
    pub fn from_cookie_value(value: &str) -> Option<Self> {
        let decoded = urlencoding::decode(value).ok()?;
        serde_json::from_str(&decoded).ok()
    }

    /// `Set-Cookie` value. No expiry and not HttpOnly: console pages read it.
    pub fn set_cookie_header(&self, https_only: bool, cookie_domain: Option<&str>) -> String {
        let mut parts = vec![
            format!("{}={}", TENANT_COOKIE, self.to_cookie_value()),
            "Path=/".to_string(),
            "SameSite=Lax".to_string(),
        ];
        if https_only {
            parts.push("Secure".into());
        }
        if let Some(domain) = cookie_domain {
            parts.push(format!("Domain={domain}"));
        }
        parts.join("; ")
    }
}

fn tenant_cookie_value(headers: &HeaderMap) -> Option<&str> {
    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .find_map(|h| parse_cookie(h, TENANT_COOKIE))
}

/// Cookie presence only; an empty or unparseable value still counts.
pub fn has_tenant_cookie(headers: &HeaderMap) -> bool {
    tenant_cookie_value(headers).is_some()
}

pub fn tenant_from_headers(headers: &HeaderMap) -> Option<TenantContext> {
    tenant_cookie_value(headers).and_then(TenantContext::from_cookie_value)
}

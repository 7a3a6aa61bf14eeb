//! OCSF (Open Cybersecurity Schema Framework) authentication events.
//!
//! Emitted as one JSON line on the `ocsf` tracing target so log pipelines
//! can route them apart from ordinary diagnostics. Emission never fails the
//! request that triggered it.

use serde_json::json;
use std::time::{SystemTime, UNIX_EPOCH};

pub const CLASS_AUTHENTICATION: u32 = 3001;
pub const AUTH_PROTOCOL_OAUTH2: u32 = 10;

/// OCSF Authentication activity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activity {
    Logon,
    Logoff,
    /// Authorization-code exchange.
    AuthTicket,
    /// Silent token refresh.
    ServiceTicket,
    Other,
}

impl Activity {
    fn id(self) -> u32 {
        match self {
            Activity::Logon => 1,
            Activity::Logoff => 2,
            Activity::AuthTicket => 3,
            Activity::ServiceTicket => 4,
            Activity::Other => 99,
        }
    }

    fn name(self) -> &'static str {
        match self {
            Activity::Logon => "Logon",
            Activity::Logoff => "Logoff",
            Activity::AuthTicket => "Authentication Ticket",
            Activity::ServiceTicket => "Service Ticket",
            Activity::Other => "Other",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Informational = 1,
    Low = 2,
    Medium = 3,
    High = 4,
}

impl Severity {
    fn name(self) -> &'static str {
        match self {
            Severity::Informational => "Informational",
            Severity::Low => "Low",
            Severity::Medium => "Medium",
            Severity::High => "High",
        }
    }
}

fn now_millis() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// Build an OCSF Authentication (3001) event.
pub fn authentication_record(
    activity: Activity,
    success: bool,
    severity: Severity,
    user_email: Option<&str>,
    message: &str,
) -> serde_json::Value {
    let (status_id, status) = if success { (1, "Success") } else { (2, "Failure") };

    let mut event = json!({
        "class_uid": CLASS_AUTHENTICATION,
        "class_name": "Authentication",
        "activity_id": activity.id(),
        "activity_name": activity.name(),
        "severity_id": severity as u32,
        "severity": severity.name(),
        "status_id": status_id,
        "status": status,
        "time": now_millis(),
        "metadata": {
            "product": {
                "name": "product-cloud-console",
                "version": env!("CARGO_PKG_VERSION"),
                "vendor_name": "Product Cloud"
            }
        },
        "auth_protocol_id": AUTH_PROTOCOL_OAUTH2,
        "auth_protocol": "OAuth 2.0/OIDC",
        "message": message,
    });

    if let Some(email) = user_email {
        event["actor"] = json!({
            "user": {
                "email_addr": email,
                "type_id": 1,
                "type": "User"
            }
        });
    }

    event
}

/// Emit an OCSF Authentication event.
pub fn authentication_event(
    activity: Activity,
    success: bool,
    severity: Severity,
    user_email: Option<&str>,
    message: &str,
) {
    let event = authentication_record(activity, success, severity, user_email, message);
    if let Ok(line) = serde_json::to_string(&event) {
        tracing::info!(target: "ocsf", "{}", line);
    }
}

/// Email from stored tokens (best-effort, unverified).
pub fn email_from_tokens(tokens: Option<&crate::types::SessionTokens>) -> Option<String> {
    let tokens = tokens?;
    crate::oidc::jwt::decode_jwt_unverified(&tokens.id_token)
        .ok()?
        .email
}

//! HTTP client for the Product Cloud API gateway.
//!
//! Attaches the session's bearer token, normalizes error bodies into
//! [`ApiError`], and races every call against a cancellation token so a
//! caller that has gone away never waits on (or acts on) a stale response.

use reqwest::{Method, StatusCode};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_util::sync::CancellationToken;

const FALLBACK_UNPARSEABLE: &str = "An error occurred";
const FALLBACK_EMPTY_MESSAGE: &str = "Something went wrong";

#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    /// Non-2xx response from the gateway.
    #[error("{message}")]
    Status { status: StatusCode, message: String },

    #[error("API request failed: {0}")]
    Transport(String),

    #[error("Invalid API response: {0}")]
    Decode(String),

    #[error("API request cancelled")]
    Cancelled,
}

impl ApiError {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            ApiError::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

#[derive(Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
}

impl ApiClient {
    pub fn new(http: reqwest::Client, base_url: impl Into<String>) -> Self {
        Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
        }
    }

    /// Call `endpoint` and decode a JSON response body.
    pub async fn request<T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<T, ApiError> {
        let call = async {
            let resp = self.send(method, endpoint, bearer, body).await?;
            resp.json::<T>()
                .await
                .map_err(|e| ApiError::Decode(e.to_string()))
        };

        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = call => result,
        };
        log_failure(endpoint, result)
    }

    /// Call `endpoint` when the success body is irrelevant (DELETE).
    pub async fn request_empty(
        &self,
        method: Method,
        endpoint: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
        cancel: &CancellationToken,
    ) -> Result<(), ApiError> {
        let result = tokio::select! {
            biased;
            _ = cancel.cancelled() => Err(ApiError::Cancelled),
            result = self.send(method, endpoint, bearer, body) => result.map(|_| ()),
        };
        log_failure(endpoint, result)
    }

    async fn send(
        &self,
        method: Method,
        endpoint: &str,
        bearer: Option<&str>,
        body: Option<&Value>,
    ) -> Result<reqwest::Response, ApiError> {
        let url = format!("{}{}", self.base_url, endpoint);
        let mut req = self
            .http
            .request(method, &url)
            .header(reqwest::header::CONTENT_TYPE, "application/json");

        if let Some(token) = bearer.filter(|t| !t.is_empty()) {
            req = req.bearer_auth(token);
        }
        if let Some(body) = body {
            req = req.body(body.to_string());
        }

        let resp = req
            .send()
            .await
            .map_err(|e| ApiError::Transport(e.to_string()))?;

        let status = resp.status();
        if status.is_success() {
            return Ok(resp);
        }

        let message = match resp.json::<Value>().await {
            Ok(body) => body
                .get("message")
                .and_then(Value::as_str)
                .filter(|m| !m.is_empty())
                .unwrap_or(FALLBACK_EMPTY_MESSAGE)
                .to_string(),
            Err(_) => FALLBACK_UNPARSEABLE.to_string(),
        };

        Err(ApiError::Status { status, message })
    }
}

fn log_failure<T>(endpoint: &str, result: Result<T, ApiError>) -> Result<T, ApiError> {
    match &result {
        Err(ApiError::Status { status, message }) => {
            tracing::warn!(endpoint, status = status.as_u16(), "API error: {}", message);
        }
        Err(ApiError::Cancelled) => {
            tracing::debug!(endpoint, "API request cancelled");
        }
        Err(e) => {
            tracing::error!(endpoint, "API error: {}", e);
        }
        Ok(_) => {}
    }
    result
}

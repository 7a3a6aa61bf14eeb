//! Server-side session management.
//!
//! `SessionBackend` is the storage seam, `middleware` binds a session to each
//! request, `manager` owns the sign-in lifecycle and `hook` turns session
//! events into an observable auth state.

pub mod cookie;
pub mod hook;
pub mod manager;
pub mod memory;
pub mod middleware;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

use crate::oidc::pkce::PendingSignIn;
use crate::types::SessionTokens;

const TOKENS_KEY: &str = "tokens";
const PENDING_SIGNIN_KEY: &str = "pending_signin";

/// Session data stored server-side.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct SessionData {
    #[serde(flatten)]
    pub data: HashMap<String, serde_json::Value>,
}

impl SessionData {
    pub fn new() -> Self {
        Self {
            data: HashMap::new(),
        }
    }

    pub fn get(&self, key: &str) -> Option<&serde_json::Value> {
        self.data.get(key)
    }

    pub fn set(&mut self, key: &str, value: serde_json::Value) {
        self.data.insert(key.into(), value);
    }

    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    pub fn clear(&mut self) {
        self.data.clear();
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Stored tokens, if present and well-formed.
    pub fn tokens(&self) -> Option<SessionTokens> {
        self.get(TOKENS_KEY)
            .and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    pub fn set_tokens(&mut self, tokens: &SessionTokens) {
        if let Ok(value) = serde_json::to_value(tokens) {
            self.set(TOKENS_KEY, value);
        }
    }

    pub fn set_pending_signin(&mut self, pending: &PendingSignIn) {
        if let Ok(value) = serde_json::to_value(pending) {
            self.set(PENDING_SIGNIN_KEY, value);
        }
    }

    /// A session holding only a sign-in attempt that was never completed.
    pub fn is_abandoned_sign_in(&self, now: u64) -> bool {
        if self.get(TOKENS_KEY).is_some() {
            return false;
        }
        match self.get(PENDING_SIGNIN_KEY) {
            Some(value) => serde_json::from_value::<PendingSignIn>(value.clone())
                .map_or(true, |pending| pending.is_stale(now)),
            None => false,
        }
    }

    /// Remove and return the in-flight sign-in attempt.
    pub fn take_pending_signin(&mut self) -> Option<PendingSignIn> {
        self.remove(PENDING_SIGNIN_KEY)
            .and_then(|v| serde_json::from_value(v).ok())
    }
}

/// Pluggable session storage backend.
///
/// Implementations must be `Send + Sync` for use in Axum's async handlers.
pub trait SessionBackend: Send + Sync {
    /// Load session data by ID. Returns `None` if not found or expired.
    fn load(
        &self,
        session_id: &str,
    ) -> impl std::future::Future<Output = Option<SessionData>> + Send;

    /// Save session data.
    fn save(
        &self,
        session_id: &str,
        data: &SessionData,
    ) -> impl std::future::Future<Output = ()> + Send;

    /// Delete a session.
    fn delete(&self, session_id: &str) -> impl std::future::Future<Output = ()> + Send;
}

//! In-memory session backend.
//!
//! `DashMap` gives concurrent access without an outer lock. Sessions are
//! lost on restart and are not shared between gateway instances.
//!
//! Sessions that only ever held a sign-in attempt expire with that attempt
//! instead of living out the full max-age.

use dashmap::DashMap;
use std::time::{Duration, Instant};

use super::{SessionBackend, SessionData};
use crate::oidc::jwt::now_secs;

pub struct InMemoryBackend {
    store: DashMap<String, (SessionData, Instant)>,
    max_age: Duration,
}

impl InMemoryBackend {
    pub fn new() -> Self {
        Self::with_max_age(Duration::from_secs(30 * 24 * 3600))
    }

    pub fn with_max_age(max_age: Duration) -> Self {
        Self {
            store: DashMap::new(),
            max_age,
        }
    }

    /// Number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.store.len()
    }

    pub fn is_empty(&self) -> bool {
        self.store.is_empty()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.store.len();
        let now = now_secs();
        self.store
            .retain(|_, (data, created)| !self.is_expired(data, *created, now));
        before - self.store.len()
    }

    fn is_expired(&self, data: &SessionData, created: Instant, now: u64) -> bool {
        created.elapsed() > self.max_age || data.is_abandoned_sign_in(now)
    }
}

impl Default for InMemoryBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBackend for InMemoryBackend {
    async fn load(&self, session_id: &str) -> Option<SessionData> {
        let entry = self.store.get(session_id)?;
        let (data, created) = entry.value();

        if self.is_expired(data, *created, now_secs()) {
            drop(entry); // release the shard read lock before removing
            self.store.remove(session_id);
            return None;
        }

        Some(data.clone())
    }

    async fn save(&self, session_id: &str, data: &SessionData) {
        let created = self
            .store
            .get(session_id)
            .map(|e| e.value().1)
            .unwrap_or_else(Instant::now);

        self.store
            .insert(session_id.to_string(), (data.clone(), created));
    }

    async fn delete(&self, session_id: &str) {
        self.store.remove(session_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn data_with(key: &str, value: serde_json::Value) -> SessionData {
        let mut data = SessionData::new();
        data.set(key, value);
        data
    }

    #[tokio::test]
    async fn test_save_and_load() {
        let backend = InMemoryBackend::new();
        backend.save("s1", &data_with("tenant", serde_json::json!("acme"))).await;

        let loaded = backend.load("s1").await.unwrap();
        assert_eq!(loaded.get("tenant").unwrap(), "acme");
    }

    #[tokio::test]
    async fn test_load_nonexistent() {
        let backend = InMemoryBackend::new();
        assert!(backend.load("nonexistent").await.is_none());
    }

    #[tokio::test]
    async fn test_delete() {
        let backend = InMemoryBackend::new();
        backend.save("s1", &SessionData::new()).await;
        backend.delete("s1").await;
        assert!(backend.load("s1").await.is_none());

        // deleting again is a no-op
        backend.delete("s1").await;
    }

    #[tokio::test]
    async fn test_update_preserves_creation_time() {
        let backend = InMemoryBackend::new();
        backend.save("s1", &data_with("v", serde_json::json!(1))).await;
        let created1 = backend.store.get("s1").unwrap().value().1;

        backend.save("s1", &data_with("v", serde_json::json!(2))).await;
        let created2 = backend.store.get("s1").unwrap().value().1;

        assert_eq!(created1, created2);
        assert_eq!(backend.load("s1").await.unwrap().get("v").unwrap(), 2);
    }

    #[tokio::test]
    async fn test_expiry() {
        let backend = InMemoryBackend::with_max_age(Duration::from_secs(0));
        backend.save("s1", &SessionData::new()).await;

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert!(backend.load("s1").await.is_none());
        assert!(backend.is_empty());
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let backend = InMemoryBackend::with_max_age(Duration::from_secs(0));
        backend.save("a", &SessionData::new()).await;
        backend.save("b", &SessionData::new()).await;

        tokio::time::sleep(Duration::from_millis(1)).await;

        assert_eq!(backend.purge_expired(), 2);
        assert_eq!(backend.len(), 0);
    }

    #[tokio::test]
    async fn test_abandoned_sign_in_dropped() {
        use crate::oidc::pkce::{PENDING_SIGNIN_TTL_SECS, PendingSignIn};

        let backend = InMemoryBackend::new();
        let mut stale = PendingSignIn::generate();
        stale.issued_at -= PENDING_SIGNIN_TTL_SECS + 1;
        let mut data = SessionData::new();
        data.set_pending_signin(&stale);
        backend.save("stale", &data).await;

        let mut data = SessionData::new();
        data.set_pending_signin(&PendingSignIn::generate());
        backend.save("fresh", &data).await;

        assert_eq!(backend.purge_expired(), 1);
        assert!(backend.load("fresh").await.is_some());

        backend.save("stale", &{
            let mut data = SessionData::new();
            data.set_pending_signin(&stale);
            data
        })
        .await;
        assert!(backend.load("stale").await.is_none());
        assert_eq!(backend.len(), 1);
    }

    #[tokio::test]
    async fn test_sessions_isolated() {
        let backend = InMemoryBackend::new();
        backend.save("a", &data_with("user", serde_json::json!("alice"))).await;
        backend.save("b", &data_with("user", serde_json::json!("bob"))).await;

        backend.delete("a").await;
        assert!(backend.load("a").await.is_none());
        assert_eq!(backend.load("b").await.unwrap().get("user").unwrap(), "bob");
    }
}

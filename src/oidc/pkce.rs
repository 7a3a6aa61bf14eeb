//! PKCE (RFC 7636), state and nonce generation.

use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};

use super::jwt::now_secs;

/// How long a sign-in attempt may wait for its callback.
pub const PENDING_SIGNIN_TTL_SECS: u64 = 600;

/// Per-attempt sign-in secrets, held in the session until the callback.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct PendingSignIn {
    pub state: String,
    pub code_verifier: String,
    pub nonce: String,
    /// Unix seconds when the attempt started.
    pub issued_at: u64,
}

impl PendingSignIn {
    pub fn generate() -> Self {
        Self {
            state: random_token(),
            code_verifier: random_token(),
            nonce: random_token(),
            issued_at: now_secs(),
        }
    }

    pub fn is_stale(&self, now: u64) -> bool {
        now.saturating_sub(self.issued_at) > PENDING_SIGNIN_TTL_SECS
    }

    pub fn code_challenge(&self) -> String {
        code_challenge(&self.code_verifier)
    }
}

/// 32 random bytes, base64url without padding (43 chars).
pub fn random_token() -> String {
    let bytes: [u8; 32] = rand::thread_rng().r#gen();
    URL_SAFE_NO_PAD.encode(bytes)
}

/// S256 code challenge: `base64url(sha256(verifier))`.
pub fn code_challenge(verifier: &str) -> String {
    URL_SAFE_NO_PAD.encode(Sha256::digest(verifier.as_bytes()))
}

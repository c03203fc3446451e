//! Portal sessions.
//!
//! ARCHITECTURE
//! ============
//! After a successful sign-in the portal issues its own opaque cookie token
//! and keeps `{ email, id_token, refresh_token }` in memory, keyed by the
//! SHA-256 of the token. The id token is only used to authorize
//! document-store writes on the user's behalf. It lives much shorter than the
//! session, so callers check [`Session::token_stale`] and store renewed
//! tokens with [`SessionStore::update_tokens`]. Passwords are never retained.
//!
//! TRADE-OFFS
//! ==========
//! Sessions do not survive a restart; users sign in again. Expired entries
//! are dropped on lookup and swept on every new login.

use std::collections::HashMap;
use std::fmt::Write;
use std::sync::Arc;
use std::time::Duration;

use rand::Rng;
use sha2::{Digest, Sha256};
use tokio::sync::RwLock;
use tokio::time::Instant;

use crate::services::auth::{AuthIdentity, TokenGrant};

/// Renew id tokens this long before the provider would reject them.
pub const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(5 * 60);

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

#[must_use]
pub(crate) fn hash_token(token: &str) -> String {
    bytes_to_hex(&Sha256::digest(token.as_bytes()))
}

/// Authenticated identity attached to a cookie.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub email: String,
    pub id_token: String,
    pub refresh_token: String,
    created_at: Instant,
    token_expires_at: Instant,
}

impl Session {
    #[must_use]
    pub fn new(identity: &AuthIdentity) -> Self {
        let now = Instant::now();
        Self {
            email: identity.email.clone(),
            id_token: identity.tokens.id_token.clone(),
            refresh_token: identity.tokens.refresh_token.clone(),
            created_at: now,
            token_expires_at: now + identity.tokens.expires_in,
        }
    }

    /// The id token is expired or about to be.
    #[must_use]
    pub fn token_stale(&self) -> bool {
        Instant::now() + TOKEN_REFRESH_MARGIN >= self.token_expires_at
    }

    fn apply(&mut self, grant: &TokenGrant) {
        self.id_token.clone_from(&grant.id_token);
        if !grant.refresh_token.is_empty() {
            self.refresh_token.clone_from(&grant.refresh_token);
        }
        self.token_expires_at = Instant::now() + grant.expires_in;
    }
}

/// In-memory session table. Clone shares the same table.
#[derive(Clone)]
pub struct SessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
    ttl: Duration,
}

impl SessionStore {
    #[must_use]
    pub fn new(ttl: Duration) -> Self {
        Self { sessions: Arc::new(RwLock::new(HashMap::new())), ttl }
    }

    /// Start a session for `identity`, returning the cookie token. Expired
    /// sessions of abandoned cookies are dropped here.
    pub async fn create(&self, identity: &AuthIdentity) -> String {
        let token = generate_token();
        let mut sessions = self.sessions.write().await;
        sessions.retain(|_, s| s.created_at.elapsed() < self.ttl);
        sessions.insert(hash_token(&token), Session::new(identity));
        token
    }

    /// Look up a live session. Expired sessions are removed.
    pub async fn get(&self, token: &str) -> Option<Session> {
        if token.is_empty() {
            return None;
        }
        let key = hash_token(token);
        let session = self.sessions.read().await.get(&key).cloned()?;
        if session.created_at.elapsed() < self.ttl {
            return Some(session);
        }
        self.sessions.write().await.remove(&key);
        None
    }

    /// Store a renewed id token, returning the updated session.
    pub async fn update_tokens(&self, token: &str, grant: &TokenGrant) -> Option<Session> {
        let mut sessions = self.sessions.write().await;
        let session = sessions.get_mut(&hash_token(token))?;
        session.apply(grant);
        Some(session.clone())
    }

    pub async fn delete(&self, token: &str) {
        self.sessions.write().await.remove(&hash_token(token));
    }
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;

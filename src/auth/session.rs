//! In-memory admin sessions.

use std::time::{Duration, Instant};

use dashmap::DashMap;
use uuid::Uuid;

#[derive(Debug, Clone)]
struct Session {
    username: String,
    expires_at: Instant,
}

/// Token → session map with per-session expiry.
#[derive(Debug, Default)]
pub struct SessionStore {
    sessions: DashMap<String, Session>,
}

impl SessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start a session and return its token.
    pub fn create(&self, username: &str, ttl: Duration) -> String {
        let token = Uuid::new_v4().simple().to_string();
        self.sessions.insert(
            token.clone(),
            Session {
                username: username.to_string(),
                expires_at: Instant::now() + ttl,
            },
        );
        token
    }

    /// Username for a live session. Expired sessions are dropped.
    pub fn validate(&self, token: &str) -> Option<String> {
        let session = self.sessions.get(token).map(|r| r.value().clone())?;
        if session.expires_at <= Instant::now() {
            self.sessions.remove(token);
            return None;
        }
        Some(session.username)
    }

    /// Returns `true` if a session was removed.
    pub fn revoke(&self, token: &str) -> bool {
        self.sessions.remove(token).is_some()
    }

    /// Drop every expired session. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let before = self.sessions.len();
        let now = Instant::now();
        self.sessions.retain(|_, s| s.expires_at > now);
        before - self.sessions.len()
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }
}

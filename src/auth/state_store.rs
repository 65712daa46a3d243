//! CSRF state store for the OAuth login flow.
//!
//! Exactly one unconsumed state value exists per in-flight login attempt.
//! A state is created right before redirecting to LinkedIn and consumed the
//! moment the callback validates it, regardless of outcome. If a user
//! double-submits the flow (two tabs), the second callback's state no longer
//! matches a stored value and fails cleanly without corrupting the first.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use chrono::{DateTime, Duration, Utc};
use rand::Rng;

/// Data tied to one login attempt.
#[derive(Debug, Clone)]
pub struct StateEntry {
    /// Redirect URI the authorization URL was built with. The code exchange
    /// must reuse exactly this value.
    pub redirect_uri: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

/// In-process store of unconsumed CSRF state tokens with expiration.
#[derive(Clone)]
pub struct OAuthStateStore {
    states: Arc<Mutex<HashMap<String, StateEntry>>>,
    ttl: Duration,
}

impl OAuthStateStore {
    /// Create a store with the default TTL of 10 minutes.
    pub fn new() -> Self {
        Self::with_ttl(Duration::minutes(10))
    }

    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            states: Arc::new(Mutex::new(HashMap::new())),
            ttl,
        }
    }

    /// Generate a cryptographically random state token, unique per call,
    /// and record it as the one unconsumed value for this attempt.
    pub fn generate(&self, redirect_uri: &str) -> String {
        let random_bytes: [u8; 32] = rand::thread_rng().gen();
        let state = hex::encode(random_bytes);

        let now = Utc::now();
        let entry = StateEntry {
            redirect_uri: redirect_uri.to_string(),
            created_at: now,
            expires_at: now + self.ttl,
        };

        let mut states = self.states.lock().unwrap();
        states.insert(state.clone(), entry);

        state
    }

    /// Validate and consume a state token. The token is removed from the
    /// store whether or not it is still valid, so it can never be replayed.
    pub fn consume(&self, state: &str) -> Option<StateEntry> {
        let mut states = self.states.lock().unwrap();

        match states.remove(state) {
            Some(entry) if Utc::now() <= entry.expires_at => Some(entry),
            _ => None,
        }
    }

    /// Drop expired entries. Called opportunistically from the login entry
    /// point so abandoned attempts don't accumulate.
    pub fn cleanup_expired(&self) {
        let mut states = self.states.lock().unwrap();
        let now = Utc::now();
        states.retain(|_, entry| entry.expires_at > now);
    }
}

impl Default for OAuthStateStore {
    fn default() -> Self {
        Self::new()
    }
}

//! Bearer token storage and management

use serde::{Deserialize, Serialize};
use std::time::{SystemTime, UNIX_EPOCH};

/// Stored bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoredToken {
    pub token: String,
    pub expires_at: Option<u64>,
}

impl StoredToken {
    pub fn new(token: String, expires_in_secs: Option<u64>) -> Self {
        let expires_at = expires_in_secs.map(|secs| now_secs() + secs);
        Self { token, expires_at }
    }

    /// The server issues opaque tokens; expiry is only known when the server
    /// reported one. A token without expiry is treated as live until the
    /// server rejects it.
    pub fn is_expired(&self) -> bool {
        match self.expires_at {
            Some(exp) => now_secs() >= exp,
            None => false,
        }
    }
}

fn now_secs() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs())
        .unwrap_or(0)
}

/// Token store trait for different storage backends
pub trait TokenStore {
    fn get_token(&self) -> Option<StoredToken>;
    fn set_token(&mut self, token: String, expires_in: Option<u64>);
    fn clear_token(&mut self);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_without_expiry_never_expires() {
        let token = StoredToken::new("abc".to_string(), None);
        assert!(!token.is_expired());
    }

    #[test]
    fn token_with_past_expiry_is_expired() {
        let token = StoredToken {
            token: "abc".to_string(),
            expires_at: Some(1),
        };
        assert!(token.is_expired());
    }
}

//! Refresh Tokens
//!
//! Durable record of the single active refresh token per principal.
//!
//! The store contract is replace-on-issue: issuing a token for a principal
//! atomically supersedes any previous token for that principal, which
//! becomes invalid immediately rather than at its own expiry. This is a
//! stated contract of `RefreshTokenStore::issue`, not an emergent property
//! of a database constraint.

use async_trait::async_trait;
use base64::Engine;
use chrono::{DateTime, Duration, Utc};
use dashmap::DashMap;
use serde::{Deserialize, Serialize};

use crate::error::{AuthorityError, Result};

/// Refresh token record
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshToken {
    /// Opaque, unguessable token string (32 random bytes, base64url)
    pub token: String,
    pub principal_id: String,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}

impl RefreshToken {
    /// Generate a fresh token for a principal with the given lifetime.
    pub fn generate(principal_id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            token: Self::generate_raw_token(),
            principal_id: principal_id.into(),
            expires_at: now + ttl,
            created_at: now,
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() >= self.expires_at
    }

    fn generate_raw_token() -> String {
        use rand::RngCore;

        let mut bytes = [0u8; 32];
        rand::thread_rng().fill_bytes(&mut bytes);
        base64::engine::general_purpose::URL_SAFE_NO_PAD.encode(bytes)
    }
}

/// Store of the single active refresh token per principal.
#[async_trait]
pub trait RefreshTokenStore: Send + Sync {
    /// Issue a fresh token, atomically replacing any existing token for the
    /// principal. Serializes per principal, not globally: concurrent logins
    /// by the same user leave exactly one live token.
    async fn issue(&self, principal_id: &str, ttl: Duration) -> Result<RefreshToken>;

    /// Look up a token by its opaque string. A superseded token is not
    /// found, even if its own expiry has not passed.
    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>>;

    /// Resolve a token that must be live: unknown tokens map to
    /// `InvalidRefreshToken`, expired ones to `ExpiredRefreshToken`.
    async fn verify_not_expired(&self, token: &str) -> Result<RefreshToken> {
        let record = self
            .find_by_token(token)
            .await?
            .ok_or(AuthorityError::InvalidRefreshToken)?;
        if record.is_expired() {
            return Err(AuthorityError::ExpiredRefreshToken);
        }
        Ok(record)
    }
}

/// In-memory refresh token store for development and tests.
///
/// The authoritative record is keyed by principal id, so an insert is the
/// atomic replace the contract requires. The token index may briefly point
/// at a superseded token under concurrent issues; `find_by_token` guards
/// against that by re-checking the authoritative record.
pub struct MemoryRefreshTokenStore {
    by_principal: DashMap<String, RefreshToken>,
    token_index: DashMap<String, String>,
}

impl MemoryRefreshTokenStore {
    pub fn new() -> Self {
        Self {
            by_principal: DashMap::new(),
            token_index: DashMap::new(),
        }
    }
}

impl Default for MemoryRefreshTokenStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl RefreshTokenStore for MemoryRefreshTokenStore {
    async fn issue(&self, principal_id: &str, ttl: Duration) -> Result<RefreshToken> {
        let fresh = RefreshToken::generate(principal_id, ttl);

        let superseded = self
            .by_principal
            .insert(principal_id.to_string(), fresh.clone());
        if let Some(old) = superseded {
            self.token_index.remove(&old.token);
        }
        self.token_index
            .insert(fresh.token.clone(), principal_id.to_string());

        Ok(fresh)
    }

    async fn find_by_token(&self, token: &str) -> Result<Option<RefreshToken>> {
        let Some(principal_id) = self.token_index.get(token).map(|e| e.value().clone()) else {
            return Ok(None);
        };
        let Some(record) = self.by_principal.get(&principal_id) else {
            return Ok(None);
        };
        // Stale index entry: the principal has a newer token
        if record.token != token {
            return Ok(None);
        }
        Ok(Some(record.clone()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn issue_then_find_round_trips() {
        let store = MemoryRefreshTokenStore::new();
        let issued = store.issue("p1", Duration::days(7)).await.unwrap();

        let found = store.find_by_token(&issued.token).await.unwrap().unwrap();
        assert_eq!(found.principal_id, "p1");
        assert!(!found.is_expired());
    }

    #[tokio::test]
    async fn second_issue_invalidates_the_first() {
        let store = MemoryRefreshTokenStore::new();
        let first = store.issue("p1", Duration::days(7)).await.unwrap();
        let second = store.issue("p1", Duration::days(7)).await.unwrap();
        assert_ne!(first.token, second.token);

        // The superseded token is invalid immediately, not at its expiry
        let err = store.verify_not_expired(&first.token).await.unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidRefreshToken));

        store.verify_not_expired(&second.token).await.unwrap();
    }

    #[tokio::test]
    async fn expired_token_maps_to_expired_error() {
        let store = MemoryRefreshTokenStore::new();
        let issued = store.issue("p1", Duration::seconds(-1)).await.unwrap();

        let err = store.verify_not_expired(&issued.token).await.unwrap_err();
        assert!(matches!(err, AuthorityError::ExpiredRefreshToken));
    }

    #[tokio::test]
    async fn unknown_token_maps_to_invalid_error() {
        let store = MemoryRefreshTokenStore::new();
        let err = store.verify_not_expired("no-such-token").await.unwrap_err();
        assert!(matches!(err, AuthorityError::InvalidRefreshToken));
    }

    #[tokio::test]
    async fn tokens_for_different_principals_are_independent() {
        let store = MemoryRefreshTokenStore::new();
        let a = store.issue("alice", Duration::days(7)).await.unwrap();
        let b = store.issue("bob", Duration::days(7)).await.unwrap();

        store.verify_not_expired(&a.token).await.unwrap();
        store.verify_not_expired(&b.token).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_issues_leave_one_live_token() {
        let store = std::sync::Arc::new(MemoryRefreshTokenStore::new());

        let mut handles = Vec::new();
        for _ in 0..16 {
            let store = store.clone();
            handles.push(tokio::spawn(async move {
                store.issue("p1", Duration::days(7)).await.unwrap()
            }));
        }
        let mut issued = Vec::new();
        for handle in handles {
            issued.push(handle.await.unwrap());
        }

        let live: Vec<_> = futures::future::join_all(
            issued.iter().map(|t| store.verify_not_expired(&t.token)),
        )
        .await
        .into_iter()
        .filter(|r| r.is_ok())
        .collect();

        assert_eq!(live.len(), 1);
    }
}

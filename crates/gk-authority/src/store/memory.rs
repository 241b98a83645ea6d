//! In-memory principal store for development and tests.

use std::sync::Mutex;

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::{AuthorityError, Result};
use crate::principal::Principal;
use crate::store::PrincipalStore;

pub struct MemoryPrincipalStore {
    by_id: DashMap<String, Principal>,
    // Serializes check-and-insert so uniqueness holds under concurrent
    // registrations; reads go straight to the map.
    write_guard: Mutex<()>,
}

impl MemoryPrincipalStore {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
            write_guard: Mutex::new(()),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for MemoryPrincipalStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl PrincipalStore for MemoryPrincipalStore {
    async fn insert(&self, principal: Principal) -> Result<Principal> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| AuthorityError::internal("principal store lock poisoned"))?;

        for entry in self.by_id.iter() {
            if entry.username == principal.username {
                return Err(AuthorityError::DuplicateUsername {
                    username: principal.username,
                });
            }
            if entry.email == principal.email {
                return Err(AuthorityError::DuplicateEmail {
                    email: principal.email,
                });
            }
        }

        self.by_id.insert(principal.id.clone(), principal.clone());
        Ok(principal)
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>> {
        Ok(self.by_id.get(id).map(|e| e.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>> {
        Ok(self
            .by_id
            .iter()
            .find(|e| e.username == username)
            .map(|e| e.value().clone()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>> {
        Ok(self
            .by_id
            .iter()
            .find(|e| e.email == email)
            .map(|e| e.value().clone()))
    }

    async fn update(&self, principal: Principal) -> Result<Principal> {
        let _guard = self
            .write_guard
            .lock()
            .map_err(|_| AuthorityError::internal("principal store lock poisoned"))?;

        if !self.by_id.contains_key(&principal.id) {
            return Err(AuthorityError::PrincipalNotFound {
                id: principal.id.clone(),
            });
        }
        self.by_id.insert(principal.id.clone(), principal.clone());
        Ok(principal)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(username: &str, email: &str) -> Principal {
        Principal::new(username, email, "$argon2id$fake")
    }

    #[tokio::test]
    async fn insert_and_lookups() {
        let store = MemoryPrincipalStore::new();
        let saved = store
            .insert(principal("alice", "alice@example.com"))
            .await
            .unwrap();

        assert!(store.find_by_id(&saved.id).await.unwrap().is_some());
        assert!(store.find_by_username("alice").await.unwrap().is_some());
        assert!(store
            .find_by_email("alice@example.com")
            .await
            .unwrap()
            .is_some());
        assert!(store.find_by_username("bob").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn duplicate_username_is_rejected() {
        let store = MemoryPrincipalStore::new();
        store
            .insert(principal("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = store
            .insert(principal("alice", "other@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorityError::DuplicateUsername { .. }));
        assert_eq!(store.len(), 1);
    }

    #[tokio::test]
    async fn duplicate_email_is_rejected() {
        let store = MemoryPrincipalStore::new();
        store
            .insert(principal("alice", "alice@example.com"))
            .await
            .unwrap();

        let err = store
            .insert(principal("bob", "alice@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorityError::DuplicateEmail { .. }));
    }

    #[tokio::test]
    async fn update_requires_existing_id() {
        let store = MemoryPrincipalStore::new();
        let err = store
            .update(principal("ghost", "ghost@example.com"))
            .await
            .unwrap_err();
        assert!(matches!(err, AuthorityError::PrincipalNotFound { .. }));
    }

    #[tokio::test]
    async fn update_replaces_in_place() {
        let store = MemoryPrincipalStore::new();
        let mut saved = store
            .insert(principal("alice", "alice@example.com"))
            .await
            .unwrap();

        saved.disable();
        store.update(saved.clone()).await.unwrap();

        let found = store.find_by_id(&saved.id).await.unwrap().unwrap();
        assert!(!found.enabled);
        assert_eq!(store.len(), 1);
    }
}

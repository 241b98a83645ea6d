//! In-memory replica store for development and tests.

use async_trait::async_trait;
use dashmap::DashMap;

use crate::error::Result;
use crate::profile::ProfileReplica;
use crate::store::ReplicaStore;

pub struct MemoryReplicaStore {
    by_id: DashMap<String, ProfileReplica>,
}

impl MemoryReplicaStore {
    pub fn new() -> Self {
        Self {
            by_id: DashMap::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.by_id.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_id.is_empty()
    }
}

impl Default for MemoryReplicaStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ReplicaStore for MemoryReplicaStore {
    async fn upsert(&self, profile: ProfileReplica) -> Result<()> {
        self.by_id.insert(profile.id.clone(), profile);
        Ok(())
    }

    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileReplica>> {
        Ok(self.by_id.get(id).map(|e| e.value().clone()))
    }

    async fn find_by_username(&self, username: &str) -> Result<Option<ProfileReplica>> {
        Ok(self
            .by_id
            .iter()
            .find(|e| e.username.as_deref() == Some(username))
            .map(|e| e.value().clone()))
    }

    async fn list(&self) -> Result<Vec<ProfileReplica>> {
        Ok(self.by_id.iter().map(|e| e.value().clone()).collect())
    }

    async fn delete(&self, id: &str) -> Result<bool> {
        Ok(self.by_id.remove(id).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_common::{IdentityEvent, IdentityEventType};

    fn profile(id: &str, username: &str) -> ProfileReplica {
        let mut event = IdentityEvent::bare(id, IdentityEventType::Created);
        event.username = Some(username.to_string());
        ProfileReplica::from_event(&event)
    }

    #[tokio::test]
    async fn upsert_replaces_by_id() {
        let store = MemoryReplicaStore::new();
        store.upsert(profile("1", "alice")).await.unwrap();
        store.upsert(profile("1", "alice2")).await.unwrap();

        assert_eq!(store.len(), 1);
        let found = store.find_by_id("1").await.unwrap().unwrap();
        assert_eq!(found.username.as_deref(), Some("alice2"));
    }

    #[tokio::test]
    async fn username_lookup_and_delete() {
        let store = MemoryReplicaStore::new();
        store.upsert(profile("1", "alice")).await.unwrap();

        assert!(store.find_by_username("alice").await.unwrap().is_some());
        assert!(store.find_by_username("bob").await.unwrap().is_none());

        assert!(store.delete("1").await.unwrap());
        assert!(!store.delete("1").await.unwrap());
    }
}

//! Replica Storage
//!
//! The replica's local profile store. Writes come exclusively from the
//! event consumer; the API only reads.

use async_trait::async_trait;

use crate::error::Result;
use crate::profile::ProfileReplica;

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::MemoryReplicaStore;

#[async_trait]
pub trait ReplicaStore: Send + Sync {
    /// Insert or replace a profile by id. Idempotent: replaying the same
    /// event sequence converges to the same record.
    async fn upsert(&self, profile: ProfileReplica) -> Result<()>;

    async fn find_by_id(&self, id: &str) -> Result<Option<ProfileReplica>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<ProfileReplica>>;

    /// All profiles, unordered. Admin-only surface.
    async fn list(&self) -> Result<Vec<ProfileReplica>>;

    /// Delete by id, reporting whether a record existed.
    async fn delete(&self, id: &str) -> Result<bool>;
}

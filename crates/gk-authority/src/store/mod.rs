//! Principal Storage
//!
//! Storage abstraction for principals. The in-memory backend is always
//! available and backs tests and dev mode; the MongoDB backend is behind
//! the `mongodb` feature.

use async_trait::async_trait;

use crate::error::Result;
use crate::principal::Principal;

pub mod memory;

#[cfg(feature = "mongodb")]
pub mod mongo;

pub use memory::MemoryPrincipalStore;

/// Persistent store of principals.
///
/// `insert` enforces username and email uniqueness; it is the only place
/// uniqueness is checked, so backends must make check-and-insert atomic.
#[async_trait]
pub trait PrincipalStore: Send + Sync {
    /// Insert a new principal. Fails with `DuplicateUsername` or
    /// `DuplicateEmail` if either unique field is taken.
    async fn insert(&self, principal: Principal) -> Result<Principal>;

    async fn find_by_id(&self, id: &str) -> Result<Option<Principal>>;

    async fn find_by_username(&self, username: &str) -> Result<Option<Principal>>;

    async fn find_by_email(&self, email: &str) -> Result<Option<Principal>>;

    /// Replace an existing principal by id. Missing ids are an error, not
    /// an upsert; creation only ever happens through `insert`.
    ///
    /// There is no delete: account deletion disables the principal, and
    /// only replica stores ever drop a record.
    async fn update(&self, principal: Principal) -> Result<Principal>;
}

//! Gatekit Replica
//!
//! Maintains a local, eventually consistent copy of user profiles by
//! consuming identity events, and serves them over a read-only API guarded
//! by the gateway's trusted headers. Never talks to the authority directly;
//! the event stream is its only write path.

pub mod api;
pub mod consumer;
pub mod error;
pub mod profile;
pub mod store;

pub use consumer::ReplicaConsumer;
pub use error::{ReplicaError, Result};
pub use profile::ProfileReplica;
pub use store::{MemoryReplicaStore, ReplicaStore};

#[cfg(feature = "mongodb")]
pub use store::mongo::MongoReplicaStore;

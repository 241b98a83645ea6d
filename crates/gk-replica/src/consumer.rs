//! Replication Consumer
//!
//! Applies identity events to the local profile store. One instance serves
//! every partition worker; all operations are idempotent so redelivery and
//! replays are harmless.

use std::sync::Arc;

use async_trait::async_trait;
use gk_bus::{Envelope, EventHandler, ProcessOutcome};
use gk_common::{IdentityEvent, IdentityEventType};
use tracing::{debug, info};

use crate::profile::ProfileReplica;
use crate::store::ReplicaStore;

pub struct ReplicaConsumer {
    store: Arc<dyn ReplicaStore>,
}

impl ReplicaConsumer {
    pub fn new(store: Arc<dyn ReplicaStore>) -> Self {
        Self { store }
    }

    /// Apply a single event. CREATED and UPDATED both upsert: an UPDATED
    /// for an unknown user seeds the record from whatever fields it
    /// carries, which makes the consumer tolerant of lost or reordered
    /// CREATEDs.
    pub async fn apply_event(&self, event: &IdentityEvent) -> ProcessOutcome {
        match event.event_type {
            IdentityEventType::Created | IdentityEventType::Updated => {
                let profile = match self.store.find_by_id(&event.user_id).await {
                    Ok(Some(mut existing)) => {
                        existing.merge_from(event);
                        existing
                    }
                    Ok(None) => ProfileReplica::from_event(event),
                    Err(e) => return ProcessOutcome::Failed(format!("lookup failed: {e}")),
                };

                match self.store.upsert(profile).await {
                    Ok(()) => {
                        debug!(user_id = %event.user_id, event_type = ?event.event_type, "profile upserted");
                        ProcessOutcome::Processed
                    }
                    Err(e) => ProcessOutcome::Failed(format!("upsert failed: {e}")),
                }
            }
            IdentityEventType::Deleted => match self.store.delete(&event.user_id).await {
                Ok(true) => {
                    info!(user_id = %event.user_id, "profile deleted");
                    ProcessOutcome::Processed
                }
                Ok(false) => {
                    ProcessOutcome::Skipped(format!("no profile for user {}", event.user_id))
                }
                Err(e) => ProcessOutcome::Failed(format!("delete failed: {e}")),
            },
        }
    }
}

#[async_trait]
impl EventHandler for ReplicaConsumer {
    async fn handle(&self, envelope: Envelope) -> ProcessOutcome {
        let event: IdentityEvent = match serde_json::from_str(&envelope.payload) {
            Ok(event) => event,
            Err(e) => return ProcessOutcome::Failed(format!("undecodable payload: {e}")),
        };
        self.apply_event(&event).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryReplicaStore;

    fn consumer() -> (ReplicaConsumer, Arc<MemoryReplicaStore>) {
        let store = Arc::new(MemoryReplicaStore::new());
        (ReplicaConsumer::new(store.clone()), store)
    }

    fn created(user_id: &str, username: &str) -> IdentityEvent {
        let mut event = IdentityEvent::bare(user_id, IdentityEventType::Created);
        event.username = Some(username.to_string());
        event.email = Some(format!("{username}@example.com"));
        event
    }

    #[tokio::test]
    async fn created_then_updated_then_deleted() {
        let (consumer, store) = consumer();

        let outcome = consumer.apply_event(&created("42", "alice")).await;
        assert_eq!(outcome, ProcessOutcome::Processed);

        let mut update = IdentityEvent::bare("42", IdentityEventType::Updated);
        update.city = Some("Lisbon".to_string());
        assert_eq!(consumer.apply_event(&update).await, ProcessOutcome::Processed);

        let profile = store.find_by_id("42").await.unwrap().unwrap();
        assert_eq!(profile.username.as_deref(), Some("alice"));
        assert_eq!(profile.city.as_deref(), Some("Lisbon"));

        let outcome = consumer.apply_event(&IdentityEvent::deleted("42")).await;
        assert_eq!(outcome, ProcessOutcome::Processed);
        assert!(store.find_by_id("42").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn delete_of_absent_user_is_skipped_not_failed() {
        let (consumer, _) = consumer();
        let outcome = consumer.apply_event(&IdentityEvent::deleted("ghost")).await;
        assert!(matches!(outcome, ProcessOutcome::Skipped(_)));
    }

    #[tokio::test]
    async fn updated_for_unknown_user_seeds_the_record() {
        let (consumer, store) = consumer();

        let mut update = IdentityEvent::bare("42", IdentityEventType::Updated);
        update.username = Some("alice".to_string());
        assert_eq!(consumer.apply_event(&update).await, ProcessOutcome::Processed);

        let profile = store.find_by_id("42").await.unwrap().unwrap();
        assert_eq!(profile.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn replaying_the_same_event_is_idempotent() {
        let (consumer, store) = consumer();
        let event = created("42", "alice");

        consumer.apply_event(&event).await;
        consumer.apply_event(&event).await;

        assert_eq!(store.len(), 1);
        let profile = store.find_by_id("42").await.unwrap().unwrap();
        assert_eq!(profile.username.as_deref(), Some("alice"));
    }

    #[tokio::test]
    async fn replay_refreshes_synced_at() {
        let (consumer, store) = consumer();
        let event = created("42", "alice");

        consumer.apply_event(&event).await;
        let first = store.find_by_id("42").await.unwrap().unwrap();

        tokio::time::sleep(std::time::Duration::from_millis(5)).await;
        consumer.apply_event(&event).await;
        let second = store.find_by_id("42").await.unwrap().unwrap();

        // updated_at tracks the producer clock and stays put on a replay;
        // synced_at records the local write and moves forward.
        assert_eq!(second.updated_at, first.updated_at);
        assert!(second.synced_at > first.synced_at);
    }

    #[tokio::test]
    async fn garbage_payload_fails_without_panicking() {
        let (consumer, _) = consumer();
        let outcome = consumer
            .handle(Envelope::new("42", "not json at all"))
            .await;
        assert!(matches!(outcome, ProcessOutcome::Failed(_)));
    }
}

//! In-process partitioned event bus.
//!
//! Mimics a keyed, partitioned log for local development and tests: a fixed
//! set of unbounded channels, one per partition, with `hash(key) % N`
//! assignment. Broker-backed transports implement the same traits.

use async_trait::async_trait;
use gk_common::IdentityEvent;
use std::collections::hash_map::DefaultHasher;
use std::hash::{Hash, Hasher};
use std::sync::Mutex;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::{
    Envelope, EventHandler, EventPublisher, FailurePolicy, ProcessOutcome, PublishOutcome,
};

/// One partition's receiving end, handed to exactly one worker.
pub struct PartitionFeed {
    pub partition: usize,
    pub receiver: mpsc::UnboundedReceiver<Envelope>,
}

/// In-memory partitioned bus.
pub struct MemoryBus {
    senders: Vec<mpsc::UnboundedSender<Envelope>>,
    feeds: Mutex<Option<Vec<PartitionFeed>>>,
}

impl MemoryBus {
    pub fn new(partitions: usize) -> Self {
        assert!(partitions > 0, "bus requires at least one partition");

        let mut senders = Vec::with_capacity(partitions);
        let mut feeds = Vec::with_capacity(partitions);
        for partition in 0..partitions {
            let (tx, rx) = mpsc::unbounded_channel();
            senders.push(tx);
            feeds.push(PartitionFeed {
                partition,
                receiver: rx,
            });
        }

        Self {
            senders,
            feeds: Mutex::new(Some(feeds)),
        }
    }

    pub fn partition_count(&self) -> usize {
        self.senders.len()
    }

    /// Stable partition assignment for a key.
    pub fn partition_for(&self, key: &str) -> usize {
        let mut hasher = DefaultHasher::new();
        key.hash(&mut hasher);
        (hasher.finish() as usize) % self.senders.len()
    }

    /// Take the partition feeds. A bus supports a single subscriber group;
    /// subsequent calls return `None`.
    pub fn take_feeds(&self) -> Option<Vec<PartitionFeed>> {
        self.feeds.lock().expect("feed lock poisoned").take()
    }

    /// Spawn one long-lived worker per partition. Each worker pulls
    /// envelopes in order, invokes the handler, and applies the failure
    /// policy to the outcome. Workers exit when the bus is dropped.
    pub fn spawn_workers(
        &self,
        handler: std::sync::Arc<dyn EventHandler>,
        policy: FailurePolicy,
    ) -> Vec<JoinHandle<()>> {
        let feeds = self
            .take_feeds()
            .expect("bus feeds already taken by another subscriber");

        feeds
            .into_iter()
            .map(|mut feed| {
                let handler = handler.clone();
                tokio::spawn(async move {
                    info!(partition = feed.partition, "replication worker started");
                    while let Some(envelope) = feed.receiver.recv().await {
                        let key = envelope.key.clone();
                        match handler.handle(envelope).await {
                            ProcessOutcome::Processed => {
                                debug!(partition = feed.partition, key, "event processed");
                            }
                            ProcessOutcome::Skipped(reason) => {
                                info!(partition = feed.partition, key, reason, "event skipped");
                            }
                            ProcessOutcome::Failed(error) => match policy {
                                FailurePolicy::LogAndDrop => {
                                    warn!(
                                        partition = feed.partition,
                                        key, error, "event dropped after failure"
                                    );
                                }
                            },
                        }
                    }
                    info!(partition = feed.partition, "replication worker stopped");
                })
            })
            .collect()
    }
}

#[async_trait]
impl EventPublisher for MemoryBus {
    async fn publish(&self, event: &IdentityEvent) -> PublishOutcome {
        let payload = match serde_json::to_string(event) {
            Ok(payload) => payload,
            Err(e) => {
                return PublishOutcome::Failed {
                    reason: format!("serialization: {e}"),
                }
            }
        };

        let partition = self.partition_for(event.key());
        let envelope = Envelope::new(event.key(), payload);

        match self.senders[partition].send(envelope) {
            Ok(()) => PublishOutcome::Delivered { partition },
            Err(_) => PublishOutcome::Failed {
                reason: "partition channel closed".to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use gk_common::{IdentityEvent, IdentityEventType};
    use std::sync::Arc;

    fn created_event(user_id: &str, username: &str) -> IdentityEvent {
        let mut event = IdentityEvent::bare(user_id, IdentityEventType::Created);
        event.username = Some(username.to_string());
        event
    }

    #[test]
    fn same_key_maps_to_same_partition() {
        let bus = MemoryBus::new(4);
        let p1 = bus.partition_for("user-42");
        let p2 = bus.partition_for("user-42");
        assert_eq!(p1, p2);
        assert!(p1 < 4);
    }

    #[tokio::test]
    async fn publish_preserves_per_key_order() {
        let bus = MemoryBus::new(2);
        for i in 0..5 {
            let outcome = bus.publish(&created_event("alice", &format!("v{i}"))).await;
            assert!(outcome.is_delivered());
        }

        let mut feeds = bus.take_feeds().unwrap();
        let partition = bus.partition_for("alice");
        let feed = &mut feeds[partition];

        let mut seen = Vec::new();
        while let Ok(envelope) = feed.receiver.try_recv() {
            let event: IdentityEvent = serde_json::from_str(&envelope.payload).unwrap();
            seen.push(event.username.unwrap());
        }
        assert_eq!(seen, vec!["v0", "v1", "v2", "v3", "v4"]);
    }

    struct Recorder {
        outcomes: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl EventHandler for Recorder {
        async fn handle(&self, envelope: Envelope) -> ProcessOutcome {
            self.outcomes
                .lock()
                .unwrap()
                .push(envelope.key.clone());
            if envelope.key == "poison" {
                ProcessOutcome::Failed("bad payload".to_string())
            } else {
                ProcessOutcome::Processed
            }
        }
    }

    #[tokio::test]
    async fn worker_survives_handler_failure() {
        let bus = MemoryBus::new(1);
        let recorder = Arc::new(Recorder {
            outcomes: Mutex::new(Vec::new()),
        });
        let _workers = bus.spawn_workers(recorder.clone(), FailurePolicy::LogAndDrop);

        bus.publish(&created_event("poison", "x")).await.log("test");
        bus.publish(&created_event("ok", "y")).await.log("test");

        // Give the single worker a chance to drain both
        tokio::time::sleep(std::time::Duration::from_millis(50)).await;

        let seen = recorder.outcomes.lock().unwrap().clone();
        assert_eq!(seen, vec!["poison", "ok"]);
    }

    #[tokio::test]
    async fn feeds_can_only_be_taken_once() {
        let bus = MemoryBus::new(2);
        assert!(bus.take_feeds().is_some());
        assert!(bus.take_feeds().is_none());
    }
}

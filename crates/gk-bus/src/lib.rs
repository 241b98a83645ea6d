//! Event transport for identity replication.
//!
//! The authority publishes `IdentityEvent`s keyed by user id; replica
//! consumers pull them from partitioned feeds, one worker per partition.
//! Same-key events always land on the same partition, so per-key order is
//! preserved end to end. Delivery is at-least-once from the consumer's point
//! of view; handlers must be idempotent.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use gk_common::IdentityEvent;

pub mod memory;

pub use memory::{MemoryBus, PartitionFeed};

/// A serialized event in flight between producer and consumer.
#[derive(Debug, Clone)]
pub struct Envelope {
    /// Ordering key (the subject's user id as text)
    pub key: String,
    /// Self-describing JSON payload
    pub payload: String,
    pub published_at: DateTime<Utc>,
}

impl Envelope {
    pub fn new(key: impl Into<String>, payload: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            payload: payload.into(),
            published_at: Utc::now(),
        }
    }
}

/// Outcome of a publish attempt.
///
/// Returned to the caller instead of firing a completion callback: the
/// triggering request decides whether to log, queue, or ignore the result.
/// Publish failure is never fatal to the request that produced the event.
#[must_use = "publish failures must be handled or logged explicitly"]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PublishOutcome {
    /// The event was accepted by the transport.
    Delivered { partition: usize },
    /// The event was not accepted; the reason is for the caller's log.
    Failed { reason: String },
}

impl PublishOutcome {
    pub fn is_delivered(&self) -> bool {
        matches!(self, PublishOutcome::Delivered { .. })
    }

    /// Log the outcome at the producer's call site and move on. The standard
    /// treatment for best-effort replication: failure never propagates.
    pub fn log(self, context: &str) {
        match &self {
            PublishOutcome::Delivered { partition } => {
                tracing::debug!(context, partition, "identity event published");
            }
            PublishOutcome::Failed { reason } => {
                tracing::error!(context, reason, "identity event publish failed");
            }
        }
    }
}

/// Outcome of processing a single consumed event.
///
/// The consumer reports what happened per message; the worker's
/// `FailurePolicy` decides what to do about it. Nothing is silently
/// swallowed inside the handler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProcessOutcome {
    Processed,
    Skipped(String),
    Failed(String),
}

/// What the worker does with a `ProcessOutcome::Failed`.
///
/// Only log-and-drop is implemented: an accepted availability-over-
/// consistency choice with a known risk of silent data loss. A retry queue
/// would slot in as a second variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailurePolicy {
    LogAndDrop,
}

/// Producer side of the pipeline.
#[async_trait]
pub trait EventPublisher: Send + Sync {
    /// Publish an event keyed by its user id. Never blocks the caller on
    /// downstream processing.
    async fn publish(&self, event: &IdentityEvent) -> PublishOutcome;
}

/// Consumer-side event handler, invoked once per message by a partition
/// worker. Must be idempotent under redelivery.
#[async_trait]
pub trait EventHandler: Send + Sync {
    async fn handle(&self, envelope: Envelope) -> ProcessOutcome;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn publish_outcome_reports_delivery() {
        assert!(PublishOutcome::Delivered { partition: 0 }.is_delivered());
        assert!(!PublishOutcome::Failed {
            reason: "closed".to_string()
        }
        .is_delivered());
    }
}

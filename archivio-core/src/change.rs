//! Change notifications published by masters.
//!
//! Every mutating master operation publishes a [`ChangeEvent`] *before* the
//! call returns, and bumps a generation stamp at the same time. Decorators
//! that cache derived state compare the generation on every read, so an
//! invalidation is visible to any call that starts after the mutating call
//! returned. The broadcast stream exists for external subscribers; a full
//! channel only drops events for lagging receivers, never for the
//! generation stamp.

use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use tokio::sync::broadcast;

use crate::ident::ObjectId;

const CHANNEL_CAPACITY: usize = 1024;

/// The kind of change that occurred.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChangeKind {
    /// A new record was added.
    Added,
    /// A record or its data points changed.
    Changed,
    /// A record was removed.
    Removed,
}

/// A single change to a master's contents.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChangeEvent {
    /// What happened.
    pub kind: ChangeKind,
    /// The affected record.
    pub object_id: ObjectId,
    /// Version instant before the change, when versioned.
    pub version_from: Option<DateTime<Utc>>,
    /// Version instant after the change, when versioned.
    pub version_to: Option<DateTime<Utc>>,
    /// When the change was observed.
    pub observed_at: DateTime<Utc>,
}

impl ChangeEvent {
    /// Build an event observed now.
    #[must_use]
    pub fn now(kind: ChangeKind, object_id: ObjectId) -> Self {
        Self {
            kind,
            object_id,
            version_from: None,
            version_to: None,
            observed_at: Utc::now(),
        }
    }
}

/// Publish/subscribe hub for a master's change events.
#[derive(Debug)]
pub struct ChangeManager {
    tx: broadcast::Sender<ChangeEvent>,
    generation: AtomicU64,
}

impl ChangeManager {
    /// Create an empty manager.
    #[must_use]
    pub fn new() -> Self {
        let (tx, _rx) = broadcast::channel(CHANNEL_CAPACITY);
        Self {
            tx,
            generation: AtomicU64::new(0),
        }
    }

    /// Publish an event. The generation stamp is bumped before the event is
    /// offered to subscribers, so generation observers never run ahead of
    /// the stream.
    pub fn publish(&self, event: ChangeEvent) {
        self.generation.fetch_add(1, Ordering::Release);
        // No receivers is fine; the generation stamp alone carries the
        // invalidation signal for decorators.
        let _ = self.tx.send(event);
    }

    /// Subscribe to the event stream.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<ChangeEvent> {
        self.tx.subscribe()
    }

    /// Monotonic count of events published so far.
    #[must_use]
    pub fn generation(&self) -> u64 {
        self.generation.load(Ordering::Acquire)
    }
}

impl Default for ChangeManager {
    fn default() -> Self {
        Self::new()
    }
}

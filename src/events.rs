// SPDX-License-Identifier: MIT
//! Typed change notifications published by the tracker.

use serde::Serialize;
use tokio::sync::broadcast;

/// A change observed in the watched repository.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "event", rename_all = "camelCase")]
pub enum RepoEvent {
    /// The checked-out branch changed. `name` is empty on detached HEAD
    /// or when the branch could not be resolved.
    #[serde(rename_all = "camelCase")]
    BranchChanged { name: String },
    /// The set of non-clean paths changed since the previous
    /// recomputation. Emitted at most once per cycle; query the tracker
    /// for the new snapshot.
    StatusChanged,
}

/// Fan-out channel for [`RepoEvent`]s.
#[derive(Clone)]
pub struct EventBroadcaster {
    tx: broadcast::Sender<RepoEvent>,
}

impl Default for EventBroadcaster {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBroadcaster {
    pub fn new() -> Self {
        let (tx, _) = broadcast::channel(256);
        Self { tx }
    }

    /// Publish an event to all subscribers.
    pub fn emit(&self, event: RepoEvent) {
        // Ignore errors — no subscribers is fine
        let _ = self.tx.send(event);
    }

    /// Subscribe to all events from this point on.
    pub fn subscribe(&self) -> broadcast::Receiver<RepoEvent> {
        self.tx.subscribe()
    }
}

//! Remote collection contract
//!
//! The task list lives in a named remote collection of records addressable
//! by generated key. This module defines the contract the rest of the crate
//! consumes: a one-shot snapshot read, per-event-kind live subscriptions,
//! and the three write operations. The handle is passed in explicitly at
//! construction; there is no process-wide singleton.
//!
//! Implementations: [`WsCollection`] (WebSocket client for the collection
//! server) and [`MemoryCollection`] (in-process, for tests and offline use).

mod client;
mod memory;
mod message;

pub use client::WsCollection;
pub use memory::MemoryCollection;
pub use message::{ClientMessage, ServerMessage, SnapshotEntry};

use std::fmt;
use std::future::Future;

use serde::{Deserialize, Serialize};
use tokio::sync::mpsc;

use crate::error::RemoteResult;
use crate::models::TaskPayload;

/// The three remote change notifications a collection delivers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EventKind {
    Added,
    Changed,
    Removed,
}

/// A single change delivered on a live subscription
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeEvent {
    /// A record appeared under a new key
    Added { key: String, payload: TaskPayload },
    /// An existing record was rewritten
    Changed { key: String, payload: TaskPayload },
    /// A record was deleted
    Removed { key: String },
}

impl ChangeEvent {
    pub fn kind(&self) -> EventKind {
        match self {
            ChangeEvent::Added { .. } => EventKind::Added,
            ChangeEvent::Changed { .. } => EventKind::Changed,
            ChangeEvent::Removed { .. } => EventKind::Removed,
        }
    }

    pub fn key(&self) -> &str {
        match self {
            ChangeEvent::Added { key, .. }
            | ChangeEvent::Changed { key, .. }
            | ChangeEvent::Removed { key } => key,
        }
    }
}

/// A live subscription to one event kind
///
/// Owns its own cancellation: dropping the subscription unsubscribes, so no
/// handler can run against a view that is already gone. The event sequence
/// is lazy, conceptually infinite, and not restartable.
pub struct Subscription {
    kind: EventKind,
    rx: mpsc::UnboundedReceiver<ChangeEvent>,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub(crate) fn new(
        kind: EventKind,
        rx: mpsc::UnboundedReceiver<ChangeEvent>,
        cancel: impl FnOnce() + Send + 'static,
    ) -> Self {
        Self {
            kind,
            rx,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Which event kind this subscription delivers
    pub fn kind(&self) -> EventKind {
        self.kind
    }

    /// Receive the next event. Returns `None` once the feed has closed.
    pub async fn recv(&mut self) -> Option<ChangeEvent> {
        self.rx.recv().await
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("kind", &self.kind)
            .finish_non_exhaustive()
    }
}

/// A named remote collection of task records
///
/// All write operations resolve asynchronously; a failed write leaves the
/// collection untouched. Consistency across clients is the store's problem,
/// not this trait's.
pub trait RemoteCollection: Send + Sync {
    /// One-shot full read of the collection, as key/payload pairs
    fn snapshot(&self)
        -> impl Future<Output = RemoteResult<Vec<(String, TaskPayload)>>> + Send;

    /// Subscribe to one event kind; events flow until the subscription drops
    fn subscribe(
        &self,
        kind: EventKind,
    ) -> impl Future<Output = RemoteResult<Subscription>> + Send;

    /// Create a record with a server-generated key; returns the key
    fn create(&self, payload: TaskPayload) -> impl Future<Output = RemoteResult<String>> + Send;

    /// Partial update: set the completed flag on one record
    fn set_completed(
        &self,
        key: &str,
        completed: bool,
    ) -> impl Future<Output = RemoteResult<()>> + Send;

    /// Delete one record by key
    fn remove(&self, key: &str) -> impl Future<Output = RemoteResult<()>> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_change_event_kind() {
        let added = ChangeEvent::Added {
            key: "k-1".to_string(),
            payload: TaskPayload::new("Buy milk"),
        };
        let removed = ChangeEvent::Removed {
            key: "k-1".to_string(),
        };
        assert_eq!(added.kind(), EventKind::Added);
        assert_eq!(removed.kind(), EventKind::Removed);
        assert_eq!(added.key(), "k-1");
    }

    #[tokio::test]
    async fn test_subscription_cancels_on_drop() {
        use std::sync::atomic::{AtomicBool, Ordering};
        use std::sync::Arc;

        let cancelled = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&cancelled);

        let (_tx, rx) = mpsc::unbounded_channel();
        let sub = Subscription::new(EventKind::Added, rx, move || {
            flag.store(true, Ordering::SeqCst);
        });

        assert!(!cancelled.load(Ordering::SeqCst));
        drop(sub);
        assert!(cancelled.load(Ordering::SeqCst));
    }

    #[tokio::test]
    async fn test_subscription_recv_ends_when_feed_closes() {
        let (tx, rx) = mpsc::unbounded_channel();
        let mut sub = Subscription::new(EventKind::Removed, rx, || {});

        tx.send(ChangeEvent::Removed {
            key: "k-9".to_string(),
        })
        .unwrap();
        drop(tx);

        assert!(sub.recv().await.is_some());
        assert!(sub.recv().await.is_none());
    }
}

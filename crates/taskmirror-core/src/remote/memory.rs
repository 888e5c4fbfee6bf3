//! In-process collection
//!
//! `MemoryCollection` implements the full collection contract against a
//! local map: generated keys, keyed writes, and live event fan-out. It backs
//! the test suites and `--memory` runs; nothing is persisted.

use std::sync::{Arc, Mutex, MutexGuard};

use tokio::sync::mpsc;
use uuid::Uuid;

use super::{ChangeEvent, EventKind, RemoteCollection, Subscription};
use crate::error::{RemoteError, RemoteResult};
use crate::models::TaskPayload;

struct Subscriber {
    id: u64,
    kind: EventKind,
    tx: mpsc::UnboundedSender<ChangeEvent>,
}

#[derive(Default)]
struct Inner {
    /// Insertion-ordered records; the snapshot preserves this order
    entries: Vec<(String, TaskPayload)>,
    subscribers: Vec<Subscriber>,
    next_subscription: u64,
    /// Total mutations applied (create/update/remove)
    writes: u64,
}

impl Inner {
    fn broadcast(&mut self, event: ChangeEvent) {
        let kind = event.kind();
        self.subscribers
            .retain(|sub| sub.kind != kind || sub.tx.send(event.clone()).is_ok());
    }
}

/// A collection held entirely in process memory
#[derive(Clone, Default)]
pub struct MemoryCollection {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Seed the collection with existing records (keys supplied by the test)
    pub fn with_entries(entries: Vec<(String, TaskPayload)>) -> Self {
        let collection = Self::new();
        collection.lock().entries = entries;
        collection
    }

    /// Number of mutations applied so far; lets tests assert that a
    /// refused command really issued no write
    pub fn write_count(&self) -> u64 {
        self.lock().writes
    }

    /// Number of records currently stored
    pub fn len(&self) -> usize {
        self.lock().entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock().entries.is_empty()
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        // Recover the data on poisoning; no invariant spans the panic point
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl RemoteCollection for MemoryCollection {
    async fn snapshot(&self) -> RemoteResult<Vec<(String, TaskPayload)>> {
        Ok(self.lock().entries.clone())
    }

    async fn subscribe(&self, kind: EventKind) -> RemoteResult<Subscription> {
        let (tx, rx) = mpsc::unbounded_channel();

        let id = {
            let mut inner = self.lock();
            let id = inner.next_subscription;
            inner.next_subscription += 1;
            inner.subscribers.push(Subscriber { id, kind, tx });
            id
        };

        let handle = Arc::clone(&self.inner);
        Ok(Subscription::new(kind, rx, move || {
            let mut inner = handle.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            inner.subscribers.retain(|sub| sub.id != id);
        }))
    }

    async fn create(&self, payload: TaskPayload) -> RemoteResult<String> {
        let key = format!("task-{}", &Uuid::new_v4().to_string()[..8]);

        let mut inner = self.lock();
        inner.entries.push((key.clone(), payload.clone()));
        inner.writes += 1;
        inner.broadcast(ChangeEvent::Added {
            key: key.clone(),
            payload,
        });

        Ok(key)
    }

    async fn set_completed(&self, key: &str, completed: bool) -> RemoteResult<()> {
        let mut inner = self.lock();

        let Some((_, payload)) = inner.entries.iter_mut().find(|(k, _)| k == key) else {
            return Err(RemoteError::Rejected {
                message: format!("no such key: {}", key),
            });
        };
        payload.completed = completed;
        let payload = payload.clone();

        inner.writes += 1;
        inner.broadcast(ChangeEvent::Changed {
            key: key.to_string(),
            payload,
        });

        Ok(())
    }

    async fn remove(&self, key: &str) -> RemoteResult<()> {
        let mut inner = self.lock();

        let before = inner.entries.len();
        inner.entries.retain(|(k, _)| k != key);
        if inner.entries.len() == before {
            // Removing an absent key succeeds and emits nothing
            return Ok(());
        }

        inner.writes += 1;
        inner.broadcast(ChangeEvent::Removed {
            key: key.to_string(),
        });

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_create_assigns_distinct_keys() {
        let collection = MemoryCollection::new();

        let first = collection.create(TaskPayload::new("one")).await.unwrap();
        let second = collection.create(TaskPayload::new("two")).await.unwrap();

        assert_ne!(first, second);
        assert_eq!(collection.len(), 2);
        assert_eq!(collection.write_count(), 2);
    }

    #[tokio::test]
    async fn test_snapshot_preserves_insertion_order() {
        let collection = MemoryCollection::new();
        collection.create(TaskPayload::new("one")).await.unwrap();
        collection.create(TaskPayload::new("two")).await.unwrap();

        let snapshot = collection.snapshot().await.unwrap();
        let texts: Vec<_> = snapshot.iter().map(|(_, p)| p.text.as_str()).collect();
        assert_eq!(texts, vec!["one", "two"]);
    }

    #[tokio::test]
    async fn test_subscriber_sees_matching_events_only() {
        let collection = MemoryCollection::new();
        let mut added = collection.subscribe(EventKind::Added).await.unwrap();
        let mut removed = collection.subscribe(EventKind::Removed).await.unwrap();

        let key = collection.create(TaskPayload::new("Buy milk")).await.unwrap();
        collection.remove(&key).await.unwrap();

        let event = added.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::Added);
        assert_eq!(event.key(), key);

        let event = removed.recv().await.unwrap();
        assert_eq!(event.kind(), EventKind::Removed);
        assert_eq!(event.key(), key);
    }

    #[tokio::test]
    async fn test_update_emits_changed_with_full_payload() {
        let collection = MemoryCollection::new();
        let key = collection.create(TaskPayload::new("Buy milk")).await.unwrap();

        let mut changed = collection.subscribe(EventKind::Changed).await.unwrap();
        collection.set_completed(&key, true).await.unwrap();

        match changed.recv().await.unwrap() {
            ChangeEvent::Changed { key: k, payload } => {
                assert_eq!(k, key);
                assert_eq!(payload.text, "Buy milk");
                assert!(payload.completed);
            }
            other => panic!("expected changed, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_update_unknown_key_is_rejected() {
        let collection = MemoryCollection::new();
        let err = collection.set_completed("missing", true).await.unwrap_err();
        assert!(matches!(err, RemoteError::Rejected { .. }));
        assert_eq!(collection.write_count(), 0);
    }

    #[tokio::test]
    async fn test_remove_absent_key_is_silent() {
        let collection = MemoryCollection::new();
        let mut removed = collection.subscribe(EventKind::Removed).await.unwrap();

        collection.remove("missing").await.unwrap();
        assert_eq!(collection.write_count(), 0);

        // Feed stays open and delivers nothing for the absent key
        let key = collection.create(TaskPayload::new("x")).await.unwrap();
        collection.remove(&key).await.unwrap();
        assert_eq!(removed.recv().await.unwrap().key(), key);
    }

    #[tokio::test]
    async fn test_dropped_subscription_stops_delivery() {
        let collection = MemoryCollection::new();

        let added = collection.subscribe(EventKind::Added).await.unwrap();
        drop(added);

        // Unsubscribed feed must not leave a dead subscriber behind
        collection.create(TaskPayload::new("after")).await.unwrap();
        assert!(collection.lock().subscribers.is_empty());
    }
}

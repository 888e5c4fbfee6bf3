//! Sync reconciler
//!
//! Mirrors the remote collection into a local ordered list, driven entirely
//! by the event subscriptions; the caller never refetches. [`Mirror`] holds
//! the list and the event-application rules; [`Reconciler`] adds the
//! snapshot-then-subscribe activation and merges the three live feeds.

use tracing::{debug, trace};

use crate::error::RemoteResult;
use crate::models::{Task, TaskPayload};
use crate::remote::{ChangeEvent, EventKind, RemoteCollection, Subscription};

/// The local mirrored list
///
/// Holds at most one record per key. List position is first-observation
/// order: append on create, in-place replace on update, no reorder on
/// toggle. There is no ordering guarantee beyond that; the list reflects
/// arrival order of events interleaved with the snapshot's order.
#[derive(Debug, Clone, Default)]
pub struct Mirror {
    tasks: Vec<Task>,
}

impl Mirror {
    pub fn new() -> Self {
        Self::default()
    }

    /// The mirrored records, in first-observation order
    pub fn tasks(&self) -> &[Task] {
        &self.tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }

    /// Look up one record by key
    pub fn get(&self, id: &str) -> Option<&Task> {
        self.tasks.iter().find(|task| task.id == id)
    }

    /// Replace local state with a full snapshot of the collection
    pub fn replace_all(&mut self, entries: Vec<(String, TaskPayload)>) {
        self.tasks = entries
            .into_iter()
            .map(|(key, payload)| Task::from_entry(key, payload))
            .collect();
    }

    /// Fold one remote change into the list
    ///
    /// - Addition: append; if the key is already present (the snapshot and
    ///   the live feed can both deliver a pre-existing record) the payload
    ///   replaces the existing record in place, keeping its position
    /// - Modification: wholesale in-place replace; silently dropped when
    ///   the key is unknown
    /// - Removal: drop every record with the key; idempotent
    pub fn apply(&mut self, event: ChangeEvent) {
        trace!(kind = ?event.kind(), key = event.key(), "applying remote change");
        match event {
            ChangeEvent::Added { key, payload } => {
                if let Some(existing) = self.tasks.iter_mut().find(|task| task.id == key) {
                    existing.text = payload.text;
                    existing.completed = payload.completed;
                } else {
                    self.tasks.push(Task::from_entry(key, payload));
                }
            }
            ChangeEvent::Changed { key, payload } => {
                match self.tasks.iter_mut().find(|task| task.id == key) {
                    Some(existing) => *existing = Task::from_entry(key, payload),
                    None => debug!(key, "change for unknown record dropped"),
                }
            }
            ChangeEvent::Removed { key } => {
                self.tasks.retain(|task| task.id != key);
            }
        }
    }
}

/// Live mirror of a remote collection
///
/// Activation opens the three live feeds, then replaces local state with a
/// full snapshot; overlap between the two is reconciled by [`Mirror`]'s
/// key de-duplication. Dropping the reconciler cancels all three
/// subscriptions, so no event handler outlives the consuming view.
pub struct Reconciler {
    mirror: Mirror,
    added: Subscription,
    changed: Subscription,
    removed: Subscription,
}

impl Reconciler {
    /// Snapshot the collection and open the three live feeds
    pub async fn attach<C: RemoteCollection>(remote: &C) -> RemoteResult<Self> {
        let added = remote.subscribe(EventKind::Added).await?;
        let changed = remote.subscribe(EventKind::Changed).await?;
        let removed = remote.subscribe(EventKind::Removed).await?;

        let mut mirror = Mirror::new();
        mirror.replace_all(remote.snapshot().await?);
        debug!(count = mirror.len(), "reconciler attached");

        Ok(Self {
            mirror,
            added,
            changed,
            removed,
        })
    }

    /// The mirrored records, in first-observation order
    pub fn tasks(&self) -> &[Task] {
        self.mirror.tasks()
    }

    pub fn mirror(&self) -> &Mirror {
        &self.mirror
    }

    /// Wait for the next change on any of the three feeds
    ///
    /// Returns `None` only once every feed has closed (the connection to
    /// the store is gone).
    pub async fn next_change(&mut self) -> Option<ChangeEvent> {
        tokio::select! {
            Some(event) = self.added.recv() => Some(event),
            Some(event) = self.changed.recv() => Some(event),
            Some(event) = self.removed.recv() => Some(event),
            else => None,
        }
    }

    /// Fold one remote change into the mirror
    pub fn apply(&mut self, event: ChangeEvent) {
        self.mirror.apply(event);
    }
}

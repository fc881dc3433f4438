//! Owned snapshot table with a single internal lock.
//!
//! [`SnapshotTable`] keeps one entity kind in a `BTreeMap` behind one
//! [`tokio::sync::Mutex`]. The lock never leaves the table: callers hand in
//! closures that run under it, so no caller can forget to take it and no
//! I/O can happen while it is held.

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use tokio::sync::Mutex;
use tokio_util::sync::CancellationToken;
use tracing::{debug, trace, warn};

/// Keyed table of entity snapshots for one entity kind.
///
/// # Concurrency
///
/// - Every mutation is atomic under the table's lock.
/// - Projections hold the lock for the whole pass, so a projection never
///   observes a half-applied event.
/// - Tables never lock each other; there is no lock ordering to respect.
pub struct SnapshotTable<K, V> {
    name: &'static str,
    entries: Mutex<BTreeMap<K, V>>,
}

impl<K, V> fmt::Debug for SnapshotTable<K, V> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotTable")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<K, V> SnapshotTable<K, V>
where
    K: Ord + Clone + fmt::Debug,
{
    /// Creates an empty table; `name` labels log lines.
    #[must_use]
    pub fn new(name: &'static str) -> Self {
        Self {
            name,
            entries: Mutex::new(BTreeMap::new()),
        }
    }

    /// Inserts a new entry built by `build`.
    ///
    /// Returns `false` and leaves the table untouched if the key is already
    /// present; duplicate adds show up when a bulk dump is replayed.
    pub async fn insert_new(&self, key: K, build: impl FnOnce() -> V) -> bool {
        let mut map = self.entries.lock().await;
        if map.contains_key(&key) {
            debug!(table = self.name, ?key, "add for existing id ignored");
            return false;
        }
        map.insert(key, build());
        true
    }

    /// Inserts or replaces an entry.
    pub async fn upsert(&self, key: K, value: V) {
        self.entries.lock().await.insert(key, value);
    }

    /// Applies `apply` to the entry under `key`.
    ///
    /// Returns `false` if the key is unknown; that is logged, not an error.
    pub async fn update(&self, key: &K, apply: impl FnOnce(&mut V)) -> bool {
        let mut map = self.entries.lock().await;
        let Some(entry) = map.get_mut(key) else {
            warn!(table = self.name, ?key, "update for unknown id ignored");
            return false;
        };
        apply(entry);
        true
    }

    /// Removes and returns the entry under `key`; unknown keys are a no-op.
    pub async fn remove(&self, key: &K) -> Option<V> {
        let removed = self.entries.lock().await.remove(key);
        if removed.is_none() {
            trace!(table = self.name, ?key, "delete for unknown id");
        }
        removed
    }

    /// Drops every entry. Returns how many were dropped.
    pub async fn clear(&self) -> usize {
        let mut map = self.entries.lock().await;
        let dropped = map.len();
        map.clear();
        dropped
    }

    /// Replaces the whole content in one step.
    pub async fn replace_all(&self, entries: impl IntoIterator<Item = (K, V)>) {
        let mut map = self.entries.lock().await;
        map.clear();
        map.extend(entries);
    }

    /// Returns a copy of the entry under `key`.
    pub async fn get(&self, key: &K) -> Option<V>
    where
        V: Clone,
    {
        self.entries.lock().await.get(key).cloned()
    }

    /// Returns the current key set.
    pub async fn keys(&self) -> BTreeSet<K> {
        self.entries.lock().await.keys().cloned().collect()
    }

    /// Projects every entry through `project`, in key order, skipping
    /// entries for which it returns `None`.
    ///
    /// The token is checked before each entry. Once it is cancelled the
    /// entries projected so far are returned as a valid partial result.
    pub async fn project<P>(
        &self,
        cancel: &CancellationToken,
        mut project: impl FnMut(&V) -> Option<P>,
    ) -> Vec<P> {
        let map = self.entries.lock().await;
        let mut out = Vec::with_capacity(map.len());
        for entry in map.values() {
            if cancel.is_cancelled() {
                debug!(
                    table = self.name,
                    built = out.len(),
                    total = map.len(),
                    "projection cancelled, returning partial list"
                );
                break;
            }
            if let Some(projected) = project(entry) {
                out.push(projected);
            }
        }
        out
    }

    /// Returns the number of entries.
    pub async fn len(&self) -> usize {
        self.entries.lock().await.len()
    }

    /// Returns `true` if the table is empty.
    pub async fn is_empty(&self) -> bool {
        self.entries.lock().await.is_empty()
    }
}

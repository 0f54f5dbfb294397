//! Concurrent identity set backing the registry.

use crate::observer::Observer;
use parking_lot::RwLock;
use std::collections::hash_map::Entry;
use std::collections::HashMap;

/// Observers keyed by identity.
///
/// Every operation takes the lock for a single map operation only. Snapshots
/// copy the handles out, so callers iterate without holding the lock and
/// writers are never blocked by a slow consumer.
pub struct ObserverSet<O: Observer> {
    entries: RwLock<HashMap<O::Id, O>>,
}

impl<O: Observer> ObserverSet<O> {
    pub fn new() -> Self {
        Self {
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Insert an observer unless its identity is already present.
    ///
    /// Returns true if the observer was newly inserted. An existing entry is
    /// kept as is.
    pub fn insert(&self, observer: O) -> bool {
        let id = observer.id();
        match self.entries.write().entry(id) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(observer);
                true
            }
        }
    }

    /// Remove the entry with the given identity, if any.
    pub fn remove_id(&self, id: &O::Id) -> Option<O> {
        self.entries.write().remove(id)
    }

    /// Remove the entry sharing this observer's identity, if any.
    pub fn remove(&self, observer: &O) -> Option<O> {
        let id = observer.id();
        self.remove_id(&id)
    }

    /// Remove every listed identity under a single write lock.
    ///
    /// Returns the observers that were actually present.
    pub fn remove_all<I>(&self, ids: I) -> Vec<O>
    where
        I: IntoIterator<Item = O::Id>,
    {
        let mut entries = self.entries.write();
        ids.into_iter().filter_map(|id| entries.remove(&id)).collect()
    }

    /// Remove everything. Returns how many entries were dropped.
    pub fn clear(&self) -> usize {
        let mut entries = self.entries.write();
        let count = entries.len();
        entries.clear();
        count
    }

    pub fn contains_id(&self, id: &O::Id) -> bool {
        self.entries.read().contains_key(id)
    }

    pub fn contains(&self, observer: &O) -> bool {
        let id = observer.id();
        self.contains_id(&id)
    }

    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    /// Point-in-time copy of the current membership.
    pub fn snapshot(&self) -> Snapshot<O> {
        let observers = self.entries.read().values().cloned().collect();
        Snapshot { observers }
    }
}

impl<O: Observer> Default for ObserverSet<O> {
    fn default() -> Self {
        Self::new()
    }
}

/// Finite view of the registered observers at the moment it was taken.
///
/// Later registry mutations are not reflected. Each call to
/// [`ObserverSet::snapshot`] yields a fresh one.
#[derive(Clone, Debug)]
pub struct Snapshot<O> {
    observers: Vec<O>,
}

impl<O> Snapshot<O> {
    pub fn len(&self) -> usize {
        self.observers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observers.is_empty()
    }

    pub fn iter(&self) -> std::slice::Iter<'_, O> {
        self.observers.iter()
    }
}

impl<O> IntoIterator for Snapshot<O> {
    type Item = O;
    type IntoIter = std::vec::IntoIter<O>;

    fn into_iter(self) -> Self::IntoIter {
        self.observers.into_iter()
    }
}

impl<'a, O> IntoIterator for &'a Snapshot<O> {
    type Item = &'a O;
    type IntoIter = std::slice::Iter<'a, O>;

    fn into_iter(self) -> Self::IntoIter {
        self.observers.iter()
    }
}

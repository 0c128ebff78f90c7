//! Per-type entity partition.

use crate::entity::Entity;
use crate::key::EntityKey;
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::any::Any;
use std::fmt;
use std::sync::Arc;

/// The committed entities of one type within one database scope.
///
/// Every method copies entities across the boundary: values are cloned on
/// the way in and on the way out, so no caller ever aliases stored state.
pub struct Partition<T: Entity> {
    entries: DashMap<EntityKey, T>,
}

impl<T: Entity> Partition<T> {
    /// Creates an empty partition.
    #[must_use]
    pub fn new() -> Self {
        Self {
            entries: DashMap::new(),
        }
    }

    /// Returns the number of stored entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the partition holds no entities.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Checks if `key` is present.
    #[must_use]
    pub fn contains(&self, key: &EntityKey) -> bool {
        self.entries.contains_key(key)
    }

    /// Returns a copy of the entity stored under `key`.
    #[must_use]
    pub fn get(&self, key: &EntityKey) -> Option<T> {
        self.entries.get(key).map(|entry| entry.value().clone())
    }

    /// Stores a copy of `entity`, replacing any entry under `key`.
    pub fn put(&self, key: EntityKey, entity: &T) {
        self.entries.insert(key, entity.clone());
    }

    /// Stores a copy of `entity` only if `key` is vacant.
    ///
    /// Returns `false`, leaving the existing entry untouched, if the key is
    /// already present.
    pub fn insert_new(&self, key: EntityKey, entity: &T) -> bool {
        match self.entries.entry(key) {
            Entry::Occupied(_) => false,
            Entry::Vacant(slot) => {
                slot.insert(entity.clone());
                true
            }
        }
    }

    /// Overwrites the entry under `key` with a copy of `entity`.
    ///
    /// Returns `false` if the key is absent.
    pub fn replace_existing(&self, key: &EntityKey, entity: &T) -> bool {
        match self.entries.get_mut(key) {
            Some(mut slot) => {
                *slot = entity.clone();
                true
            }
            None => false,
        }
    }

    /// Removes and returns the entry under `key`.
    pub fn remove(&self, key: &EntityKey) -> Option<T> {
        self.entries.remove(key).map(|(_, entity)| entity)
    }

    /// Returns copies of all entries, ordered by key.
    #[must_use]
    pub fn entries(&self) -> Vec<(EntityKey, T)> {
        let mut entries: Vec<(EntityKey, T)> = self
            .entries
            .iter()
            .map(|entry| (entry.key().clone(), entry.value().clone()))
            .collect();
        entries.sort_by(|a, b| a.0.cmp(&b.0));
        entries
    }

    /// Returns copies of all entities, ordered by key.
    #[must_use]
    pub fn snapshot(&self) -> Vec<T> {
        self.entries().into_iter().map(|(_, entity)| entity).collect()
    }

    /// Returns all keys, ordered.
    #[must_use]
    pub fn keys(&self) -> Vec<EntityKey> {
        let mut keys: Vec<EntityKey> = self.entries.iter().map(|e| e.key().clone()).collect();
        keys.sort();
        keys
    }

    /// Visits every key without copying entities.
    pub fn for_each_key(&self, mut f: impl FnMut(&EntityKey)) {
        for entry in self.entries.iter() {
            f(entry.key());
        }
    }

    /// Removes every entry.
    pub fn clear(&self) {
        self.entries.clear();
    }
}

impl<T: Entity> Default for Partition<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Entity> fmt::Debug for Partition<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Partition")
            .field("entity_type", &T::entity_type())
            .field("len", &self.len())
            .finish_non_exhaustive()
    }
}

/// Type-erased view of a partition, used by whole-scope operations.
pub(crate) trait ErasedPartition: Send + Sync {
    fn entity_type(&self) -> &'static str;
    fn len(&self) -> usize;
    fn clear(&self);
    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync>;
}

impl<T: Entity> ErasedPartition for Partition<T> {
    fn entity_type(&self) -> &'static str {
        T::entity_type()
    }

    fn len(&self) -> usize {
        Partition::len(self)
    }

    fn clear(&self) {
        Partition::clear(self);
    }

    fn into_any(self: Arc<Self>) -> Arc<dyn Any + Send + Sync> {
        self
    }
}

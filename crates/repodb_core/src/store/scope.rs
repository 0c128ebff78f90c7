//! Database scopes and the shared snapshot store.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::store::partition::{ErasedPartition, Partition};
use crate::types::SequenceNumber;
use dashmap::DashMap;
use parking_lot::{Mutex, MutexGuard, RwLock};
use std::any::TypeId;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::debug;

/// A named, logically separate database inside a [`SnapshotStore`].
///
/// Holds one [`Partition`] per entity type, created on first access.
pub struct DatabaseScope {
    /// Scope name.
    name: String,
    /// Partitions by entity type.
    partitions: DashMap<TypeId, Arc<dyn ErasedPartition>>,
    /// Serializes "read max key + insert" for generated identities.
    identity_lock: Mutex<()>,
    /// Sequence of the last commit that wrote entries.
    committed_seq: AtomicU64,
    /// Wall-clock time of the last commit that wrote entries.
    last_commit: RwLock<Option<SystemTime>>,
}

impl DatabaseScope {
    fn new(name: String) -> Self {
        Self {
            name,
            partitions: DashMap::new(),
            identity_lock: Mutex::new(()),
            committed_seq: AtomicU64::new(0),
            last_commit: RwLock::new(None),
        }
    }

    /// Returns the scope name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the partition for `T`, creating it on first access.
    pub fn partition<T: Entity>(&self) -> Arc<Partition<T>> {
        let id = TypeId::of::<T>();
        let existing = self.partitions.get(&id).map(|p| Arc::clone(p.value()));
        let erased = match existing {
            Some(partition) => partition,
            None => Arc::clone(
                self.partitions
                    .entry(id)
                    .or_insert_with(|| Arc::new(Partition::<T>::new()) as Arc<dyn ErasedPartition>)
                    .value(),
            ),
        };
        match erased.into_any().downcast::<Partition<T>>() {
            Ok(partition) => partition,
            Err(_) => unreachable!("partition keyed by TypeId holds another type"),
        }
    }

    /// Returns the partition for `T` only if it already exists.
    pub fn existing_partition<T: Entity>(&self) -> Option<Arc<Partition<T>>> {
        self.partitions
            .contains_key(&TypeId::of::<T>())
            .then(|| self.partition::<T>())
    }

    /// Removes every entity of type `T`.
    pub fn clear_partition<T: Entity>(&self) {
        if let Some(partition) = self.existing_partition::<T>() {
            partition.clear();
        }
    }

    /// Removes every entity of every type.
    pub fn clear(&self) {
        for entry in self.partitions.iter() {
            entry.value().clear();
        }
    }

    /// Returns the number of entities across all partitions.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.partitions.iter().map(|p| p.value().len()).sum()
    }

    /// Returns the entity types that have a partition, with their sizes.
    #[must_use]
    pub fn partition_sizes(&self) -> Vec<(&'static str, usize)> {
        let mut sizes: Vec<(&'static str, usize)> = self
            .partitions
            .iter()
            .map(|p| (p.value().entity_type(), p.value().len()))
            .collect();
        sizes.sort_unstable();
        sizes
    }

    /// Returns the sequence of the last commit that wrote entries.
    #[must_use]
    pub fn committed_seq(&self) -> SequenceNumber {
        SequenceNumber::new(self.committed_seq.load(Ordering::SeqCst))
    }

    /// Returns the time of the last commit that wrote entries.
    #[must_use]
    pub fn last_commit(&self) -> Option<SystemTime> {
        *self.last_commit.read()
    }

    /// Acquires the identity generation lock.
    pub(crate) fn lock_identity(&self) -> MutexGuard<'_, ()> {
        self.identity_lock.lock()
    }

    /// Records a commit and returns its sequence number.
    pub(crate) fn record_commit(&self) -> SequenceNumber {
        let seq = SequenceNumber::new(self.committed_seq.fetch_add(1, Ordering::SeqCst) + 1);
        *self.last_commit.write() = Some(SystemTime::now());
        seq
    }
}

impl fmt::Debug for DatabaseScope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DatabaseScope")
            .field("name", &self.name)
            .field("entity_count", &self.entity_count())
            .field("committed_seq", &self.committed_seq())
            .finish_non_exhaustive()
    }
}

/// The shared store of committed entities.
///
/// Construct one per logical process (or per test) and share it through an
/// `Arc`. Contexts opened against the same store and database name see each
/// other's commits.
///
/// # Example
///
/// ```rust
/// use repodb_core::SnapshotStore;
/// use std::sync::Arc;
///
/// let store = Arc::new(SnapshotStore::new());
/// let scope = store.scope("orders").unwrap();
/// assert_eq!(scope.name(), "orders");
/// assert_eq!(store.database_names(), vec!["orders".to_string()]);
/// ```
#[derive(Default)]
pub struct SnapshotStore {
    scopes: DashMap<String, Arc<DatabaseScope>>,
}

impl SnapshotStore {
    /// Creates an empty store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the scope called `name`, creating it on first access.
    ///
    /// # Errors
    ///
    /// Returns [`CoreError::NullArgument`] if `name` is empty.
    pub fn scope(&self, name: &str) -> CoreResult<Arc<DatabaseScope>> {
        if name.trim().is_empty() {
            return Err(CoreError::null_argument("database_name"));
        }
        if let Some(scope) = self.scopes.get(name) {
            return Ok(Arc::clone(scope.value()));
        }
        let scope = self
            .scopes
            .entry(name.to_string())
            .or_insert_with(|| {
                debug!(database = name, "creating database scope");
                Arc::new(DatabaseScope::new(name.to_string()))
            })
            .value()
            .clone();
        Ok(scope)
    }

    /// Removes every entity in the scope called `name`.
    pub fn clear(&self, name: &str) {
        if let Some(scope) = self.scopes.get(name) {
            scope.value().clear();
        }
    }

    /// Removes every entity of type `T` in the scope called `name`.
    pub fn clear_partition<T: Entity>(&self, name: &str) {
        if let Some(scope) = self.scopes.get(name) {
            scope.value().clear_partition::<T>();
        }
    }

    /// Returns the names of all scopes, sorted.
    #[must_use]
    pub fn database_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.scopes.iter().map(|s| s.key().clone()).collect();
        names.sort();
        names
    }
}

impl fmt::Debug for SnapshotStore {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SnapshotStore")
            .field("databases", &self.database_names())
            .finish()
    }
}

//! File-backed context implementation.

use crate::context::{Context, EntityEntry, Query};
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::file::mapping::FileMapping;
use crate::key::{EntityKey, KeyValue};
use crate::types::ContextState;
use parking_lot::{Mutex, RwLock};
use std::any::TypeId;
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::SystemTime;
use tracing::{debug, info, warn};

/// Sets the busy flag for the lifetime of the guard.
///
/// `None` when the flag was already set.
struct BusyGuard<'a>(&'a AtomicBool);

impl<'a> BusyGuard<'a> {
    fn try_engage(flag: &'a AtomicBool) -> Option<Self> {
        if flag.swap(true, Ordering::SeqCst) {
            None
        } else {
            Some(Self(flag))
        }
    }
}

impl Drop for BusyGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// A registered entity type with its type erased.
trait FileTable: Send + Sync {
    fn entity_type(&self) -> &'static str;

    /// Reloads the partition if the backing store changed since the last
    /// load or flush. Returns `true` if a reload happened.
    fn refresh(&self, ctx: &Context) -> CoreResult<bool>;

    /// Writes the whole partition to the backing store.
    fn flush(&self, ctx: &Context) -> CoreResult<()>;
}

struct Table<T: Entity> {
    mapping: FileMapping<T>,
    /// Backing timestamp seen at the last load or flush.
    seen: Mutex<Option<SystemTime>>,
}

impl<T: Entity> FileTable for Table<T> {
    fn entity_type(&self) -> &'static str {
        T::entity_type()
    }

    fn refresh(&self, ctx: &Context) -> CoreResult<bool> {
        let mut seen = self.seen.lock();
        let current = self.mapping.backend.last_modified()?;
        if *seen == current {
            return Ok(false);
        }

        let bytes = self.mapping.backend.read_all()?;
        let entities = self.mapping.load(&bytes)?;
        let loaded = entities.len();

        ctx.scope().clear_partition::<T>();
        let loader = Context::with_conventions(
            Arc::clone(ctx.store()),
            Arc::clone(ctx.conventions()),
            ctx.config().clone().log_entries(false),
        )?;
        for entity in entities {
            loader.add(entity);
        }
        loader.save_changes()?;
        *seen = current;

        info!(
            entity_type = T::entity_type(),
            source = %self.mapping.backend.describe(),
            loaded,
            "partition reloaded"
        );
        Ok(true)
    }

    fn flush(&self, ctx: &Context) -> CoreResult<()> {
        let mut seen = self.seen.lock();
        let entities = ctx.scope().partition::<T>().snapshot();
        let bytes = self.mapping.save(&entities)?;
        self.mapping.backend.write_all(&bytes)?;
        *seen = self.mapping.backend.last_modified()?;

        debug!(
            entity_type = T::entity_type(),
            target = %self.mapping.backend.describe(),
            entities = entities.len(),
            bytes = bytes.len(),
            "partition flushed"
        );
        Ok(())
    }
}

/// A [`Context`] whose registered entity types mirror a backing store.
///
/// Reads of a registered type first reload its partition when the backing
/// store was modified by someone else. `save_changes` reloads every stale
/// partition, commits, and then writes every registered partition back.
///
/// Types that were never registered behave exactly as in the wrapped
/// context.
///
/// # Example
///
/// ```rust,ignore
/// let inner = Context::new(Arc::new(SnapshotStore::new()), Config::default())?;
/// let ctx = FileContext::new(inner);
/// ctx.register(FileMapping::<Customer>::json(Box::new(FileBackend::open(path)?)));
///
/// ctx.add(Customer::new("Alice"));
/// ctx.save_changes()?; // customers.json now holds Alice
/// ```
pub struct FileContext {
    inner: Context,
    tables: RwLock<Vec<(TypeId, Arc<dyn FileTable>)>>,
    /// Set while this context writes or reloads its own backing stores.
    busy: AtomicBool,
}

impl FileContext {
    /// Wraps `inner`. No type is file-backed until it is registered.
    #[must_use]
    pub fn new(inner: Context) -> Self {
        Self {
            inner,
            tables: RwLock::new(Vec::new()),
            busy: AtomicBool::new(false),
        }
    }

    /// Backs entity type `T` with `mapping`, replacing any earlier mapping
    /// for `T`.
    ///
    /// Nothing is read until the first access to `T`.
    pub fn register<T: Entity>(&self, mapping: FileMapping<T>) {
        let table: Arc<dyn FileTable> = Arc::new(Table {
            mapping,
            seen: Mutex::new(None),
        });
        let type_id = TypeId::of::<T>();

        let mut tables = self.tables.write();
        tables.retain(|(id, _)| *id != type_id);
        tables.push((type_id, table));
        debug!(entity_type = T::entity_type(), "file mapping registered");
    }

    /// Returns the wrapped context.
    #[must_use]
    pub fn inner(&self) -> &Context {
        &self.inner
    }

    /// Returns the lifecycle state of the wrapped context.
    #[must_use]
    pub fn state(&self) -> ContextState {
        self.inner.state()
    }

    /// Returns the number of staged changes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.inner.pending_count()
    }

    /// Returns `true` if `T` has a registered mapping.
    #[must_use]
    pub fn is_registered<T: Entity>(&self) -> bool {
        let type_id = TypeId::of::<T>();
        self.tables.read().iter().any(|(id, _)| *id == type_id)
    }

    fn table_for<T: Entity>(&self) -> Option<Arc<dyn FileTable>> {
        let type_id = TypeId::of::<T>();
        self.tables
            .read()
            .iter()
            .find(|(id, _)| *id == type_id)
            .map(|(_, table)| Arc::clone(table))
    }

    fn tables(&self) -> Vec<Arc<dyn FileTable>> {
        self.tables
            .read()
            .iter()
            .map(|(_, table)| Arc::clone(table))
            .collect()
    }

    fn refresh<T: Entity>(&self) -> CoreResult<()> {
        let Some(table) = self.table_for::<T>() else {
            return Ok(());
        };
        let Some(_busy) = BusyGuard::try_engage(&self.busy) else {
            return Ok(());
        };
        table.refresh(&self.inner)?;
        Ok(())
    }

    fn refresh_all(&self) -> CoreResult<()> {
        let Some(_busy) = BusyGuard::try_engage(&self.busy) else {
            return Ok(());
        };
        for table in self.tables() {
            table.refresh(&self.inner)?;
        }
        Ok(())
    }

    fn flush_all(&self) -> CoreResult<()> {
        for table in self.tables() {
            table.flush(&self.inner)?;
        }
        Ok(())
    }

    /// Stages `entity` for insertion.
    pub fn add<T: Entity>(&self, entity: T) -> EntityEntry<T> {
        self.inner.add(entity)
    }

    /// Stages `entity` to overwrite the stored entity with the same key.
    pub fn update<T: Entity>(&self, entity: T) -> EntityEntry<T> {
        self.inner.update(entity)
    }

    /// Stages removal of the stored entity with the same key as `entity`.
    pub fn remove<T: Entity>(&self, entity: T) -> EntityEntry<T> {
        self.inner.remove(entity)
    }

    /// Reloads stale partitions, commits, then writes every registered
    /// partition back.
    ///
    /// Partitions are written even when the commit fails part way, so the
    /// backing stores match the entries that were committed.
    ///
    /// The queue is empty when this returns, whether it succeeds or not.
    ///
    /// # Errors
    ///
    /// Returns a reload error before anything is committed (the staged
    /// changes are discarded), otherwise the commit error, otherwise the
    /// first write error.
    pub fn save_changes(&self) -> CoreResult<usize> {
        if let Err(e) = self.refresh_all() {
            let discarded = self.inner.discard_pending();
            warn!(error = %e, discarded, "reload failed, staged changes discarded");
            return Err(e);
        }

        let Some(_busy) = BusyGuard::try_engage(&self.busy) else {
            return self.inner.save_changes();
        };
        let outcome = self.inner.save_changes();
        if matches!(outcome, Ok(0)) {
            return outcome;
        }

        let flushed = self.flush_all();
        let written = outcome?;
        flushed?;
        Ok(written)
    }

    /// Looks up an entity by its key values.
    ///
    /// # Errors
    ///
    /// Returns reload errors, or the lookup errors of [`Context::find`].
    pub fn find<T: Entity>(&self, key_values: &[KeyValue]) -> CoreResult<Option<T>> {
        self.refresh::<T>()?;
        self.inner.find(key_values)
    }

    /// Looks up an entity by an already combined key.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn find_by_key<T: Entity>(&self, key: &EntityKey) -> CoreResult<Option<T>> {
        self.refresh::<T>()?;
        Ok(self.inner.find_by_key(key))
    }

    /// Returns a lazy query over all committed entities of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn find_all<T: Entity>(&self) -> CoreResult<Query<T>> {
        self.refresh::<T>()?;
        Ok(self.inner.find_all())
    }

    /// Returns the number of committed entities of type `T`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn count<T: Entity>(&self) -> CoreResult<usize> {
        self.refresh::<T>()?;
        Ok(self.inner.count::<T>())
    }

    /// Returns `true` if any committed entity matches `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn exists<T: Entity>(&self, predicate: impl Fn(&T) -> bool) -> CoreResult<bool> {
        self.refresh::<T>()?;
        Ok(self.inner.exists(predicate))
    }

    /// Returns the number of committed entities matching `predicate`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn count_where<T: Entity>(&self, predicate: impl Fn(&T) -> bool) -> CoreResult<usize> {
        self.refresh::<T>()?;
        Ok(self.inner.count_where(predicate))
    }

    /// Groups committed entities by `key_fn`.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn group_by<T, K, F>(&self, key_fn: F) -> CoreResult<HashMap<K, Vec<T>>>
    where
        T: Entity,
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        self.refresh::<T>()?;
        Ok(self.inner.group_by(key_fn))
    }

    /// Returns every committed entity of type `T` keyed by primary key.
    ///
    /// # Errors
    ///
    /// Returns an error if the partition could not be reloaded.
    pub fn to_dictionary<T: Entity>(&self) -> CoreResult<HashMap<EntityKey, T>> {
        self.refresh::<T>()?;
        Ok(self.inner.to_dictionary())
    }

    /// Discards staged changes, deletes the database scope, and writes the
    /// now empty partitions back.
    ///
    /// # Errors
    ///
    /// Returns the first write error.
    pub fn ensure_deleted(&self) -> CoreResult<()> {
        let _busy = BusyGuard::try_engage(&self.busy);
        self.inner.ensure_deleted();
        self.flush_all()
    }
}

impl fmt::Debug for FileContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let tables: Vec<&'static str> = self
            .tables
            .read()
            .iter()
            .map(|(_, table)| table.entity_type())
            .collect();
        f.debug_struct("FileContext")
            .field("inner", &self.inner)
            .field("tables", &tables)
            .finish_non_exhaustive()
    }
}

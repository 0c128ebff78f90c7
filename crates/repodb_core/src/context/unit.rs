//! Context implementation.

use crate::config::Config;
use crate::context::pending::PendingQueue;
use crate::context::query::Query;
use crate::context::EntityEntry;
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::key::{self, EntityKey, KeyConventions, KeyValue};
use crate::store::{DatabaseScope, SnapshotStore};
use crate::types::{ContextState, EntityState};
use std::collections::HashMap;
use std::fmt;
use std::hash::Hash;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{debug, info, trace, warn};

/// Resets the committing flag on every exit path.
struct CommitGuard<'a>(&'a AtomicBool);

impl<'a> CommitGuard<'a> {
    fn engage(flag: &'a AtomicBool) -> Self {
        flag.store(true, Ordering::SeqCst);
        Self(flag)
    }
}

impl Drop for CommitGuard<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::SeqCst);
    }
}

/// Unit of work over one database scope.
///
/// The context owns its queue of staged changes; the committed data lives in
/// the shared [`SnapshotStore`] and is visible to every context opened on the
/// same database name.
///
/// ## Caller contract
///
/// Staging may happen from several call sites, but `save_changes` must not
/// run concurrently with itself on the same context. Give each thread its own
/// context; contexts on the same scope may commit concurrently.
///
/// ## Partial commits
///
/// `save_changes` applies staged changes one at a time. When one fails, the
/// entries before it remain committed and the entries after it are discarded
/// with the rest of the queue.
///
/// # Example
///
/// ```rust,ignore
/// let store = Arc::new(SnapshotStore::new());
/// let ctx = Context::new(Arc::clone(&store), Config::default())?;
///
/// let entry = ctx.add(Customer::new("Alice"));
/// assert_eq!(ctx.save_changes()?, 1);
/// let id = entry.entity().id; // generated on commit
///
/// let found = ctx.find::<Customer>(&[id.into()])?;
/// ```
pub struct Context {
    /// Shared committed data.
    store: Arc<SnapshotStore>,
    /// The scope resolved from `config.database_name`.
    scope: Arc<DatabaseScope>,
    /// Key mappings.
    conventions: Arc<KeyConventions>,
    /// Staged changes.
    pending: PendingQueue,
    /// Set while `save_changes` runs.
    committing: AtomicBool,
    /// Configuration.
    config: Config,
}

impl Context {
    /// Opens a context using each entity's conventional key mapping.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn new(store: Arc<SnapshotStore>, config: Config) -> CoreResult<Self> {
        Self::with_conventions(store, Arc::new(KeyConventions::new()), config)
    }

    /// Opens a context with explicit key mappings.
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration is invalid.
    pub fn with_conventions(
        store: Arc<SnapshotStore>,
        conventions: Arc<KeyConventions>,
        config: Config,
    ) -> CoreResult<Self> {
        config.validate()?;
        let scope = store.scope(&config.database_name)?;
        Ok(Self {
            store,
            scope,
            conventions,
            pending: PendingQueue::default(),
            committing: AtomicBool::new(false),
            config,
        })
    }

    /// Returns the database scope name.
    #[must_use]
    pub fn database_name(&self) -> &str {
        self.scope.name()
    }

    /// Returns the shared store.
    #[must_use]
    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Returns the database scope.
    #[must_use]
    pub fn scope(&self) -> &Arc<DatabaseScope> {
        &self.scope
    }

    /// Returns the key mappings.
    #[must_use]
    pub fn conventions(&self) -> &Arc<KeyConventions> {
        &self.conventions
    }

    /// Returns the configuration.
    #[must_use]
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the lifecycle state.
    #[must_use]
    pub fn state(&self) -> ContextState {
        if self.committing.load(Ordering::SeqCst) {
            ContextState::Committing
        } else if self.pending.is_empty() {
            ContextState::Idle
        } else {
            ContextState::Staged
        }
    }

    /// Returns the number of staged changes.
    #[must_use]
    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    /// Drops every staged change without applying it. Returns how many were
    /// dropped.
    pub(crate) fn discard_pending(&self) -> usize {
        let discarded = self.pending.clear();
        if discarded > 0 {
            debug!(database = %self.database_name(), discarded, "staged changes discarded");
        }
        discarded
    }

    /// Stages `entity` for insertion.
    pub fn add<T: Entity>(&self, entity: T) -> EntityEntry<T> {
        self.stage(EntityState::Added, entity)
    }

    /// Stages `entity` to overwrite the stored entity with the same key.
    pub fn update<T: Entity>(&self, entity: T) -> EntityEntry<T> {
        self.stage(EntityState::Modified, entity)
    }

    /// Stages removal of the stored entity with the same key as `entity`.
    pub fn remove<T: Entity>(&self, entity: T) -> EntityEntry<T> {
        self.stage(EntityState::Removed, entity)
    }

    fn stage<T: Entity>(&self, state: EntityState, entity: T) -> EntityEntry<T> {
        trace!(
            database = %self.database_name(),
            entity_type = T::entity_type(),
            %state,
            "staging change"
        );
        self.pending
            .push(state, entity, self.conventions.descriptor::<T>())
    }

    /// Applies every staged change to the store and returns how many entries
    /// were written.
    ///
    /// The queue is empty when this returns, whether it succeeds or not.
    ///
    /// # Errors
    ///
    /// Returns the first failure:
    /// - `DuplicateKey` if an added key is already stored
    /// - `NotFound` if an updated or removed key is not stored
    /// - `UnsupportedKeyType` if a generated key has no generator
    /// - key mapping errors (`MissingKeyProperty`, `KeyTypeMismatch`)
    ///
    /// Entries applied before the failure stay committed.
    pub fn save_changes(&self) -> CoreResult<usize> {
        let _guard = CommitGuard::engage(&self.committing);
        let changes = self.pending.drain();
        if changes.is_empty() {
            return Ok(0);
        }

        let total = changes.len();
        debug!(database = %self.database_name(), changes = total, "saving changes");

        let mut written = 0usize;
        let mut outcome = Ok(());
        for change in changes {
            match change.apply(&self.scope) {
                Ok(key) => {
                    if self.config.log_entries {
                        trace!(
                            entity_type = change.entity_type(),
                            state = %change.state(),
                            %key,
                            "entry committed"
                        );
                    }
                    written += 1;
                }
                Err(e) => {
                    outcome = Err(e);
                    break;
                }
            }
        }

        if written > 0 {
            let seq = self.scope.record_commit();
            debug!(database = %self.database_name(), written, %seq, "commit recorded");
        }

        match outcome {
            Ok(()) => Ok(written),
            Err(e) => {
                warn!(
                    database = %self.database_name(),
                    error = %e,
                    committed = written,
                    discarded = total - written - 1,
                    "save failed"
                );
                Err(e)
            }
        }
    }

    /// Looks up an entity by its key values, in declared key order.
    ///
    /// Returns `Ok(None)` if no entity has that key.
    ///
    /// # Errors
    ///
    /// Returns `KeyCardinalityMismatch` (or `KeyTypeMismatch`) if the values
    /// do not fit the key mapping of `T`. The store is not consulted then.
    pub fn find<T: Entity>(&self, key_values: &[KeyValue]) -> CoreResult<Option<T>> {
        let descriptor = self.conventions.descriptor::<T>();
        let key = key::resolve_key::<T>(&descriptor, key_values.to_vec())?;
        Ok(self.find_by_key(&key))
    }

    /// Looks up an entity by an already combined key.
    #[must_use]
    pub fn find_by_key<T: Entity>(&self, key: &EntityKey) -> Option<T> {
        self.scope.partition::<T>().get(key)
    }

    /// Returns a lazy query over all committed entities of type `T`.
    #[must_use]
    pub fn find_all<T: Entity>(&self) -> Query<T> {
        Query::new(self.scope.partition::<T>())
    }

    /// Returns the number of committed entities of type `T`.
    #[must_use]
    pub fn count<T: Entity>(&self) -> usize {
        self.scope.partition::<T>().len()
    }

    /// Returns the number of committed entities matching `predicate`.
    pub fn count_where<T: Entity>(&self, predicate: impl Fn(&T) -> bool) -> usize {
        self.scope
            .partition::<T>()
            .snapshot()
            .iter()
            .filter(|entity| predicate(*entity))
            .count()
    }

    /// Returns `true` if any committed entity matches `predicate`.
    pub fn exists<T: Entity>(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.scope
            .partition::<T>()
            .snapshot()
            .iter()
            .any(|entity| predicate(entity))
    }

    /// Groups committed entities by `key_fn`. Groups keep key order.
    pub fn group_by<T, K, F>(&self, key_fn: F) -> HashMap<K, Vec<T>>
    where
        T: Entity,
        K: Eq + Hash,
        F: Fn(&T) -> K,
    {
        let mut groups: HashMap<K, Vec<T>> = HashMap::new();
        for entity in self.scope.partition::<T>().snapshot() {
            groups.entry(key_fn(&entity)).or_default().push(entity);
        }
        groups
    }

    /// Returns every committed entity of type `T` keyed by primary key.
    #[must_use]
    pub fn to_dictionary<T: Entity>(&self) -> HashMap<EntityKey, T> {
        self.scope.partition::<T>().entries().into_iter().collect()
    }

    /// Discards staged changes without committing them, then deletes every
    /// entity in this context's database scope.
    pub fn ensure_deleted(&self) {
        let discarded = self.pending.clear();
        let removed = self.scope.entity_count();
        self.store.clear(self.database_name());
        info!(
            database = %self.database_name(),
            discarded,
            removed,
            "database deleted"
        );
    }
}

impl fmt::Debug for Context {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Context")
            .field("database", &self.database_name())
            .field("state", &self.state())
            .field("pending", &self.pending_count())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::key::{EntityDescriptor, KeyProperty, KeyType};
    use crate::test_support::{Attachment, Customer, Note, OrderLine, Tag};

    fn create_context() -> Context {
        Context::new(Arc::new(SnapshotStore::new()), Config::default()).unwrap()
    }

    #[test]
    fn add_does_not_touch_store() {
        let ctx = create_context();
        ctx.add(Customer::with_id(1, "Alice"));

        assert_eq!(ctx.state(), ContextState::Staged);
        assert_eq!(ctx.pending_count(), 1);
        assert_eq!(ctx.count::<Customer>(), 0);
    }

    #[test]
    fn save_and_find() {
        let ctx = create_context();
        let customer = Customer::with_id(7, "Alice");
        ctx.add(customer.clone());

        assert_eq!(ctx.save_changes().unwrap(), 1);
        assert_eq!(ctx.state(), ContextState::Idle);
        assert_eq!(ctx.find::<Customer>(&[7i64.into()]).unwrap(), Some(customer));
    }

    #[test]
    fn save_without_changes_returns_zero() {
        let ctx = create_context();
        assert_eq!(ctx.save_changes().unwrap(), 0);
        assert_eq!(ctx.scope().committed_seq().as_u64(), 0);
    }

    #[test]
    fn find_missing_is_none() {
        let ctx = create_context();
        assert!(ctx.find::<Customer>(&[99i64.into()]).unwrap().is_none());
    }

    #[test]
    fn find_with_wrong_cardinality() {
        let ctx = create_context();
        let err = ctx.find::<OrderLine>(&[1i64.into()]).unwrap_err();
        assert!(matches!(err, CoreError::KeyCardinalityMismatch { .. }));
    }

    #[test]
    fn composite_key_lookup() {
        let ctx = create_context();
        ctx.add(OrderLine::new(10, 1, "apple"));
        ctx.add(OrderLine::new(10, 2, "pear"));
        ctx.save_changes().unwrap();

        let line = ctx.find::<OrderLine>(&[10i64.into(), 2i64.into()]).unwrap().unwrap();
        assert_eq!(line.sku, "pear");
        assert!(ctx.find::<OrderLine>(&[2i64.into(), 10i64.into()]).unwrap().is_none());
    }

    #[test]
    fn generated_integer_keys_are_sequential() {
        let ctx = create_context();
        let mut ids = Vec::new();
        for name in ["a", "b", "c"] {
            let entry = ctx.add(Customer::new(name));
            ctx.save_changes().unwrap();
            ids.push(entry.entity().id);
        }
        assert_eq!(ids, vec![1, 2, 3]);
    }

    #[test]
    fn generated_keys_within_one_batch() {
        let ctx = create_context();
        let a = ctx.add(Customer::new("a"));
        let b = ctx.add(Customer::new("b"));
        assert_eq!(ctx.save_changes().unwrap(), 2);

        assert_eq!(a.entity().id, 1);
        assert_eq!(b.entity().id, 2);
    }

    #[test]
    fn generated_uuid_and_text_keys() {
        let ctx = create_context();
        let tag = ctx.add(Tag::new("rust"));
        let note = ctx.add(Note::new("hello"));
        ctx.save_changes().unwrap();

        let tag = tag.entity();
        assert!(!tag.id.is_nil());
        assert_eq!(ctx.find::<Tag>(&[tag.id.into()]).unwrap(), Some(tag));

        let note = note.entity();
        assert_eq!(note.id.len(), 32);
        assert!(ctx.find::<Note>(&[note.id.clone().into()]).unwrap().is_some());
    }

    #[test]
    fn explicit_identity_value_is_kept() {
        let ctx = create_context();
        let entry = ctx.add(Customer::with_id(50, "explicit"));
        ctx.save_changes().unwrap();
        assert_eq!(entry.entity().id, 50);

        let next = ctx.add(Customer::new("next"));
        ctx.save_changes().unwrap();
        assert_eq!(next.entity().id, 51);
    }

    #[test]
    fn unsupported_generated_key_type() {
        let ctx = create_context();
        ctx.add(Attachment::new("file.bin"));
        let err = ctx.save_changes().unwrap_err();
        assert!(matches!(err, CoreError::UnsupportedKeyType { .. }));
        assert_eq!(ctx.pending_count(), 0);
    }

    #[test]
    fn duplicate_add_fails() {
        let ctx = create_context();
        ctx.add(Customer::with_id(1, "first"));
        ctx.save_changes().unwrap();

        ctx.add(Customer::with_id(1, "second"));
        let err = ctx.save_changes().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { .. }));
        assert_eq!(ctx.find::<Customer>(&[1i64.into()]).unwrap().unwrap().name, "first");
    }

    #[test]
    fn non_identity_mapping_never_generates() {
        let conventions = KeyConventions::new().with::<Customer>(EntityDescriptor::new(vec![
            KeyProperty::new("id", KeyType::Integer),
        ]));
        let ctx = Context::with_conventions(
            Arc::new(SnapshotStore::new()),
            Arc::new(conventions),
            Config::default(),
        )
        .unwrap();

        ctx.add(Customer::new("zero"));
        ctx.save_changes().unwrap();
        ctx.add(Customer::new("zero again"));

        let err = ctx.save_changes().unwrap_err();
        assert!(matches!(err, CoreError::DuplicateKey { .. }));
        assert!(ctx.find::<Customer>(&[0i64.into()]).unwrap().is_some());
    }

    #[test]
    fn update_and_remove() {
        let ctx = create_context();
        ctx.add(Customer::with_id(1, "Alice"));
        ctx.save_changes().unwrap();

        ctx.update(Customer::with_id(1, "Alicia"));
        ctx.save_changes().unwrap();
        assert_eq!(ctx.find::<Customer>(&[1i64.into()]).unwrap().unwrap().name, "Alicia");

        ctx.remove(Customer::with_id(1, "ignored"));
        ctx.save_changes().unwrap();
        assert!(ctx.find::<Customer>(&[1i64.into()]).unwrap().is_none());
    }

    #[test]
    fn update_missing_is_not_found() {
        let ctx = create_context();
        ctx.update(Customer::with_id(3, "ghost"));
        let err = ctx.save_changes().unwrap_err();
        assert!(matches!(err, CoreError::NotFound { .. }));
        assert_eq!(ctx.count::<Customer>(), 0);
    }

    #[test]
    fn failure_keeps_earlier_entries_and_drains_queue() {
        let ctx = create_context();
        ctx.add(Customer::with_id(1, "a"));
        ctx.add(Customer::with_id(1, "duplicate"));
        ctx.add(Customer::with_id(2, "never applied"));

        assert!(ctx.save_changes().is_err());
        assert_eq!(ctx.pending_count(), 0);
        assert_eq!(ctx.count::<Customer>(), 1);
        assert_eq!(ctx.scope().committed_seq().as_u64(), 1);
    }

    #[test]
    fn contexts_share_scope_by_name() {
        let store = Arc::new(SnapshotStore::new());
        let writer = Context::new(Arc::clone(&store), Config::new().database_name("shared")).unwrap();
        let reader = Context::new(Arc::clone(&store), Config::new().database_name("shared")).unwrap();
        let other = Context::new(store, Config::new().database_name("other")).unwrap();

        writer.add(Customer::with_id(1, "a"));
        writer.save_changes().unwrap();

        assert_eq!(reader.count::<Customer>(), 1);
        assert_eq!(other.count::<Customer>(), 0);
    }

    #[test]
    fn count_exists_group_and_dictionary() {
        let ctx = create_context();
        for (name, tier) in [("a", 1), ("b", 2), ("c", 2)] {
            let mut c = Customer::new(name);
            c.tier = tier;
            ctx.add(c);
        }
        ctx.save_changes().unwrap();

        assert_eq!(ctx.count::<Customer>(), 3);
        assert_eq!(ctx.count_where::<Customer>(|c| c.tier == 2), 2);
        assert!(ctx.exists::<Customer>(|c| c.name == "b"));
        assert!(!ctx.exists::<Customer>(|c| c.tier > 5));

        let groups = ctx.group_by::<Customer, u8, _>(|c| c.tier);
        assert_eq!(groups[&1].len(), 1);
        assert_eq!(groups[&2].len(), 2);

        let dictionary = ctx.to_dictionary::<Customer>();
        assert_eq!(dictionary[&EntityKey::from(3i64)].name, "c");
    }

    #[test]
    fn ensure_deleted_wipes_queue_and_scope() {
        let ctx = create_context();
        ctx.add(Customer::with_id(1, "a"));
        ctx.add(Tag::new("t"));
        ctx.save_changes().unwrap();

        ctx.add(Customer::with_id(2, "staged"));
        ctx.ensure_deleted();

        assert_eq!(ctx.pending_count(), 0);
        assert_eq!(ctx.scope().entity_count(), 0);
        assert!(ctx.find::<Customer>(&[1i64.into()]).unwrap().is_none());
    }

    #[test]
    fn invalid_config_is_rejected() {
        let result = Context::new(
            Arc::new(SnapshotStore::new()),
            Config::new().database_name(""),
        );
        assert!(matches!(result, Err(CoreError::NullArgument { .. })));
    }
}

//! Typed repository facade.

use crate::context::{Context, EntityEntry, Query};
use crate::entity::Entity;
use crate::error::CoreResult;
use crate::key::KeyValue;
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

/// A typed view over one entity type of a [`Context`].
///
/// `Repository<T>` saves spelling out the type parameter on every call.
/// Changes are staged in the shared context, so `save` commits the staged
/// changes of every type, not only `T`.
///
/// # Example
///
/// ```rust,ignore
/// let ctx = Arc::new(Context::new(store, Config::default())?);
/// let customers: Repository<Customer> = Repository::new(Arc::clone(&ctx));
///
/// customers.add(Customer::new("Alice"));
/// customers.save()?;
///
/// let gold: Vec<Customer> = customers.find_all().filter(|c| c.tier > 2).to_vec();
/// ```
pub struct Repository<T: Entity> {
    /// The unit of work changes are staged in.
    context: Arc<Context>,
    /// Type marker.
    _marker: PhantomData<fn() -> T>,
}

impl<T: Entity> Repository<T> {
    /// Creates a repository over `context`.
    #[must_use]
    pub fn new(context: Arc<Context>) -> Self {
        Self {
            context,
            _marker: PhantomData,
        }
    }

    /// Returns the underlying context.
    #[must_use]
    pub fn context(&self) -> &Arc<Context> {
        &self.context
    }

    /// Stages `entity` for insertion.
    pub fn add(&self, entity: T) -> EntityEntry<T> {
        self.context.add(entity)
    }

    /// Stages `entity` as an update.
    pub fn update(&self, entity: T) -> EntityEntry<T> {
        self.context.update(entity)
    }

    /// Stages `entity` for removal.
    pub fn remove(&self, entity: T) -> EntityEntry<T> {
        self.context.remove(entity)
    }

    /// Looks up an entity by key values.
    pub fn find(&self, key_values: &[KeyValue]) -> CoreResult<Option<T>> {
        self.context.find(key_values)
    }

    /// Returns a query over every committed `T`.
    #[must_use]
    pub fn find_all(&self) -> Query<T> {
        self.context.find_all()
    }

    /// Returns the number of committed entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.context.count::<T>()
    }

    /// Returns `true` if any committed entity matches `predicate`.
    pub fn exists(&self, predicate: impl Fn(&T) -> bool) -> bool {
        self.context.exists(predicate)
    }

    /// Commits the context's staged changes.
    pub fn save(&self) -> CoreResult<usize> {
        self.context.save_changes()
    }
}

impl<T: Entity> Clone for Repository<T> {
    fn clone(&self) -> Self {
        Self::new(Arc::clone(&self.context))
    }
}

impl<T: Entity> fmt::Debug for Repository<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Repository")
            .field("entity_type", &T::entity_type())
            .field("database", &self.context.database_name())
            .finish()
    }
}

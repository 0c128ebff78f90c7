//! Staged changes awaiting `save_changes`.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::key::{self, EntityDescriptor, EntityKey};
use crate::store::DatabaseScope;
use crate::types::EntityState;
use parking_lot::Mutex;
use std::fmt;
use std::mem;
use std::sync::Arc;

/// Handle onto an entity staged in a context.
///
/// The handle shares the staged copy with the context's queue, so identity
/// values generated during `save_changes` are visible through it afterwards.
pub struct EntityEntry<T: Entity> {
    state: EntityState,
    entity: Arc<Mutex<T>>,
    descriptor: Arc<EntityDescriptor>,
}

impl<T: Entity> EntityEntry<T> {
    /// Returns the staged state.
    #[must_use]
    pub fn state(&self) -> EntityState {
        self.state
    }

    /// Returns a copy of the staged entity, including written-back keys.
    #[must_use]
    pub fn entity(&self) -> T {
        self.entity.lock().clone()
    }

    /// Resolves the key the staged entity currently carries.
    ///
    /// # Errors
    ///
    /// Returns an error if the entity's key does not match its mapping.
    pub fn key(&self) -> CoreResult<EntityKey> {
        key::entity_key(&*self.entity.lock(), &self.descriptor)
    }
}

impl<T: Entity> Clone for EntityEntry<T> {
    fn clone(&self) -> Self {
        Self {
            state: self.state,
            entity: Arc::clone(&self.entity),
            descriptor: Arc::clone(&self.descriptor),
        }
    }
}

impl<T: Entity + fmt::Debug> fmt::Debug for EntityEntry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EntityEntry")
            .field("state", &self.state)
            .field("entity", &*self.entity.lock())
            .finish()
    }
}

/// A staged change with its type erased, so one queue can hold many types.
pub(crate) trait PendingChange: Send + Sync {
    fn state(&self) -> EntityState;

    fn entity_type(&self) -> &'static str;

    /// Applies the change to `scope` and returns the key it was applied under.
    fn apply(&self, scope: &DatabaseScope) -> CoreResult<EntityKey>;
}

struct Staged<T: Entity> {
    entry: EntityEntry<T>,
}

impl<T: Entity> PendingChange for Staged<T> {
    fn state(&self) -> EntityState {
        self.entry.state
    }

    fn entity_type(&self) -> &'static str {
        T::entity_type()
    }

    fn apply(&self, scope: &DatabaseScope) -> CoreResult<EntityKey> {
        let descriptor = &self.entry.descriptor;
        let partition = scope.partition::<T>();
        let mut entity = self.entry.entity.lock();

        match self.entry.state {
            EntityState::Added => {
                let needs_identity = descriptor.generated().next().is_some();
                // Generation reads the current maximum, so hold the lock
                // until the generated key is in the partition.
                let _identity = needs_identity.then(|| scope.lock_identity());
                key::assign_generated_keys(&mut *entity, descriptor, &partition)?;

                let key = key::entity_key(&*entity, descriptor)?;
                if !partition.insert_new(key.clone(), &entity) {
                    return Err(CoreError::duplicate_key(T::entity_type(), key));
                }
                Ok(key)
            }
            EntityState::Modified => {
                let key = key::entity_key(&*entity, descriptor)?;
                if !partition.replace_existing(&key, &entity) {
                    return Err(CoreError::not_found(T::entity_type(), key));
                }
                Ok(key)
            }
            EntityState::Removed => {
                let key = key::entity_key(&*entity, descriptor)?;
                if partition.remove(&key).is_none() {
                    return Err(CoreError::not_found(T::entity_type(), key));
                }
                Ok(key)
            }
        }
    }
}

/// FIFO queue of staged changes owned by one context.
#[derive(Default)]
pub(crate) struct PendingQueue {
    changes: Mutex<Vec<Box<dyn PendingChange>>>,
}

impl PendingQueue {
    /// Stages a change and returns its handle.
    pub(crate) fn push<T: Entity>(
        &self,
        state: EntityState,
        entity: T,
        descriptor: Arc<EntityDescriptor>,
    ) -> EntityEntry<T> {
        let entry = EntityEntry {
            state,
            entity: Arc::new(Mutex::new(entity)),
            descriptor,
        };
        self.changes.lock().push(Box::new(Staged {
            entry: entry.clone(),
        }));
        entry
    }

    /// Takes every staged change, leaving the queue empty.
    pub(crate) fn drain(&self) -> Vec<Box<dyn PendingChange>> {
        mem::take(&mut *self.changes.lock())
    }

    /// Discards every staged change and returns how many there were.
    pub(crate) fn clear(&self) -> usize {
        self.drain().len()
    }

    pub(crate) fn len(&self) -> usize {
        self.changes.lock().len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.changes.lock().is_empty()
    }
}

//! Lazy, restartable reads over a partition.

use crate::entity::Entity;
use crate::store::Partition;
use std::fmt;
use std::sync::Arc;

type Predicate<T> = Arc<dyn Fn(&T) -> bool + Send + Sync>;

/// A lazy read over all committed entities of one type.
///
/// Nothing is read until the query is iterated. Every iteration takes a
/// fresh snapshot of the live partition, so iterating twice can observe
/// commits made in between. Each yielded entity is an independent copy.
///
/// Filtering is plain Rust:
///
/// ```rust,ignore
/// let gold = context
///     .find_all::<Customer>()
///     .filter(|c| c.tier >= 3)
///     .to_vec();
/// ```
pub struct Query<T: Entity> {
    partition: Arc<Partition<T>>,
    filters: Vec<Predicate<T>>,
}

impl<T: Entity> Query<T> {
    pub(crate) fn new(partition: Arc<Partition<T>>) -> Self {
        Self {
            partition,
            filters: Vec::new(),
        }
    }

    /// Narrows the query to entities matching `predicate`.
    #[must_use]
    pub fn filter<F>(mut self, predicate: F) -> Self
    where
        F: Fn(&T) -> bool + Send + Sync + 'static,
    {
        self.filters.push(Arc::new(predicate));
        self
    }

    /// Takes a snapshot and iterates the matching entities in key order.
    pub fn iter(&self) -> std::vec::IntoIter<T> {
        self.to_vec().into_iter()
    }

    /// Collects the matching entities in key order.
    #[must_use]
    pub fn to_vec(&self) -> Vec<T> {
        let mut entities = self.partition.snapshot();
        entities.retain(|entity| self.matches(entity));
        entities
    }

    /// Counts the matching entities.
    #[must_use]
    pub fn count(&self) -> usize {
        self.iter().count()
    }

    /// Returns `true` if any entity matches.
    #[must_use]
    pub fn any(&self) -> bool {
        self.iter().next().is_some()
    }

    /// Returns the matching entity with the smallest key.
    #[must_use]
    pub fn first(&self) -> Option<T> {
        self.iter().next()
    }

    fn matches(&self, entity: &T) -> bool {
        self.filters.iter().all(|f| f(entity))
    }
}

impl<T: Entity> Clone for Query<T> {
    fn clone(&self) -> Self {
        Self {
            partition: Arc::clone(&self.partition),
            filters: self.filters.clone(),
        }
    }
}

impl<T: Entity> fmt::Debug for Query<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Query")
            .field("entity_type", &T::entity_type())
            .field("filters", &self.filters.len())
            .finish()
    }
}

impl<T: Entity> IntoIterator for Query<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

impl<T: Entity> IntoIterator for &Query<T> {
    type Item = T;
    type IntoIter = std::vec::IntoIter<T>;

    fn into_iter(self) -> Self::IntoIter {
        self.iter()
    }
}

//! Key mappings: which properties form an entity's primary key.

use crate::entity::Entity;
use crate::key::KeyType;
use dashmap::DashMap;
use std::any::TypeId;
use std::collections::HashMap;
use std::sync::Arc;

/// One primary key property of an entity type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyProperty {
    name: String,
    key_type: KeyType,
    generated: bool,
}

impl KeyProperty {
    /// Creates a caller-assigned key property.
    pub fn new(name: impl Into<String>, key_type: KeyType) -> Self {
        Self {
            name: name.into(),
            key_type,
            generated: false,
        }
    }

    /// Marks the property as an identity column whose value is generated on
    /// commit when left at its default.
    #[must_use]
    pub fn generated(mut self) -> Self {
        self.generated = true;
        self
    }

    /// Returns the property name.
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the declared key type.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        self.key_type
    }

    /// Returns `true` if the value is generated on commit.
    #[must_use]
    pub fn is_generated(&self) -> bool {
        self.generated
    }
}

/// The ordered primary key properties of an entity type.
///
/// # Conventions
///
/// [`EntityDescriptor::single`] follows the identity convention: a lone
/// integer or UUID key is generated. [`EntityDescriptor::composite`] never
/// generates. Use [`EntityDescriptor::new`] with [`KeyProperty::generated`]
/// to map anything else explicitly.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityDescriptor {
    properties: Vec<KeyProperty>,
}

impl EntityDescriptor {
    /// Creates a descriptor from explicit key properties.
    pub fn new(properties: Vec<KeyProperty>) -> Self {
        Self { properties }
    }

    /// Creates a single-property descriptor using the identity convention.
    pub fn single(name: impl Into<String>, key_type: KeyType) -> Self {
        let property = KeyProperty::new(name, key_type);
        let property = match key_type {
            KeyType::Integer | KeyType::Uuid => property.generated(),
            KeyType::Text | KeyType::Bytes => property,
        };
        Self::new(vec![property])
    }

    /// Creates a composite descriptor. No component is generated.
    pub fn composite<I, N>(properties: I) -> Self
    where
        I: IntoIterator<Item = (N, KeyType)>,
        N: Into<String>,
    {
        Self::new(
            properties
                .into_iter()
                .map(|(name, key_type)| KeyProperty::new(name, key_type))
                .collect(),
        )
    }

    /// Returns the key properties in declared order.
    #[must_use]
    pub fn properties(&self) -> &[KeyProperty] {
        &self.properties
    }

    /// Returns the number of key properties.
    #[must_use]
    pub fn len(&self) -> usize {
        self.properties.len()
    }

    /// Returns `true` if no key property is declared.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.properties.is_empty()
    }

    /// Returns the generated properties with their positions.
    pub fn generated(&self) -> impl Iterator<Item = (usize, &KeyProperty)> {
        self.properties
            .iter()
            .enumerate()
            .filter(|(_, p)| p.is_generated())
    }
}

/// Registry of key mappings.
///
/// Explicitly registered descriptors win; any other type falls back to
/// [`Entity::key_descriptor`], which is resolved once and cached.
#[derive(Debug, Default)]
pub struct KeyConventions {
    explicit: HashMap<TypeId, Arc<EntityDescriptor>>,
    resolved: DashMap<TypeId, Arc<EntityDescriptor>>,
}

impl KeyConventions {
    /// Creates an empty registry.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers an explicit mapping for `T`, replacing its convention.
    #[must_use]
    pub fn with<T: Entity>(mut self, descriptor: EntityDescriptor) -> Self {
        self.register::<T>(descriptor);
        self
    }

    /// Registers an explicit mapping for `T`, replacing its convention.
    pub fn register<T: Entity>(&mut self, descriptor: EntityDescriptor) {
        let id = TypeId::of::<T>();
        self.resolved.remove(&id);
        self.explicit.insert(id, Arc::new(descriptor));
    }

    /// Returns the mapping for `T`.
    pub fn descriptor<T: Entity>(&self) -> Arc<EntityDescriptor> {
        let id = TypeId::of::<T>();
        if let Some(descriptor) = self.explicit.get(&id) {
            return Arc::clone(descriptor);
        }
        if let Some(descriptor) = self.resolved.get(&id) {
            return Arc::clone(descriptor.value());
        }
        let descriptor = Arc::new(T::key_descriptor());
        self.resolved.insert(id, Arc::clone(&descriptor));
        descriptor
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::{Customer, OrderLine};

    #[test]
    fn single_integer_is_identity_by_convention() {
        let d = EntityDescriptor::single("id", KeyType::Integer);
        assert_eq!(d.len(), 1);
        assert!(d.properties()[0].is_generated());
    }

    #[test]
    fn single_text_is_not_identity_by_convention() {
        let d = EntityDescriptor::single("code", KeyType::Text);
        assert_eq!(d.generated().count(), 0);
    }

    #[test]
    fn composite_never_generates() {
        let d = EntityDescriptor::composite([("a", KeyType::Integer), ("b", KeyType::Uuid)]);
        assert_eq!(d.len(), 2);
        assert_eq!(d.generated().count(), 0);
        assert_eq!(d.properties()[1].name(), "b");
    }

    #[test]
    fn conventions_fall_back_to_entity() {
        let conventions = KeyConventions::new();
        assert_eq!(*conventions.descriptor::<Customer>(), Customer::key_descriptor());
        assert_eq!(conventions.descriptor::<OrderLine>().len(), 2);
    }

    #[test]
    fn explicit_mapping_wins() {
        let explicit = EntityDescriptor::new(vec![KeyProperty::new("id", KeyType::Integer)]);
        let conventions = KeyConventions::new().with::<Customer>(explicit.clone());

        let d = conventions.descriptor::<Customer>();
        assert_eq!(*d, explicit);
        assert_eq!(d.generated().count(), 0);
    }
}

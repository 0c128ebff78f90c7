//! Key resolver.
//!
//! Derives lookup keys from entities and synthesizes identity values. The
//! integer generator reads the partition's current maximum, so callers that
//! insert the result must hold the scope's identity lock across generation
//! and insert.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::key::{EntityDescriptor, EntityKey, KeyType, KeyValue};
use crate::store::Partition;
use uuid::Uuid;

/// Reads the declared key properties of `entity`, in declared order.
///
/// # Errors
///
/// Returns [`CoreError::MissingKeyProperty`] if the entity does not expose a
/// declared property.
pub fn primary_key_values<T: Entity>(
    entity: &T,
    descriptor: &EntityDescriptor,
) -> CoreResult<Vec<KeyValue>> {
    descriptor
        .properties()
        .iter()
        .map(|property| {
            entity
                .key_value(property.name())
                .ok_or_else(|| CoreError::missing_key_property(T::entity_type(), property.name()))
        })
        .collect()
}

/// Combines key values into one key: a single value passes through, several
/// values form a composite in the given order.
#[must_use]
pub fn combine_keys(mut values: Vec<KeyValue>) -> EntityKey {
    if values.len() == 1 {
        if let Some(value) = values.pop() {
            return EntityKey::Single(value);
        }
    }
    EntityKey::Composite(values)
}

/// Validates key values against the mapping of `T` and combines them.
///
/// # Errors
///
/// - [`CoreError::MissingKeyProperty`] if `T` declares no key at all
/// - [`CoreError::KeyCardinalityMismatch`] if the counts differ
/// - [`CoreError::KeyTypeMismatch`] if a value has the wrong type
pub fn resolve_key<T: Entity>(
    descriptor: &EntityDescriptor,
    values: Vec<KeyValue>,
) -> CoreResult<EntityKey> {
    if descriptor.is_empty() {
        return Err(CoreError::missing_key_property(
            T::entity_type(),
            "<primary key>",
        ));
    }
    if values.len() != descriptor.len() {
        return Err(CoreError::key_cardinality(
            T::entity_type(),
            descriptor.len(),
            values.len(),
        ));
    }
    for (property, value) in descriptor.properties().iter().zip(&values) {
        if property.key_type() != value.key_type() {
            return Err(CoreError::KeyTypeMismatch {
                expected: property.key_type(),
                actual: value.key_type(),
            });
        }
    }
    Ok(combine_keys(values))
}

/// Resolves the key `entity` currently carries.
///
/// # Errors
///
/// See [`primary_key_values`] and [`resolve_key`].
pub fn entity_key<T: Entity>(entity: &T, descriptor: &EntityDescriptor) -> CoreResult<EntityKey> {
    resolve_key::<T>(descriptor, primary_key_values(entity, descriptor)?)
}

/// Generates a value for the key property at `index`.
///
/// - `Uuid`: a random v4 UUID
/// - `Text`: a random v4 UUID as 32 hex characters without dashes
/// - `Integer`: one more than the largest value of that key component in the
///   partition, or `1` when there is none
///
/// # Errors
///
/// - [`CoreError::UnsupportedKeyType`] for `Bytes` keys
/// - [`CoreError::IdentityExhausted`] when the largest integer is `i64::MAX`
pub fn generate_primary_key<T: Entity>(
    descriptor: &EntityDescriptor,
    index: usize,
    partition: &Partition<T>,
) -> CoreResult<KeyValue> {
    let property = descriptor.properties().get(index).ok_or_else(|| {
        CoreError::key_cardinality(T::entity_type(), descriptor.len(), index + 1)
    })?;

    match property.key_type() {
        KeyType::Uuid => Ok(KeyValue::Uuid(Uuid::new_v4())),
        KeyType::Text => Ok(KeyValue::Text(Uuid::new_v4().simple().to_string())),
        KeyType::Integer => {
            let mut max: Option<i64> = None;
            partition.for_each_key(|key| {
                if let Some(n) = key.component(index).and_then(KeyValue::as_integer) {
                    max = Some(max.map_or(n, |m| m.max(n)));
                }
            });
            match max {
                None => Ok(KeyValue::Integer(1)),
                Some(m) => m.checked_add(1).map(KeyValue::Integer).ok_or_else(|| {
                    CoreError::identity_exhausted(T::entity_type(), property.name())
                }),
            }
        }
        KeyType::Bytes => Err(CoreError::unsupported_key_type(
            T::entity_type(),
            property.name(),
            property.key_type(),
        )),
    }
}

/// Generates and writes back every generated key property of `entity` that
/// is still at its default value. Returns how many values were assigned.
///
/// # Errors
///
/// Propagates generation and assignment failures.
pub fn assign_generated_keys<T: Entity>(
    entity: &mut T,
    descriptor: &EntityDescriptor,
    partition: &Partition<T>,
) -> CoreResult<usize> {
    let mut assigned = 0;
    for (index, property) in descriptor.generated() {
        let current = entity
            .key_value(property.name())
            .ok_or_else(|| CoreError::missing_key_property(T::entity_type(), property.name()))?;
        if !current.is_default() {
            continue;
        }
        let value = generate_primary_key(descriptor, index, partition)?;
        entity.set_key_value(property.name(), value)?;
        assigned += 1;
    }
    Ok(assigned)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::key::KeyProperty;
    use crate::test_support::{Attachment, Customer, Note, OrderLine, Tag};

    #[test]
    fn single_key_passes_through() {
        assert_eq!(
            combine_keys(vec![KeyValue::Integer(3)]),
            EntityKey::Single(KeyValue::Integer(3))
        );
    }

    #[test]
    fn composite_keeps_order() {
        let key = combine_keys(vec![1i64.into(), 2i64.into()]);
        assert_eq!(key, EntityKey::Composite(vec![1i64.into(), 2i64.into()]));
    }

    #[test]
    fn reads_values_in_declared_order() {
        let line = OrderLine::new(10, 2, "sku");
        let values = primary_key_values(&line, &OrderLine::key_descriptor()).unwrap();
        assert_eq!(values, vec![KeyValue::Integer(10), KeyValue::Integer(2)]);
    }

    #[test]
    fn missing_property_is_reported() {
        let descriptor = EntityDescriptor::single("nope", KeyType::Integer);
        let err = primary_key_values(&Customer::new("a"), &descriptor).unwrap_err();
        assert!(matches!(err, CoreError::MissingKeyProperty { .. }));
    }

    #[test]
    fn cardinality_mismatch() {
        let descriptor = OrderLine::key_descriptor();
        let err = resolve_key::<OrderLine>(&descriptor, vec![1i64.into()]).unwrap_err();
        assert!(matches!(
            err,
            CoreError::KeyCardinalityMismatch {
                expected: 2,
                actual: 1,
                ..
            }
        ));
    }

    #[test]
    fn wrong_value_type_is_rejected() {
        let descriptor = Customer::key_descriptor();
        let err = resolve_key::<Customer>(&descriptor, vec!["1".into()]).unwrap_err();
        assert!(matches!(err, CoreError::KeyTypeMismatch { .. }));
    }

    #[test]
    fn integer_generation_starts_at_one() {
        let partition = Partition::<Customer>::new();
        let value = generate_primary_key(&Customer::key_descriptor(), 0, &partition).unwrap();
        assert_eq!(value, KeyValue::Integer(1));
    }

    #[test]
    fn integer_generation_uses_max_plus_one() {
        let partition = Partition::<Customer>::new();
        for id in [3, 9, 4] {
            let mut c = Customer::new("x");
            c.id = id;
            partition.put(EntityKey::from(id), &c);
        }
        let value = generate_primary_key(&Customer::key_descriptor(), 0, &partition).unwrap();
        assert_eq!(value, KeyValue::Integer(10));
    }

    #[test]
    fn integer_generation_on_composite_component() {
        let descriptor = EntityDescriptor::new(vec![
            KeyProperty::new("order_id", KeyType::Integer),
            KeyProperty::new("line", KeyType::Integer).generated(),
        ]);
        let partition = Partition::<OrderLine>::new();
        let line = OrderLine::new(1, 5, "a");
        partition.put(EntityKey::Composite(vec![1i64.into(), 5i64.into()]), &line);

        let value = generate_primary_key(&descriptor, 1, &partition).unwrap();
        assert_eq!(value, KeyValue::Integer(6));
    }

    #[test]
    fn uuid_generation() {
        let partition = Partition::<Tag>::new();
        let value = generate_primary_key(&Tag::key_descriptor(), 0, &partition).unwrap();
        assert!(matches!(value, KeyValue::Uuid(u) if !u.is_nil()));
    }

    #[test]
    fn text_generation_is_dashless_hex() {
        let partition = Partition::<Note>::new();
        let value = generate_primary_key(&Note::key_descriptor(), 0, &partition).unwrap();
        let KeyValue::Text(text) = value else {
            panic!("expected text key");
        };
        assert_eq!(text.len(), 32);
        assert!(text.chars().all(|c| c.is_ascii_hexdigit()));
    }

    #[test]
    fn bytes_generation_is_unsupported() {
        let partition = Partition::<Attachment>::new();
        let err = generate_primary_key(&Attachment::key_descriptor(), 0, &partition).unwrap_err();
        match err {
            CoreError::UnsupportedKeyType {
                entity_type,
                property,
                key_type,
            } => {
                assert_eq!(entity_type, "Attachment");
                assert_eq!(property, "digest");
                assert_eq!(key_type, KeyType::Bytes);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn integer_identity_exhausted_at_max() {
        let partition = Partition::<Customer>::new();
        partition.put(EntityKey::from(i64::MAX), &Customer::with_id(i64::MAX, "last"));

        let err = generate_primary_key(&Customer::key_descriptor(), 0, &partition).unwrap_err();
        match err {
            CoreError::IdentityExhausted {
                entity_type,
                property,
            } => {
                assert_eq!(entity_type, "Customer");
                assert_eq!(property, "id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn assign_skips_explicit_values() {
        let partition = Partition::<Customer>::new();
        let mut customer = Customer::new("explicit");
        customer.id = 42;

        let assigned =
            assign_generated_keys(&mut customer, &Customer::key_descriptor(), &partition).unwrap();
        assert_eq!(assigned, 0);
        assert_eq!(customer.id, 42);
    }

    #[test]
    fn assign_writes_back_generated_value() {
        let partition = Partition::<Customer>::new();
        let mut customer = Customer::new("fresh");

        let assigned =
            assign_generated_keys(&mut customer, &Customer::key_descriptor(), &partition).unwrap();
        assert_eq!(assigned, 1);
        assert_eq!(customer.id, 1);
    }

    mod properties {
        use super::*;
        use proptest::prelude::*;

        proptest! {
            #[test]
            fn integer_identity_exceeds_every_stored_key(
                ids in prop::collection::hash_set(1i64..10_000, 0..50)
            ) {
                let partition = Partition::<Customer>::new();
                for id in &ids {
                    partition.put(EntityKey::from(*id), &Customer::with_id(*id, "c"));
                }
                let next =
                    generate_primary_key(&Customer::key_descriptor(), 0, &partition).unwrap();
                let expected = ids.iter().max().map_or(1, |m| m + 1);
                prop_assert_eq!(next, KeyValue::Integer(expected));
            }

            #[test]
            fn resolve_key_requires_exact_cardinality(len in 0usize..6) {
                let values: Vec<KeyValue> = (0..len as i64).map(KeyValue::Integer).collect();
                let result = resolve_key::<OrderLine>(&OrderLine::key_descriptor(), values);
                prop_assert_eq!(result.is_ok(), len == 2);
            }
        }
    }
}

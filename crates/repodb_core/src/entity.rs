//! The entity capability trait.

use crate::error::CoreResult;
use crate::key::{EntityDescriptor, KeyValue};

/// Trait for types tracked by a context.
///
/// `Clone` is the deep-copy contract: a clone must share no mutable state
/// with the original, because the store hands out and keeps clones on every
/// read and write. Types that hold `Rc`/`Arc` to mutable data must implement
/// `Clone` by hand to duplicate it.
///
/// # Example
///
/// ```rust
/// use repodb_core::{CoreError, CoreResult, Entity, EntityDescriptor, KeyType, KeyValue};
///
/// #[derive(Debug, Clone)]
/// struct Customer {
///     id: i64,
///     name: String,
/// }
///
/// impl Entity for Customer {
///     fn key_descriptor() -> EntityDescriptor {
///         EntityDescriptor::single("id", KeyType::Integer)
///     }
///
///     fn key_value(&self, property: &str) -> Option<KeyValue> {
///         (property == "id").then(|| self.id.into())
///     }
///
///     fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
///         match property {
///             "id" => self.id = value.try_into()?,
///             other => return Err(CoreError::missing_key_property(Self::entity_type(), other)),
///         }
///         Ok(())
///     }
/// }
/// ```
pub trait Entity: Clone + Send + Sync + 'static {
    /// Returns the conventional key mapping of this type.
    ///
    /// A mapping registered with [`crate::KeyConventions`] takes precedence.
    fn key_descriptor() -> EntityDescriptor;

    /// Reads a key property. Returns `None` for unknown properties.
    fn key_value(&self, property: &str) -> Option<KeyValue>;

    /// Writes a key property. Used to store generated identity values.
    ///
    /// # Errors
    ///
    /// Returns an error if the property is unknown or the value has the
    /// wrong type.
    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()>;

    /// Short type name used in errors and log events.
    fn entity_type() -> &'static str {
        let full = std::any::type_name::<Self>();
        full.rsplit("::").next().unwrap_or(full)
    }
}

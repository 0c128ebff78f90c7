//! Key values and combined entity keys.

use crate::error::{CoreError, CoreResult};
use std::fmt;
use uuid::Uuid;

/// Declared type of a key property.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyType {
    /// Signed integer key. Generated as `max + 1`.
    Integer,
    /// UUID key. Generated as a random v4 UUID.
    Uuid,
    /// String key. Generated as a dashless v4 UUID.
    Text,
    /// Raw byte key. Cannot be generated.
    Bytes,
}

impl fmt::Display for KeyType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Integer => "integer",
            Self::Uuid => "uuid",
            Self::Text => "text",
            Self::Bytes => "bytes",
        };
        f.write_str(name)
    }
}

/// A single primary key component.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum KeyValue {
    /// Integer component.
    Integer(i64),
    /// UUID component.
    Uuid(Uuid),
    /// String component.
    Text(String),
    /// Byte string component.
    Bytes(Vec<u8>),
}

impl KeyValue {
    /// Returns the type of this value.
    #[must_use]
    pub fn key_type(&self) -> KeyType {
        match self {
            Self::Integer(_) => KeyType::Integer,
            Self::Uuid(_) => KeyType::Uuid,
            Self::Text(_) => KeyType::Text,
            Self::Bytes(_) => KeyType::Bytes,
        }
    }

    /// Returns `true` for the unset value of the type: `0`, the nil UUID, or
    /// an empty string or byte string.
    #[must_use]
    pub fn is_default(&self) -> bool {
        match self {
            Self::Integer(n) => *n == 0,
            Self::Uuid(u) => u.is_nil(),
            Self::Text(s) => s.is_empty(),
            Self::Bytes(b) => b.is_empty(),
        }
    }

    /// Returns the integer value, if this is an integer component.
    #[must_use]
    pub fn as_integer(&self) -> Option<i64> {
        match self {
            Self::Integer(n) => Some(*n),
            _ => None,
        }
    }

    fn mismatch(&self, expected: KeyType) -> CoreError {
        CoreError::KeyTypeMismatch {
            expected,
            actual: self.key_type(),
        }
    }
}

impl fmt::Display for KeyValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer(n) => write!(f, "{n}"),
            Self::Uuid(u) => write!(f, "{u}"),
            Self::Text(s) => write!(f, "{s:?}"),
            Self::Bytes(b) => {
                f.write_str("0x")?;
                for byte in b {
                    write!(f, "{byte:02x}")?;
                }
                Ok(())
            }
        }
    }
}

impl From<i64> for KeyValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<i32> for KeyValue {
    fn from(value: i32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<u32> for KeyValue {
    fn from(value: u32) -> Self {
        Self::Integer(i64::from(value))
    }
}

impl From<Uuid> for KeyValue {
    fn from(value: Uuid) -> Self {
        Self::Uuid(value)
    }
}

impl From<String> for KeyValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<&str> for KeyValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<Vec<u8>> for KeyValue {
    fn from(value: Vec<u8>) -> Self {
        Self::Bytes(value)
    }
}

impl TryFrom<KeyValue> for i64 {
    type Error = CoreError;

    fn try_from(value: KeyValue) -> CoreResult<Self> {
        match value {
            KeyValue::Integer(n) => Ok(n),
            other => Err(other.mismatch(KeyType::Integer)),
        }
    }
}

impl TryFrom<KeyValue> for Uuid {
    type Error = CoreError;

    fn try_from(value: KeyValue) -> CoreResult<Self> {
        match value {
            KeyValue::Uuid(u) => Ok(u),
            other => Err(other.mismatch(KeyType::Uuid)),
        }
    }
}

impl TryFrom<KeyValue> for String {
    type Error = CoreError;

    fn try_from(value: KeyValue) -> CoreResult<Self> {
        match value {
            KeyValue::Text(s) => Ok(s),
            other => Err(other.mismatch(KeyType::Text)),
        }
    }
}

impl TryFrom<KeyValue> for Vec<u8> {
    type Error = CoreError;

    fn try_from(value: KeyValue) -> CoreResult<Self> {
        match value {
            KeyValue::Bytes(b) => Ok(b),
            other => Err(other.mismatch(KeyType::Bytes)),
        }
    }
}

/// The lookup key of an entity within its type partition.
///
/// Single-property keys wrap the raw value. Composite keys keep their
/// components in declared order; the same values in another order form a
/// different key.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum EntityKey {
    /// Key made of one property.
    Single(KeyValue),
    /// Key made of several properties, in declared order.
    Composite(Vec<KeyValue>),
}

impl EntityKey {
    /// Returns the key components in declared order.
    #[must_use]
    pub fn components(&self) -> &[KeyValue] {
        match self {
            Self::Single(value) => std::slice::from_ref(value),
            Self::Composite(values) => values,
        }
    }

    /// Returns the component at `index`.
    #[must_use]
    pub fn component(&self, index: usize) -> Option<&KeyValue> {
        self.components().get(index)
    }
}

impl fmt::Display for EntityKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Single(value) => write!(f, "{value}"),
            Self::Composite(values) => {
                f.write_str("(")?;
                for (i, value) in values.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{value}")?;
                }
                f.write_str(")")
            }
        }
    }
}

impl From<KeyValue> for EntityKey {
    fn from(value: KeyValue) -> Self {
        Self::Single(value)
    }
}

macro_rules! single_key_from {
    ($($ty:ty),*) => {
        $(
            impl From<$ty> for EntityKey {
                fn from(value: $ty) -> Self {
                    Self::Single(KeyValue::from(value))
                }
            }
        )*
    };
}

single_key_from!(i64, i32, u32, Uuid, String, &str, Vec<u8>);

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_values() {
        assert!(KeyValue::Integer(0).is_default());
        assert!(KeyValue::Uuid(Uuid::nil()).is_default());
        assert!(KeyValue::Text(String::new()).is_default());
        assert!(KeyValue::Bytes(Vec::new()).is_default());

        assert!(!KeyValue::Integer(-1).is_default());
        assert!(!KeyValue::Uuid(Uuid::new_v4()).is_default());
        assert!(!KeyValue::from("a").is_default());
    }

    #[test]
    fn try_from_checks_type() {
        let n: i64 = KeyValue::Integer(5).try_into().unwrap();
        assert_eq!(n, 5);

        let err = String::try_from(KeyValue::Integer(5)).unwrap_err();
        assert!(matches!(
            err,
            CoreError::KeyTypeMismatch {
                expected: KeyType::Text,
                actual: KeyType::Integer
            }
        ));
    }

    #[test]
    fn composite_order_matters() {
        let a = EntityKey::Composite(vec![1i64.into(), 2i64.into()]);
        let b = EntityKey::Composite(vec![2i64.into(), 1i64.into()]);
        assert_ne!(a, b);
    }

    #[test]
    fn components() {
        let single = EntityKey::from(9i64);
        assert_eq!(single.components(), &[KeyValue::Integer(9)]);

        let composite = EntityKey::Composite(vec![1i64.into(), "x".into()]);
        assert_eq!(composite.component(1), Some(&KeyValue::from("x")));
        assert!(composite.component(2).is_none());
    }

    #[test]
    fn display() {
        assert_eq!(EntityKey::from(42i64).to_string(), "42");
        assert_eq!(
            EntityKey::Composite(vec![1i64.into(), "a".into()]).to_string(),
            "(1, \"a\")"
        );
        assert_eq!(KeyValue::Bytes(vec![0xab, 0x01]).to_string(), "0xab01");
    }
}

//! Error types for repodb core.

use crate::key::{EntityKey, KeyType};
use thiserror::Error;

/// Result type for core operations.
pub type CoreResult<T> = Result<T, CoreError>;

/// Errors that can occur in repodb core operations.
///
/// None of these are retried internally. Every variant raised while
/// committing names the entity type involved, and the key where one exists.
#[derive(Debug, Error)]
pub enum CoreError {
    /// The number of key values does not match the declared key properties.
    #[error("{entity_type} declares {expected} key properties, got {actual} key values")]
    KeyCardinalityMismatch {
        /// Entity type name.
        entity_type: &'static str,
        /// Number of declared key properties.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },

    /// An added entity's key is already present in the store.
    #[error("duplicate key {key} for {entity_type}: entity already tracked")]
    DuplicateKey {
        /// Entity type name.
        entity_type: &'static str,
        /// The conflicting key.
        key: EntityKey,
    },

    /// A modified or removed entity's key is absent from the store.
    #[error("{entity_type} with key {key} not found")]
    NotFound {
        /// Entity type name.
        entity_type: &'static str,
        /// The missing key.
        key: EntityKey,
    },

    /// Identity generation was requested for a key type that has no generator.
    #[error("cannot generate key for {entity_type}.{property}: unsupported key type {key_type}")]
    UnsupportedKeyType {
        /// Entity type name.
        entity_type: &'static str,
        /// The key property.
        property: String,
        /// The declared key type.
        key_type: KeyType,
    },

    /// Every value of an integer identity has been used up.
    #[error("identity values exhausted for {entity_type}.{property}")]
    IdentityExhausted {
        /// Entity type name.
        entity_type: &'static str,
        /// The key property.
        property: String,
    },

    /// A required argument was missing or empty.
    #[error("required argument `{argument}` is missing")]
    NullArgument {
        /// Name of the argument.
        argument: &'static str,
    },

    /// An entity does not expose one of its declared key properties.
    #[error("{entity_type} does not expose key property `{property}`")]
    MissingKeyProperty {
        /// Entity type name.
        entity_type: &'static str,
        /// The declared property name.
        property: String,
    },

    /// A key value of the wrong type was assigned to a key property.
    #[error("key type mismatch: expected {expected}, got {actual}")]
    KeyTypeMismatch {
        /// The property's key type.
        expected: KeyType,
        /// The type of the supplied value.
        actual: KeyType,
    },

    /// Backing store error.
    #[error("storage error: {0}")]
    Storage(#[from] repodb_storage::StorageError),

    /// Snapshot serialization or deserialization failed.
    #[error("serialization error: {message}")]
    Serialization {
        /// Description of the failure.
        message: String,
    },
}

impl CoreError {
    /// Creates a key cardinality mismatch error.
    pub fn key_cardinality(entity_type: &'static str, expected: usize, actual: usize) -> Self {
        Self::KeyCardinalityMismatch {
            entity_type,
            expected,
            actual,
        }
    }

    /// Creates a duplicate key error.
    pub fn duplicate_key(entity_type: &'static str, key: EntityKey) -> Self {
        Self::DuplicateKey { entity_type, key }
    }

    /// Creates a not-found error.
    pub fn not_found(entity_type: &'static str, key: EntityKey) -> Self {
        Self::NotFound { entity_type, key }
    }

    /// Creates an unsupported key type error.
    pub fn unsupported_key_type(
        entity_type: &'static str,
        property: impl Into<String>,
        key_type: KeyType,
    ) -> Self {
        Self::UnsupportedKeyType {
            entity_type,
            property: property.into(),
            key_type,
        }
    }

    /// Creates an identity exhaustion error.
    pub fn identity_exhausted(entity_type: &'static str, property: impl Into<String>) -> Self {
        Self::IdentityExhausted {
            entity_type,
            property: property.into(),
        }
    }

    /// Creates a null argument error.
    pub fn null_argument(argument: &'static str) -> Self {
        Self::NullArgument { argument }
    }

    /// Creates a missing key property error.
    pub fn missing_key_property(entity_type: &'static str, property: impl Into<String>) -> Self {
        Self::MissingKeyProperty {
            entity_type,
            property: property.into(),
        }
    }

    /// Creates a serialization error.
    pub fn serialization(message: impl Into<String>) -> Self {
        Self::Serialization {
            message: message.into(),
        }
    }

    /// Returns the key involved in the failure, if any.
    #[must_use]
    pub fn key(&self) -> Option<&EntityKey> {
        match self {
            Self::DuplicateKey { key, .. } | Self::NotFound { key, .. } => Some(key),
            _ => None,
        }
    }
}

//! Backing store registrations and their serializers.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use repodb_storage::BackingStore;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fmt;
use std::io::{Read, Write};

/// Reads every entity of a snapshot from a stream.
pub type Loader<T> = Box<dyn Fn(&mut dyn Read) -> CoreResult<Vec<T>> + Send + Sync>;

/// Writes every entity of a partition to a stream.
pub type Saver<T> = Box<dyn Fn(&mut dyn Write, &[T]) -> CoreResult<()> + Send + Sync>;

/// Where and how one entity type is persisted.
pub struct FileMapping<T: Entity> {
    pub(crate) backend: Box<dyn BackingStore>,
    pub(crate) loader: Loader<T>,
    pub(crate) saver: Saver<T>,
}

impl<T: Entity> FileMapping<T> {
    /// Creates a mapping with a custom loader and saver.
    pub fn new<L, S>(backend: Box<dyn BackingStore>, loader: L, saver: S) -> Self
    where
        L: Fn(&mut dyn Read) -> CoreResult<Vec<T>> + Send + Sync + 'static,
        S: Fn(&mut dyn Write, &[T]) -> CoreResult<()> + Send + Sync + 'static,
    {
        Self {
            backend,
            loader: Box::new(loader),
            saver: Box::new(saver),
        }
    }

    /// Creates a mapping that stores the partition as a CBOR array.
    pub fn cbor(backend: Box<dyn BackingStore>) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::new(
            backend,
            |reader: &mut dyn Read| {
                ciborium::de::from_reader::<Vec<T>, _>(reader)
                    .map_err(|e| CoreError::serialization(format!("CBOR decode: {e}")))
            },
            |writer: &mut dyn Write, entities: &[T]| {
                ciborium::ser::into_writer(entities, writer)
                    .map_err(|e| CoreError::serialization(format!("CBOR encode: {e}")))
            },
        )
    }

    /// Creates a mapping that stores the partition as a pretty-printed JSON
    /// array.
    pub fn json(backend: Box<dyn BackingStore>) -> Self
    where
        T: Serialize + DeserializeOwned,
    {
        Self::new(
            backend,
            |reader: &mut dyn Read| {
                serde_json::from_reader::<_, Vec<T>>(reader)
                    .map_err(|e| CoreError::serialization(format!("JSON decode: {e}")))
            },
            |writer: &mut dyn Write, entities: &[T]| {
                serde_json::to_writer_pretty(writer, entities)
                    .map_err(|e| CoreError::serialization(format!("JSON encode: {e}")))
            },
        )
    }

    /// Decodes a snapshot. An empty snapshot holds no entities.
    pub(crate) fn load(&self, bytes: &[u8]) -> CoreResult<Vec<T>> {
        if bytes.is_empty() {
            return Ok(Vec::new());
        }
        let mut reader = bytes;
        (self.loader)(&mut reader)
    }

    /// Encodes a snapshot.
    pub(crate) fn save(&self, entities: &[T]) -> CoreResult<Vec<u8>> {
        let mut buffer = Vec::new();
        (self.saver)(&mut buffer, entities)?;
        Ok(buffer)
    }
}

impl<T: Entity> fmt::Debug for FileMapping<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("FileMapping")
            .field("entity_type", &T::entity_type())
            .field("backend", &self.backend.describe())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::Customer;
    use repodb_storage::InMemoryBackend;

    fn customers() -> Vec<Customer> {
        vec![Customer::with_id(1, "Alice"), Customer::with_id(2, "Bob")]
    }

    #[test]
    fn cbor_mapping_reads_what_it_writes() {
        let mapping = FileMapping::<Customer>::cbor(Box::new(InMemoryBackend::new()));
        let bytes = mapping.save(&customers()).unwrap();
        assert_eq!(mapping.load(&bytes).unwrap(), customers());
    }

    #[test]
    fn json_mapping_is_human_readable() {
        let mapping = FileMapping::<Customer>::json(Box::new(InMemoryBackend::new()));
        let bytes = mapping.save(&customers()).unwrap();
        let text = String::from_utf8(bytes.clone()).unwrap();

        assert!(text.contains("\"name\": \"Alice\""));
        assert_eq!(mapping.load(&bytes).unwrap(), customers());
    }

    #[test]
    fn empty_snapshot_loads_nothing() {
        let mapping = FileMapping::<Customer>::json(Box::new(InMemoryBackend::new()));
        assert!(mapping.load(&[]).unwrap().is_empty());
    }

    #[test]
    fn corrupt_snapshot_is_serialization_error() {
        let mapping = FileMapping::<Customer>::json(Box::new(InMemoryBackend::new()));
        let err = mapping.load(b"{not json").unwrap_err();
        assert!(matches!(err, CoreError::Serialization { .. }));
    }
}

//! In-memory backing store for testing.

use crate::backend::BackingStore;
use crate::error::{StorageError, StorageResult};
use parking_lot::RwLock;
use std::time::{Duration, SystemTime};

#[derive(Debug, Default)]
struct Inner {
    data: Vec<u8>,
    modified: Option<SystemTime>,
    closed: bool,
}

/// An in-memory backing store.
///
/// This backend keeps the snapshot in memory and is suitable for:
/// - Unit tests
/// - Simulating external edits through a shared `Arc` handle
///
/// Timestamps are strictly increasing: two writes within the same clock tick
/// still produce distinct `last_modified` values.
///
/// # Example
///
/// ```rust
/// use repodb_storage::{BackingStore, InMemoryBackend};
///
/// let backend = InMemoryBackend::new();
/// backend.write_all(b"test data").unwrap();
/// assert_eq!(backend.read_all().unwrap(), b"test data");
/// ```
#[derive(Debug, Default)]
pub struct InMemoryBackend {
    inner: RwLock<Inner>,
}

impl InMemoryBackend {
    /// Creates a new empty in-memory backend.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a new in-memory backend with pre-existing data.
    #[must_use]
    pub fn with_data(data: Vec<u8>) -> Self {
        let backend = Self::new();
        {
            let mut inner = backend.inner.write();
            inner.data = data;
            Self::bump(&mut inner);
        }
        backend
    }

    /// Returns a copy of the current snapshot.
    #[must_use]
    pub fn data(&self) -> Vec<u8> {
        self.inner.read().data.clone()
    }

    /// Closes the backend. Every later operation fails with
    /// [`StorageError::Closed`].
    pub fn close(&self) {
        self.inner.write().closed = true;
    }

    fn bump(inner: &mut Inner) {
        let now = SystemTime::now();
        inner.modified = Some(match inner.modified {
            Some(prev) if now <= prev => prev + Duration::from_nanos(1),
            _ => now,
        });
    }
}

impl BackingStore for InMemoryBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        let inner = self.inner.read();
        if inner.closed {
            return Err(StorageError::Closed);
        }
        Ok(inner.data.clone())
    }

    fn write_all(&self, data: &[u8]) -> StorageResult<()> {
        let mut inner = self.inner.write();
        if inner.closed {
            return Err(StorageError::Closed);
        }
        inner.data = data.to_vec();
        Self::bump(&mut inner);
        Ok(())
    }

    fn last_modified(&self) -> StorageResult<Option<SystemTime>> {
        let inner = self.inner.read();
        if inner.closed {
            return Err(StorageError::Closed);
        }
        Ok(inner.modified)
    }

    fn describe(&self) -> String {
        "memory".to_string()
    }
}

//! Backing store trait definition.

use crate::error::StorageResult;
use std::sync::Arc;
use std::time::SystemTime;

/// A whole-snapshot backing store.
///
/// Backing stores hold one serialized snapshot of a partition. The file-backed
/// context replaces the snapshot wholesale after each save and reads it back
/// when the store's timestamp moves.
///
/// # Invariants
///
/// - `read_all` returns exactly the bytes of the last `write_all`, or an empty
///   buffer when nothing was ever written
/// - `last_modified` is `None` until the store holds a snapshot
/// - every successful `write_all` moves `last_modified`
/// - Backends must be `Send + Sync` for concurrent access
pub trait BackingStore: Send + Sync {
    /// Reads the whole snapshot.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or an I/O error occurs.
    fn read_all(&self) -> StorageResult<Vec<u8>>;

    /// Replaces the snapshot with `data`.
    ///
    /// # Errors
    ///
    /// Returns an error if the store is closed or an I/O error occurs.
    fn write_all(&self, data: &[u8]) -> StorageResult<()>;

    /// Returns the time of the last write, from whichever writer.
    ///
    /// # Errors
    ///
    /// Returns an error if the timestamp cannot be determined.
    fn last_modified(&self) -> StorageResult<Option<SystemTime>>;

    /// Human-readable location, used in log output.
    fn describe(&self) -> String;
}

// Lets callers keep a handle on a backend they registered elsewhere.
impl<B: BackingStore + ?Sized> BackingStore for Arc<B> {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        (**self).read_all()
    }

    fn write_all(&self, data: &[u8]) -> StorageResult<()> {
        (**self).write_all(data)
    }

    fn last_modified(&self) -> StorageResult<Option<SystemTime>> {
        (**self).last_modified()
    }

    fn describe(&self) -> String {
        (**self).describe()
    }
}

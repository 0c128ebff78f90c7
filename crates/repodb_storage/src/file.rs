//! File-based backing store for persistent snapshots.

use crate::backend::BackingStore;
use crate::error::StorageResult;
use parking_lot::Mutex;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::time::SystemTime;

/// A file-based backing store.
///
/// The snapshot lives in a single file. Writes go to a sibling temporary file
/// which is synced and then renamed over the target, so readers never observe
/// a half-written snapshot.
///
/// # Timestamps
///
/// `last_modified` reports the file's modification time as recorded by the
/// OS. Edits made by other processes show up as a changed timestamp.
///
/// # Example
///
/// ```no_run
/// use repodb_storage::{BackingStore, FileBackend};
/// use std::path::Path;
///
/// let backend = FileBackend::open(Path::new("customers.cbor")).unwrap();
/// backend.write_all(b"snapshot").unwrap();
/// assert!(backend.last_modified().unwrap().is_some());
/// ```
#[derive(Debug)]
pub struct FileBackend {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileBackend {
    /// Opens a file backend at the given path.
    ///
    /// The file is not created until the first write.
    ///
    /// # Errors
    ///
    /// Returns an error if the path exists but is not a regular file.
    pub fn open(path: &Path) -> StorageResult<Self> {
        if let Ok(meta) = fs::metadata(path) {
            if !meta.is_file() {
                return Err(io::Error::new(
                    io::ErrorKind::InvalidInput,
                    format!("{} is not a regular file", path.display()),
                )
                .into());
            }
        }

        Ok(Self {
            path: path.to_path_buf(),
            write_lock: Mutex::new(()),
        })
    }

    /// Opens a file backend, creating parent directories if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if directories cannot be created.
    pub fn open_with_create_dirs(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        Self::open(path)
    }

    /// Returns the path to the underlying file.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_default();
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

impl BackingStore for FileBackend {
    fn read_all(&self) -> StorageResult<Vec<u8>> {
        match fs::read(&self.path) {
            Ok(bytes) => Ok(bytes),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(Vec::new()),
            Err(e) => Err(e.into()),
        }
    }

    fn write_all(&self, data: &[u8]) -> StorageResult<()> {
        let _guard = self.write_lock.lock();
        let temp = self.temp_path();

        {
            let mut file = File::create(&temp)?;
            file.write_all(data)?;
            file.sync_all()?;
        }
        fs::rename(&temp, &self.path)?;
        Ok(())
    }

    fn last_modified(&self) -> StorageResult<Option<SystemTime>> {
        match fs::metadata(&self.path) {
            Ok(meta) => Ok(Some(meta.modified()?)),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    fn describe(&self) -> String {
        self.path.display().to_string()
    }
}

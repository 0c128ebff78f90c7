//! # repodb Storage
//!
//! Backing stores used by the file-backed repodb context.
//!
//! A backing store is an **opaque byte blob** with a last-modified timestamp.
//! It does not interpret the snapshot it holds; serialization belongs to the
//! loader/saver pair registered with the context.
//!
//! ## Available Backends
//!
//! - [`InMemoryBackend`] - For testing and ephemeral storage
//! - [`FileBackend`] - For persistent storage using OS file APIs
//!
//! ## Example
//!
//! ```rust
//! use repodb_storage::{BackingStore, InMemoryBackend};
//!
//! let backend = InMemoryBackend::new();
//! assert!(backend.last_modified().unwrap().is_none());
//!
//! backend.write_all(b"hello world").unwrap();
//! assert_eq!(backend.read_all().unwrap(), b"hello world");
//! assert!(backend.last_modified().unwrap().is_some());
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod backend;
mod error;
mod file;
mod memory;

pub use backend::BackingStore;
pub use error::{StorageError, StorageResult};
pub use file::FileBackend;
pub use memory::InMemoryBackend;

//! # RepoDB Core
//!
//! In-memory unit-of-work data layer.
//!
//! This crate provides:
//! - Primary key mapping, resolution and identity generation
//! - A shared entity snapshot store partitioned by database name and type
//! - Transactional contexts with deferred writes and existence checks
//! - A file-backed context that mirrors partitions into backing stores
//! - A typed repository facade
//!
//! ```rust
//! use repodb_core::{Config, Context, SnapshotStore};
//! use std::sync::Arc;
//!
//! let store = Arc::new(SnapshotStore::new());
//! let ctx = Context::new(Arc::clone(&store), Config::default().database_name("shop")).unwrap();
//! assert_eq!(ctx.database_name(), "shop");
//! assert_eq!(ctx.save_changes().unwrap(), 0);
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod context;
mod entity;
mod error;
mod file;
pub mod key;
mod repository;
mod store;
mod types;

#[cfg(test)]
mod test_support;

pub use config::{Config, DEFAULT_DATABASE_NAME};
pub use context::{Context, EntityEntry, Query};
pub use entity::Entity;
pub use error::{CoreError, CoreResult};
pub use file::{FileContext, FileMapping, Loader, Saver};
pub use key::{EntityDescriptor, EntityKey, KeyConventions, KeyProperty, KeyType, KeyValue};
pub use repository::Repository;
pub use store::{DatabaseScope, Partition, SnapshotStore};
pub use types::{ContextState, EntityState, SequenceNumber};

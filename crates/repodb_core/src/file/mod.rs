//! File-backed context.
//!
//! Wraps a [`crate::Context`] so that each registered entity type mirrors a
//! serialized snapshot in a [`repodb_storage::BackingStore`]:
//! - before reads and saves, a changed backing timestamp triggers a reload
//! - after each save, the full partition is written back
//!
//! Serialization is delegated to the loader/saver pair of a
//! [`FileMapping`].

mod context;
mod mapping;

pub use context::FileContext;
pub use mapping::{FileMapping, Loader, Saver};

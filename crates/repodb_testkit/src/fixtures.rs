//! Test fixtures and context helpers.
//!
//! Provides convenience functions for setting up contexts over a fresh
//! store, or over temporary files.

use crate::entities::{Book, Person};
use repodb_core::{Config, Context, FileContext, FileMapping, SnapshotStore};
use repodb_storage::FileBackend;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tempfile::TempDir;

/// A context over its own store.
pub struct TestContext {
    /// The context instance.
    pub ctx: Context,
}

impl TestContext {
    /// Creates a context over a new, empty store.
    pub fn memory() -> Self {
        Self::named("test")
    }

    /// Creates a context for database `name` over a new, empty store.
    pub fn named(name: &str) -> Self {
        let store = Arc::new(SnapshotStore::new());
        Self {
            ctx: Context::new(store, Config::default().database_name(name))
                .expect("Failed to open context"),
        }
    }
}

impl std::ops::Deref for TestContext {
    type Target = Context;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

/// A file-backed context with [`Person`] and [`Book`] mapped to JSON files
/// in a temporary directory.
pub struct TestFileContext {
    /// The context instance.
    pub ctx: FileContext,
    /// The temporary directory (kept alive to prevent cleanup).
    temp_dir: TempDir,
}

impl TestFileContext {
    /// Creates the context in a new temporary directory.
    pub fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let ctx = open_file_context(temp_dir.path());
        Self { ctx, temp_dir }
    }

    /// Returns the directory holding the backing files.
    pub fn dir(&self) -> &Path {
        self.temp_dir.path()
    }

    /// Returns the backing file of [`Person`].
    pub fn people_path(&self) -> PathBuf {
        self.dir().join("people.json")
    }

    /// Opens another context over the same files but a separate store.
    pub fn reopen(&self) -> FileContext {
        open_file_context(self.dir())
    }
}

impl Default for TestFileContext {
    fn default() -> Self {
        Self::new()
    }
}

impl std::ops::Deref for TestFileContext {
    type Target = FileContext;

    fn deref(&self) -> &Self::Target {
        &self.ctx
    }
}

fn open_file_context(dir: &Path) -> FileContext {
    let inner = Context::new(Arc::new(SnapshotStore::new()), Config::default())
        .expect("Failed to open context");
    let ctx = FileContext::new(inner);

    let people = FileBackend::open_with_create_dirs(&dir.join("people.json"))
        .expect("Failed to open people backend");
    let books = FileBackend::open_with_create_dirs(&dir.join("books.json"))
        .expect("Failed to open books backend");
    ctx.register(FileMapping::<Person>::json(Box::new(people)));
    ctx.register(FileMapping::<Book>::json(Box::new(books)));
    ctx
}

/// Runs a test with a context over a fresh store.
///
/// # Example
///
/// ```rust
/// use repodb_testkit::{with_context, Person};
///
/// with_context(|ctx| {
///     ctx.add(Person::new("Alice", 30));
///     ctx.save_changes().unwrap();
///     assert_eq!(ctx.count::<Person>(), 1);
/// });
/// ```
pub fn with_context<F, R>(f: F) -> R
where
    F: FnOnce(&Context) -> R,
{
    let test_ctx = TestContext::memory();
    f(&test_ctx.ctx)
}

/// Runs a test with a file-backed context in a temporary directory.
pub fn with_file_context<F, R>(f: F) -> R
where
    F: FnOnce(&FileContext, &Path) -> R,
{
    let test_ctx = TestFileContext::new();
    f(&test_ctx.ctx, test_ctx.dir())
}

/// Opens `count` contexts on the same database of one shared store.
pub fn shared_contexts(count: usize) -> (Arc<SnapshotStore>, Vec<Context>) {
    let store = Arc::new(SnapshotStore::new());
    let contexts = (0..count)
        .map(|_| {
            Context::new(Arc::clone(&store), Config::default().database_name("shared"))
                .expect("Failed to open context")
        })
        .collect();
    (store, contexts)
}

/// Test scenario helpers.
pub mod scenarios {
    use super::*;

    /// Creates a context holding `count` committed people with identities
    /// `1..=count`.
    pub fn populated_context(count: usize) -> TestContext {
        let test_ctx = TestContext::memory();
        for i in 0..count {
            test_ctx.add(Person::new(&format!("person_{i}"), 20 + (i % 50) as u32));
        }
        test_ctx
            .save_changes()
            .expect("Failed to populate context");
        test_ctx
    }
}

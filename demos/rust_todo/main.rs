//! Basic RepoDB Example - Todo Application
//!
//! This example demonstrates core RepoDB functionality:
//! - Mapping an entity's primary key
//! - Staging adds, updates and removes in a context
//! - Generated identities written back on commit
//! - Filtering using native Rust iterators
//! - Mirroring a partition into a JSON file
//!
//! Run with: RUST_LOG=repodb_core=debug cargo run -p rust_todo

use repodb_core::{
    Config, Context, CoreError, CoreResult, Entity, EntityDescriptor, FileContext, FileMapping,
    KeyType, KeyValue, SnapshotStore,
};
use repodb_storage::FileBackend;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::info;
use tracing_subscriber::EnvFilter;

/// A simple Todo item keyed by a generated integer.
#[derive(Debug, Clone, Serialize, Deserialize)]
struct Todo {
    id: i64,
    title: String,
    completed: bool,
    priority: u8,
}

impl Todo {
    fn new(title: &str, priority: u8) -> Self {
        Self {
            id: 0,
            title: title.to_string(),
            completed: false,
            priority,
        }
    }

    /// Creates a copy with completed set to true.
    fn complete(self) -> Self {
        Self {
            completed: true,
            ..self
        }
    }
}

impl Entity for Todo {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::single("id", KeyType::Integer)
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "id").then(|| self.id.into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "id" => self.id = value.try_into()?,
            other => return Err(CoreError::missing_key_property(Self::entity_type(), other)),
        }
        Ok(())
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .init();

    println!("Todo Application Example");
    println!("========================\n");

    let path = std::env::temp_dir().join("repodb_todo").join("todos.json");
    let store = Arc::new(SnapshotStore::new());
    let inner = Context::new(Arc::clone(&store), Config::default().database_name("todo"))?;
    let ctx = FileContext::new(inner);
    ctx.register(FileMapping::<Todo>::json(Box::new(
        FileBackend::open_with_create_dirs(&path)?,
    )));
    info!(path = %path.display(), "todo file mapped");

    // Start from an empty list on every run.
    ctx.ensure_deleted()?;

    let todos = vec![
        Todo::new("Learn RepoDB", 1),
        Todo::new("Build an app", 2),
        Todo {
            completed: true,
            ..Todo::new("Write tests", 1)
        },
        Todo::new("Deploy to production", 3),
    ];

    println!("[+] Inserting {} todos...", todos.len());
    let entries: Vec<_> = todos.into_iter().map(|todo| ctx.add(todo)).collect();
    let saved = ctx.save_changes()?;
    println!("[OK] {saved} todos saved");
    for entry in &entries {
        let todo = entry.entity();
        println!("  #{} {}", todo.id, todo.title);
    }

    println!("\n[*] All todos:");
    let all_todos = ctx.find_all::<Todo>()?.to_vec();
    for todo in &all_todos {
        let status = if todo.completed { "✓" } else { "○" };
        println!("  {} [P{}] {}", status, todo.priority, todo.title);
    }

    println!("\n[!] High-priority incomplete todos:");
    for todo in ctx
        .find_all::<Todo>()?
        .filter(|t| !t.completed && t.priority == 1)
    {
        println!("  ○ {}", todo.title);
    }

    println!("\n[~] Completing 'Learn RepoDB'...");
    if let Some(todo) = all_todos.iter().find(|t| t.title == "Learn RepoDB") {
        ctx.update(todo.clone().complete());
        ctx.save_changes()?;
    }

    let (completed, incomplete): (Vec<_>, Vec<_>) = ctx
        .find_all::<Todo>()?
        .iter()
        .partition(|t| t.completed);
    println!("\n[#] Summary:");
    println!("  Completed: {}", completed.len());
    println!("  Incomplete: {}", incomplete.len());

    println!("\n[-] Deleting completed todos...");
    for todo in completed {
        ctx.remove(todo);
    }
    ctx.save_changes()?;
    println!("[OK] Remaining todos: {}", ctx.count::<Todo>()?);

    println!("\n[?] Adding a todo that already exists...");
    if let Some(existing) = ctx.find::<Todo>(&[2i64.into()])? {
        ctx.add(existing);
        match ctx.save_changes() {
            Err(e @ CoreError::DuplicateKey { .. }) => println!("[OK] Rejected: {e}"),
            other => println!("[??] Unexpected outcome: {other:?}"),
        }
    }

    println!("\n[*] Saved to {}", path.display());
    Ok(())
}

//! Benchmark utilities.

use repodb_core::{Config, Context, SnapshotStore};
use repodb_testkit::Person;
use std::sync::Arc;

/// Opens a context over a fresh store with per-entry tracing off.
pub fn bench_context() -> Context {
    Context::new(
        Arc::new(SnapshotStore::new()),
        Config::default().database_name("bench").log_entries(false),
    )
    .unwrap_or_else(|e| panic!("failed to open bench context: {e}"))
}

/// Generates people without identities.
pub fn generate_people(count: usize) -> Vec<Person> {
    (0..count)
        .map(|i| Person::new(&format!("person_{i}"), (i % 90) as u32))
        .collect()
}

/// Opens a context holding `count` committed people with identities
/// `1..=count`.
pub fn populated_context(count: usize) -> Context {
    let ctx = bench_context();
    for person in generate_people(count) {
        ctx.add(person);
    }
    ctx.save_changes()
        .unwrap_or_else(|e| panic!("failed to populate bench context: {e}"));
    ctx
}

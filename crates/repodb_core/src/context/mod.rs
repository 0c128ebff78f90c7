//! Transactional context: the unit-of-work boundary.
//!
//! A context stages adds, updates and removes in memory and applies them to
//! its database scope on `save_changes`:
//! - **Deferred writes**: nothing touches the store until `save_changes`
//! - **Existence checks**: duplicate adds and updates/removes of absent keys fail
//! - **Identity keys**: unset generated keys are assigned on commit
//! - **Commit-as-you-go**: entries applied before a failure stay applied

mod pending;
mod query;
mod unit;

pub use pending::EntityEntry;
pub use query::Query;
pub use unit::Context;

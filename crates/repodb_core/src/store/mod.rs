//! Entity snapshot store.
//!
//! The store is the shared "database": `database name → entity type → key →
//! entity copy`. It is constructed explicitly and handed to every context
//! that should see the same data.
//!
//! Partitions are sharded maps, so operations on a single key are atomic
//! without a store-wide lock. Whole-partition reads (enumeration, clear) see
//! each entry either before or after any concurrent write to it, but are not
//! a consistent snapshot across keys.

mod partition;
mod scope;

pub use partition::Partition;
pub use scope::{DatabaseScope, SnapshotStore};

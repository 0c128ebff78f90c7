//! # RepoDB Testkit
//!
//! Test utilities for RepoDB.
//!
//! This crate provides:
//! - Sample entities covering every key shape
//! - Context fixtures over memory and temporary-file backing stores
//! - Property-based test generators using proptest
//! - Concurrent stress helpers
//!
//! ## Usage
//!
//! ```rust
//! use repodb_testkit::prelude::*;
//!
//! with_context(|ctx| {
//!     ctx.add(Person::new("Alice", 30));
//!     assert_eq!(ctx.save_changes().unwrap(), 1);
//! });
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

pub mod entities;
pub mod fixtures;
pub mod generators;
pub mod stress;

/// Prelude module for convenient imports
pub mod prelude {
    pub use crate::entities::*;
    pub use crate::fixtures::*;
    pub use crate::generators::*;
    pub use crate::stress::*;
}

pub use entities::*;
pub use fixtures::*;
pub use generators::*;
pub use stress::*;

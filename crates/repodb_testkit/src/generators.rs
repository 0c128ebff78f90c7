//! Property-based test generators using proptest.
//!
//! Provides strategies for generating entities and change sequences.

use crate::entities::{Book, Enrollment, Person};
use proptest::prelude::*;

/// Strategy for generating valid database names.
pub fn database_name_strategy() -> impl Strategy<Value = String> {
    prop::string::string_regex("[a-zA-Z][a-zA-Z0-9_]{0,31}").expect("Invalid regex")
}

/// Strategy for generating people without an identity.
pub fn person_strategy() -> impl Strategy<Value = Person> {
    (
        "[A-Z][a-z]{0,15}",
        0u32..120,
        prop::collection::vec("[a-z]{1,8}", 0..4),
    )
        .prop_map(|(name, age, tags)| Person {
            tags,
            ..Person::new(&name, age)
        })
}

/// Strategy for generating books with distinct-looking ISBNs.
pub fn book_strategy() -> impl Strategy<Value = Book> {
    ("[0-9]{13}", "[A-Za-z ]{1,40}").prop_map(|(isbn, title)| Book::new(&isbn, &title))
}

/// Strategy for generating enrollments with small key components, so
/// collisions happen.
pub fn enrollment_strategy() -> impl Strategy<Value = Enrollment> {
    (1i64..20, 1i64..10, prop::option::of(prop::char::range('A', 'F'))).prop_map(
        |(student_id, course_id, grade)| Enrollment {
            grade,
            ..Enrollment::new(student_id, course_id)
        },
    )
}

/// A single staged change against a small key space.
#[derive(Debug, Clone)]
pub enum PersonOperation {
    /// Add a person with this identity.
    Add {
        /// Identity.
        id: i64,
        /// Name.
        name: String,
    },
    /// Update the person with this identity.
    Update {
        /// Identity.
        id: i64,
        /// New name.
        name: String,
    },
    /// Remove the person with this identity.
    Remove {
        /// Identity.
        id: i64,
    },
    /// Commit staged changes.
    Save,
}

/// Strategy for generating person operations over identities `1..=8`.
pub fn person_operation_strategy() -> impl Strategy<Value = PersonOperation> {
    prop_oneof![
        3 => (1i64..=8, "[a-z]{1,8}").prop_map(|(id, name)| PersonOperation::Add { id, name }),
        2 => (1i64..=8, "[a-z]{1,8}").prop_map(|(id, name)| PersonOperation::Update { id, name }),
        1 => (1i64..=8).prop_map(|id| PersonOperation::Remove { id }),
        2 => Just(PersonOperation::Save),
    ]
}

/// Strategy for generating a sequence of operations.
pub fn operation_sequence_strategy(
    min_ops: usize,
    max_ops: usize,
) -> impl Strategy<Value = Vec<PersonOperation>> {
    prop::collection::vec(person_operation_strategy(), min_ops..max_ops)
}

/// Configuration for property tests.
#[derive(Debug, Clone)]
pub struct PropTestConfig {
    /// Number of test cases to run.
    pub cases: u32,
    /// Maximum shrink iterations.
    pub max_shrink_iters: u32,
}

impl Default for PropTestConfig {
    fn default() -> Self {
        Self {
            cases: 256,
            max_shrink_iters: 1000,
        }
    }
}

impl PropTestConfig {
    /// Creates a configuration for quick tests.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            cases: 32,
            max_shrink_iters: 100,
        }
    }

    /// Converts to proptest config.
    #[must_use]
    pub fn to_proptest_config(&self) -> ProptestConfig {
        ProptestConfig {
            cases: self.cases,
            max_shrink_iters: self.max_shrink_iters,
            ..ProptestConfig::default()
        }
    }
}

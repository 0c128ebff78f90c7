//! Sample entities.
//!
//! One entity per key shape:
//! - [`Person`]: generated integer key
//! - [`Device`]: generated UUID key
//! - [`Book`]: caller-assigned text key
//! - [`Enrollment`]: composite integer key

use repodb_core::{CoreError, CoreResult, Entity, EntityDescriptor, KeyType, KeyValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn unknown_property<T: Entity>(property: &str) -> CoreError {
    CoreError::missing_key_property(T::entity_type(), property)
}

/// Entity with a generated integer key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Person {
    /// Identity; `0` until committed.
    pub id: i64,
    /// Display name.
    pub name: String,
    /// Age in years.
    pub age: u32,
    /// Free-form labels.
    pub tags: Vec<String>,
}

impl Person {
    /// Creates a person without an identity.
    pub fn new(name: &str, age: u32) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            age,
            tags: Vec::new(),
        }
    }

    /// Creates a person with an explicit identity.
    pub fn with_id(id: i64, name: &str, age: u32) -> Self {
        Self {
            id,
            ..Self::new(name, age)
        }
    }
}

impl Entity for Person {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::single("id", KeyType::Integer)
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "id").then(|| self.id.into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "id" => self.id = value.try_into()?,
            other => return Err(unknown_property::<Self>(other)),
        }
        Ok(())
    }
}

/// Entity with a generated UUID key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Device {
    /// Identity; nil until committed.
    pub id: Uuid,
    /// Human label.
    pub label: String,
}

impl Device {
    /// Creates a device without an identity.
    pub fn new(label: &str) -> Self {
        Self {
            id: Uuid::nil(),
            label: label.to_string(),
        }
    }
}

impl Entity for Device {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::single("id", KeyType::Uuid)
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "id").then(|| self.id.into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "id" => self.id = value.try_into()?,
            other => return Err(unknown_property::<Self>(other)),
        }
        Ok(())
    }
}

/// Entity keyed by a caller-assigned ISBN.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Book {
    /// ISBN, the primary key.
    pub isbn: String,
    /// Title.
    pub title: String,
}

impl Book {
    /// Creates a book.
    pub fn new(isbn: &str, title: &str) -> Self {
        Self {
            isbn: isbn.to_string(),
            title: title.to_string(),
        }
    }
}

impl Entity for Book {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::single("isbn", KeyType::Text)
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "isbn").then(|| self.isbn.clone().into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "isbn" => self.isbn = value.try_into()?,
            other => return Err(unknown_property::<Self>(other)),
        }
        Ok(())
    }
}

/// Entity with a composite `(student_id, course_id)` key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Enrollment {
    /// First key component.
    pub student_id: i64,
    /// Second key component.
    pub course_id: i64,
    /// Grade, if graded.
    pub grade: Option<char>,
}

impl Enrollment {
    /// Creates an ungraded enrollment.
    pub fn new(student_id: i64, course_id: i64) -> Self {
        Self {
            student_id,
            course_id,
            grade: None,
        }
    }
}

impl Entity for Enrollment {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::composite([
            ("student_id", KeyType::Integer),
            ("course_id", KeyType::Integer),
        ])
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        match property {
            "student_id" => Some(self.student_id.into()),
            "course_id" => Some(self.course_id.into()),
            _ => None,
        }
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "student_id" => self.student_id = value.try_into()?,
            "course_id" => self.course_id = value.try_into()?,
            other => return Err(unknown_property::<Self>(other)),
        }
        Ok(())
    }
}

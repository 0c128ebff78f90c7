//! Entities shared by the unit tests.

use crate::entity::Entity;
use crate::error::{CoreError, CoreResult};
use crate::key::{EntityDescriptor, KeyProperty, KeyType, KeyValue};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

fn unknown<T: Entity>(property: &str) -> CoreError {
    CoreError::missing_key_property(T::entity_type(), property)
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Customer {
    pub id: i64,
    pub name: String,
    pub tier: u8,
}

impl Customer {
    pub fn new(name: &str) -> Self {
        Self {
            id: 0,
            name: name.to_string(),
            tier: 1,
        }
    }

    pub fn with_id(id: i64, name: &str) -> Self {
        Self {
            id,
            ..Self::new(name)
        }
    }
}

impl Entity for Customer {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::single("id", KeyType::Integer)
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "id").then(|| self.id.into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "id" => self.id = value.try_into()?,
            other => return Err(unknown::<Self>(other)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Tag {
    pub id: Uuid,
    pub label: String,
}

impl Tag {
    pub fn new(label: &str) -> Self {
        Self {
            id: Uuid::nil(),
            label: label.to_string(),
        }
    }
}

impl Entity for Tag {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::single("id", KeyType::Uuid)
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "id").then(|| self.id.into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "id" => self.id = value.try_into()?,
            other => return Err(unknown::<Self>(other)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Note {
    pub id: String,
    pub body: String,
}

impl Note {
    pub fn new(body: &str) -> Self {
        Self {
            id: String::new(),
            body: body.to_string(),
        }
    }
}

impl Entity for Note {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::new(vec![KeyProperty::new("id", KeyType::Text).generated()])
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "id").then(|| self.id.clone().into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "id" => self.id = value.try_into()?,
            other => return Err(unknown::<Self>(other)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct OrderLine {
    pub order_id: i64,
    pub line: i64,
    pub sku: String,
}

impl OrderLine {
    pub fn new(order_id: i64, line: i64, sku: &str) -> Self {
        Self {
            order_id,
            line,
            sku: sku.to_string(),
        }
    }
}

impl Entity for OrderLine {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::composite([("order_id", KeyType::Integer), ("line", KeyType::Integer)])
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        match property {
            "order_id" => Some(self.order_id.into()),
            "line" => Some(self.line.into()),
            _ => None,
        }
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "order_id" => self.order_id = value.try_into()?,
            "line" => self.line = value.try_into()?,
            other => return Err(unknown::<Self>(other)),
        }
        Ok(())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Attachment {
    pub digest: Vec<u8>,
    pub name: String,
}

impl Attachment {
    pub fn new(name: &str) -> Self {
        Self {
            digest: Vec::new(),
            name: name.to_string(),
        }
    }
}

impl Entity for Attachment {
    fn key_descriptor() -> EntityDescriptor {
        EntityDescriptor::new(vec![KeyProperty::new("digest", KeyType::Bytes).generated()])
    }

    fn key_value(&self, property: &str) -> Option<KeyValue> {
        (property == "digest").then(|| self.digest.clone().into())
    }

    fn set_key_value(&mut self, property: &str, value: KeyValue) -> CoreResult<()> {
        match property {
            "digest" => self.digest = value.try_into()?,
            other => return Err(unknown::<Self>(other)),
        }
        Ok(())
    }
}

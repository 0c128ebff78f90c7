//! Primary key resolution and identity generation.

mod descriptor;
mod resolver;
mod value;

pub use descriptor::{EntityDescriptor, KeyConventions, KeyProperty};
pub use resolver::{
    assign_generated_keys, combine_keys, entity_key, generate_primary_key, primary_key_values,
    resolve_key,
};
pub use value::{EntityKey, KeyType, KeyValue};

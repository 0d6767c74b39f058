//! Entity metadata and schema registry.
//!
//! The catalog stores entity definitions and derives the foreign keys and
//! relationship tables implied by their field types. Schemas are immutable
//! once registered.

mod catalog;
mod entity;
mod field;
mod relation;
mod schema;
mod types;

pub use catalog::Catalog;
pub use entity::EntityDef;
pub use field::FieldDef;
pub use relation::{ForeignKeyRef, RelationshipTable};
pub use schema::Schema;
pub use types::FieldType;

//! In-memory catalog: the schema registry.
//!
//! Schemas are immutable once registered. An entity may only be registered
//! after every entity it references (via `ref<T>` or `list<ref<T>>`) has
//! already been registered — this keeps derivation a simple forward pass
//! with no placeholder/patch-up step.

use super::entity::EntityDef;
use super::schema::Schema;
use crate::error::Error;
use parking_lot::RwLock;
use std::collections::{HashMap, HashSet};

/// The schema registry.
#[derive(Default)]
pub struct Catalog {
    schemas: RwLock<HashMap<String, Schema>>,
    /// Names of relationship tables auto-created by `list<ref<T>>` fields,
    /// so the table store can accept writes to them without a registered
    /// [`EntityDef`] of their own.
    relationship_tables: RwLock<HashSet<String>>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an entity, deriving its schema against already-registered
    /// targets. Fails with [`Error::UnknownTable`] if a referenced entity
    /// has not been registered yet.
    pub fn register(&self, entity: EntityDef) -> Result<(), Error> {
        let name = entity.name.clone();
        let schema = {
            let schemas = self.schemas.read();
            Schema::derive(entity, |target| schemas.get(target).map(|s| s.entity.clone()))?
        };

        let mut rel_tables = self.relationship_tables.write();
        for rel in schema.relationships.values() {
            rel_tables.insert(rel.rel_table.clone());
        }
        let rel_table_count = schema.relationships.len();
        drop(rel_tables);

        self.schemas.write().insert(name.clone(), schema);
        tracing::debug!(table = %name, relationship_tables = rel_table_count, "entity registered");
        Ok(())
    }

    /// Get the schema for an entity, if registered.
    pub fn get(&self, name: &str) -> Option<Schema> {
        self.schemas.read().get(name).cloned()
    }

    /// List all registered entity names.
    pub fn list_entities(&self) -> Vec<String> {
        self.schemas.read().keys().cloned().collect()
    }

    /// Whether `table` is an auto-created relationship table (not a
    /// registered entity, but a valid write target for the table store).
    pub fn is_relationship_table(&self, table: &str) -> bool {
        self.relationship_tables.read().contains(table)
    }

    /// All relationship tables that reference `entity` as a source or
    /// target, across every registered schema.
    pub fn relationships_touching(&self, entity: &str) -> Vec<super::relation::RelationshipTable> {
        self.schemas
            .read()
            .values()
            .flat_map(|s| s.relationships.values().cloned())
            .filter(|r| r.source_table == entity || r.target_table == entity)
            .collect()
    }

    /// All inline foreign keys across every registered schema whose target
    /// is `entity` — used by the relationship resolver's delete-time
    /// referential integrity check.
    pub fn references_to(&self, entity: &str) -> Vec<(String, super::relation::ForeignKeyRef)> {
        self.schemas
            .read()
            .values()
            .flat_map(|s| {
                s.references
                    .values()
                    .filter(|fk| fk.target_table == entity)
                    .map(|fk| (s.entity.name.clone(), fk.clone()))
                    .collect::<Vec<_>>()
            })
            .collect()
    }
}

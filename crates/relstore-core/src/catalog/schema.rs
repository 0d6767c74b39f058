//! Resolved schema for a single entity: its definition plus the foreign
//! keys and relationship tables derived from its field types.
//!
//! A schema is immutable once registered with the catalog.

use super::entity::EntityDef;
use super::relation::{ForeignKeyRef, RelationshipTable};
use crate::error::Error;
use std::collections::HashMap;

/// The resolved schema for one entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub entity: EntityDef,
    /// Inline foreign keys, keyed by field name.
    pub references: HashMap<String, ForeignKeyRef>,
    /// Auto-derived relationship tables, keyed by field name.
    pub relationships: HashMap<String, RelationshipTable>,
}

impl Schema {
    /// Derive a schema for `entity`, resolving every `ref<T>` and
    /// `list<ref<T>>` field against already-registered entities via `lookup`.
    ///
    /// Fails with [`Error::UnknownTable`] if a referenced target entity has
    /// not been registered yet — relationship targets must be registered
    /// before the entity that references them.
    pub fn derive(
        entity: EntityDef,
        lookup: impl Fn(&str) -> Option<EntityDef>,
    ) -> Result<Self, Error> {
        let mut references = HashMap::new();
        let mut relationships = HashMap::new();

        for field in &entity.fields {
            if field.field_type.is_reference() {
                let target_name = field.field_type.reference_target().unwrap();
                let target = lookup(target_name).ok_or_else(|| Error::UnknownTable {
                    table: target_name.to_string(),
                })?;
                references.insert(
                    field.name.clone(),
                    ForeignKeyRef {
                        field: field.name.clone(),
                        target_table: target.name.clone(),
                        target_field: target.id_field.clone(),
                    },
                );
            } else if field.field_type.is_list_reference() {
                let target_name = field.field_type.reference_target().unwrap();
                let target = lookup(target_name).ok_or_else(|| Error::UnknownTable {
                    table: target_name.to_string(),
                })?;
                if let Some(rel) = RelationshipTable::derive(&entity, field, &target) {
                    relationships.insert(field.name.clone(), rel);
                }
            }
        }

        Ok(Self {
            entity,
            references,
            relationships,
        })
    }

    pub fn table_name(&self) -> &str {
        &self.entity.name
    }

    pub fn get_reference(&self, field: &str) -> Option<&ForeignKeyRef> {
        self.references.get(field)
    }

    pub fn get_relationship(&self, field: &str) -> Option<&RelationshipTable> {
        self.relationships.get(field)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::field::FieldDef;
    use crate::catalog::types::FieldType;

    #[test]
    fn derive_resolves_inline_reference() {
        let address = EntityDef::new("Address", "id").with_field(FieldDef::new("id", FieldType::Int));
        let user = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new(
                "address",
                FieldType::Ref {
                    target: "Address".into(),
                },
            ));

        let schema = Schema::derive(user, |name| {
            (name == "Address").then(|| address.clone())
        })
        .unwrap();

        let fk = schema.get_reference("address").unwrap();
        assert_eq!(fk.target_table, "Address");
        assert_eq!(fk.target_field, "id");
    }

    #[test]
    fn derive_resolves_list_reference() {
        let role = EntityDef::new("Role", "id").with_field(FieldDef::new("id", FieldType::Int));
        let user = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new(
                "roles",
                FieldType::ListRef {
                    target: "Role".into(),
                },
            ));

        let schema = Schema::derive(user, |name| (name == "Role").then(|| role.clone())).unwrap();

        let rel = schema.get_relationship("roles").unwrap();
        assert_eq!(rel.rel_table, "User__roles__rel");
    }

    #[test]
    fn derive_fails_on_unregistered_target() {
        let user = EntityDef::new("User", "id").with_field(FieldDef::new(
            "address",
            FieldType::Ref {
                target: "Address".into(),
            },
        ));

        let result = Schema::derive(user, |_| None);
        assert!(matches!(result, Err(Error::UnknownTable { .. })));
    }
}

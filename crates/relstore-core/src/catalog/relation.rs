//! Relationships derived from entity field types.
//!
//! An inline `ref<T>` field becomes a [`ForeignKeyRef`]. A `list<ref<T>>`
//! field becomes a [`RelationshipTable`], auto-named `<source>__<field>__rel`
//! with two identifier columns.

use super::entity::EntityDef;
use super::field::FieldDef;

/// An inline foreign key: a `ref<T>` field storing the target's identifier.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ForeignKeyRef {
    /// Field on the source entity holding the target id.
    pub field: String,
    /// Target entity / table name.
    pub target_table: String,
    /// Target entity's identifier field name.
    pub target_field: String,
}

/// An auto-derived many-to-many relationship table for a `list<ref<T>>` field.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelationshipTable {
    /// Name of the backing table: `<source>__<field>__rel`.
    pub rel_table: String,
    /// Field on the source entity that this table backs.
    pub source_field: String,
    /// Source entity / table name.
    pub source_table: String,
    /// Target entity / table name.
    pub target_table: String,
    /// Column on the relationship table holding the source identifier.
    pub source_column: String,
    /// Column on the relationship table holding the target identifier.
    pub target_column: String,
}

impl ForeignKeyRef {
    pub fn from_field(field: &FieldDef) -> Option<Self> {
        let target_table = field.field_type.reference_target()?;
        if !field.field_type.is_reference() {
            return None;
        }
        Some(Self {
            field: field.name.clone(),
            target_table: target_table.to_string(),
            target_field: String::new(), // filled in by Schema::derive once target is known
        })
    }
}

impl RelationshipTable {
    /// Derive the relationship table for a `list<ref<T>>` field on `source`.
    pub fn derive(source: &EntityDef, field: &FieldDef, target: &EntityDef) -> Option<Self> {
        if !field.field_type.is_list_reference() {
            return None;
        }
        let target_table = field.field_type.reference_target()?.to_string();
        let rel_table = format!("{}__{}__rel", source.name, field.name);
        let source_column = format!("{}__{}", source.name, source.id_field);
        let target_column = format!("{}__{}", target.name, target.id_field);
        Some(Self {
            rel_table,
            source_field: field.name.clone(),
            source_table: source.name.clone(),
            target_table,
            source_column,
            target_column,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::types::FieldType;

    #[test]
    fn relationship_table_is_named_per_convention() {
        let user = EntityDef::new("User", "id").with_field(FieldDef::new(
            "roles",
            FieldType::ListRef {
                target: "Role".into(),
            },
        ));
        let role = EntityDef::new("Role", "id");

        let rel = RelationshipTable::derive(&user, &user.fields[0], &role).unwrap();
        assert_eq!(rel.rel_table, "User__roles__rel");
        assert_eq!(rel.source_column, "User__id");
        assert_eq!(rel.target_column, "Role__id");
    }

    #[test]
    fn non_list_ref_field_yields_no_relationship_table() {
        let user = EntityDef::new("User", "id").with_field(FieldDef::new(
            "address",
            FieldType::Ref {
                target: "Address".into(),
            },
        ));
        let address = EntityDef::new("Address", "id");
        assert!(RelationshipTable::derive(&user, &user.fields[0], &address).is_none());
    }

    #[test]
    fn foreign_key_ref_extracted_from_ref_field() {
        let field = FieldDef::new(
            "address",
            FieldType::Ref {
                target: "Address".into(),
            },
        );
        let fk = ForeignKeyRef::from_field(&field).unwrap();
        assert_eq!(fk.target_table, "Address");
    }
}

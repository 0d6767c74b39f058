//! Entity definitions (table schemas).

use super::field::FieldDef;

/// An entity definition. The entity name doubles as the table name.
#[derive(Debug, Clone, PartialEq)]
pub struct EntityDef {
    /// Entity / table name (unique within the catalog).
    pub name: String,
    /// Name of the primary identifier field.
    pub id_field: String,
    /// Ordered field definitions.
    pub fields: Vec<FieldDef>,
}

impl EntityDef {
    /// Create a new entity definition.
    pub fn new(name: impl Into<String>, id_field: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            id_field: id_field.into(),
            fields: Vec::new(),
        }
    }

    /// Add a field to the entity.
    pub fn with_field(mut self, field: FieldDef) -> Self {
        self.fields.push(field);
        self
    }

    /// Add multiple fields.
    pub fn with_fields(mut self, fields: impl IntoIterator<Item = FieldDef>) -> Self {
        self.fields.extend(fields);
        self
    }

    /// Get a field by name.
    pub fn get_field(&self, name: &str) -> Option<&FieldDef> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// Get the identifier field definition.
    pub fn get_id_field(&self) -> Option<&FieldDef> {
        self.get_field(&self.id_field)
    }

    /// Fields whose type is `ref<T>` (inline foreign keys).
    pub fn reference_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields.iter().filter(|f| f.field_type.is_reference())
    }

    /// Fields whose type is `list<ref<T>>` (relationship-table backed).
    pub fn list_reference_fields(&self) -> impl Iterator<Item = &FieldDef> {
        self.fields
            .iter()
            .filter(|f| f.field_type.is_list_reference())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::FieldType;

    #[test]
    fn entity_builder_collects_fields() {
        let entity = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new("email", FieldType::Text).with_unique())
            .with_field(FieldDef::optional("address", FieldType::Ref {
                target: "Address".into(),
            }));

        assert_eq!(entity.name, "User");
        assert_eq!(entity.id_field, "id");
        assert_eq!(entity.fields.len(), 3);
        assert_eq!(entity.reference_fields().count(), 1);
    }

    #[test]
    fn get_field_finds_by_name() {
        let entity = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new("name", FieldType::Text));

        assert!(entity.get_field("id").is_some());
        assert!(entity.get_field("name").is_some());
        assert!(entity.get_field("nonexistent").is_none());
        assert!(entity.get_id_field().is_some());
    }

    #[test]
    fn list_reference_fields_filters_list_refs() {
        let entity = EntityDef::new("User", "id")
            .with_field(FieldDef::new("id", FieldType::Int))
            .with_field(FieldDef::new("roles", FieldType::ListRef {
                target: "Role".into(),
            }));

        assert_eq!(entity.list_reference_fields().count(), 1);
        assert_eq!(entity.reference_fields().count(), 0);
    }
}

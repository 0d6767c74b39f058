//! Field definitions for entities.
//!
//! Matches the per-field constraint set named by the entity metadata
//! component: unique, max-length, pattern, required.

use super::types::FieldType;

/// A field definition within an entity.
#[derive(Debug, Clone, PartialEq)]
pub struct FieldDef {
    pub name: String,
    pub field_type: FieldType,
    pub required: bool,
    pub unique: bool,
    pub max_length: Option<usize>,
    pub pattern: Option<String>,
}

impl FieldDef {
    /// Create a required field with no other constraints.
    pub fn new(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            required: true,
            unique: false,
            max_length: None,
            pattern: None,
        }
    }

    /// Create an optional field (required = false).
    pub fn optional(name: impl Into<String>, field_type: FieldType) -> Self {
        Self {
            required: false,
            ..Self::new(name, field_type)
        }
    }

    pub fn with_unique(mut self) -> Self {
        self.unique = true;
        self
    }

    pub fn with_max_length(mut self, max_length: usize) -> Self {
        self.max_length = Some(max_length);
        self
    }

    pub fn with_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.pattern = Some(pattern.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_def_builder_sets_constraints() {
        let field = FieldDef::new("email", FieldType::Text)
            .with_unique()
            .with_max_length(254)
            .with_pattern(r"^[^@]+@[^@]+$");

        assert_eq!(field.name, "email");
        assert!(field.required);
        assert!(field.unique);
        assert_eq!(field.max_length, Some(254));
        assert!(field.pattern.is_some());
    }

    #[test]
    fn optional_field_is_not_required() {
        let field = FieldDef::optional("nickname", FieldType::Text);
        assert!(!field.required);
        assert!(!field.unique);
    }
}

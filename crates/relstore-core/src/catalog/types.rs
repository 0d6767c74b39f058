//! Field type vocabulary for the catalog.

/// A field's declared type.
///
/// `Ref`/`ListRef` name the target entity type by name, not by table — table
/// and entity name coincide in this model (see [`super::EntityDef`]).
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum FieldType {
    Bool,
    Int,
    Decimal,
    Float,
    Text,
    Timestamp,
    TimeOfDay,
    Bytes,
    Enum { name: String, variants: Vec<String> },
    /// A foreign key to another entity's identifier.
    Ref { target: String },
    /// A many-to-many field, backed by an auto-derived relationship table.
    ListRef { target: String },
}

impl FieldType {
    pub fn is_reference(&self) -> bool {
        matches!(self, FieldType::Ref { .. })
    }

    pub fn is_list_reference(&self) -> bool {
        matches!(self, FieldType::ListRef { .. })
    }

    pub fn reference_target(&self) -> Option<&str> {
        match self {
            FieldType::Ref { target } | FieldType::ListRef { target } => Some(target),
            _ => None,
        }
    }

    pub fn is_numeric(&self) -> bool {
        matches!(
            self,
            FieldType::Int | FieldType::Decimal | FieldType::Float
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ref_reports_reference_target() {
        let t = FieldType::Ref {
            target: "Address".into(),
        };
        assert!(t.is_reference());
        assert!(!t.is_list_reference());
        assert_eq!(t.reference_target(), Some("Address"));
    }

    #[test]
    fn list_ref_reports_list_reference() {
        let t = FieldType::ListRef {
            target: "Role".into(),
        };
        assert!(t.is_list_reference());
        assert_eq!(t.reference_target(), Some("Role"));
    }

    #[test]
    fn scalar_types_are_not_references() {
        assert!(!FieldType::Text.is_reference());
        assert!(FieldType::Decimal.is_numeric());
        assert!(!FieldType::Text.is_numeric());
    }
}

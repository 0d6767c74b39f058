//! Field-level constraint validation: required, unique, max-length, pattern,
//! and type checks against a table's declared schema.
//!
//! Uniqueness is enforced by a linear scan of the table rather than a
//! separate index structure — the store has no secondary indexes, and the
//! scan mirrors how a small in-memory table is expected to be checked.

use crate::catalog::{FieldDef, FieldType, Schema};
use crate::error::{Error, FieldInvalidKind};
use crate::storage::Store;
use regex::Regex;
use relstore_proto::{RowId, TableRecord, Value};

/// Validates a row against its entity's schema before it is written.
pub struct ConstraintValidator<'a> {
    store: &'a Store,
}

impl<'a> ConstraintValidator<'a> {
    pub fn new(store: &'a Store) -> Self {
        Self { store }
    }

    /// Validate `record` against `schema` before storing it under `id`
    /// (the row's own id, excluded from the uniqueness scan so updates of
    /// an existing row don't conflict with themselves).
    pub fn validate(
        &self,
        schema: &Schema,
        id: Option<&RowId>,
        record: &TableRecord,
    ) -> Result<(), Error> {
        for field in &schema.entity.fields {
            // list<ref<T>> fields never live in the row itself — they are
            // backed entirely by the relationship table, synced separately.
            if field.field_type.is_list_reference() {
                continue;
            }
            // The id field is assigned by the store (explicitly or via
            // auto-increment), not supplied by the caller as an ordinary
            // value — skip it rather than demand callers pre-populate it.
            if field.name == schema.entity.id_field {
                continue;
            }
            self.validate_field(schema, field, id, record)?;
        }
        Ok(())
    }

    fn validate_field(
        &self,
        schema: &Schema,
        field: &FieldDef,
        id: Option<&RowId>,
        record: &TableRecord,
    ) -> Result<(), Error> {
        let value = record.get(&field.name).cloned().unwrap_or(Value::Null);

        if field.required && value.is_null() {
            return Err(Error::FieldInvalid {
                kind: FieldInvalidKind::Required,
                field: field.name.clone(),
                value: "null".to_string(),
            });
        }

        if value.is_null() {
            return Ok(());
        }

        self.check_type(field, &value)?;

        if let Some(max) = field.max_length {
            if let Value::Text(s) = &value {
                if s.chars().count() > max {
                    return Err(Error::FieldInvalid {
                        kind: FieldInvalidKind::Maximum,
                        field: field.name.clone(),
                        value: s.clone(),
                    });
                }
            }
        }

        if let Some(pattern) = &field.pattern {
            if let Value::Text(s) = &value {
                let re = Regex::new(pattern).map_err(|_| Error::FieldInvalid {
                    kind: FieldInvalidKind::Regexp,
                    field: field.name.clone(),
                    value: pattern.clone(),
                })?;
                if !re.is_match(s) {
                    return Err(Error::FieldInvalid {
                        kind: FieldInvalidKind::Regexp,
                        field: field.name.clone(),
                        value: s.clone(),
                    });
                }
            }
        }

        if field.unique {
            self.check_unique(schema, field, id, &value)?;
        }

        Ok(())
    }

    fn check_type(&self, field: &FieldDef, value: &Value) -> Result<(), Error> {
        let matches = match (&field.field_type, value) {
            (FieldType::Bool, Value::Bool(_)) => true,
            (FieldType::Int, Value::Int(_)) => true,
            (FieldType::Decimal, Value::Decimal(_)) => true,
            (FieldType::Float, Value::Float(_)) => true,
            (FieldType::Text, Value::Text(_)) => true,
            (FieldType::Timestamp, Value::Timestamp(_)) => true,
            (FieldType::TimeOfDay, Value::TimeOfDay(_)) => true,
            (FieldType::Bytes, Value::Bytes(_)) => true,
            (FieldType::Enum { variants, .. }, Value::Text(s)) => variants.contains(s),
            (FieldType::Ref { .. }, Value::Id(_)) => true,
            (FieldType::ListRef { .. }, Value::IdList(_)) => true,
            _ => false,
        };

        if matches {
            Ok(())
        } else {
            Err(Error::FieldInvalid {
                kind: FieldInvalidKind::Type,
                field: field.name.clone(),
                value: format!("{value:?}"),
            })
        }
    }

    fn check_unique(
        &self,
        schema: &Schema,
        field: &FieldDef,
        id: Option<&RowId>,
        value: &Value,
    ) -> Result<(), Error> {
        let table = schema.table_name();
        for (other_id, row) in self.store.entries(table) {
            if Some(&other_id) == id {
                continue;
            }
            if row.get(&field.name) == Some(value) {
                return Err(Error::FieldInvalid {
                    kind: FieldInvalidKind::Unique,
                    field: field.name.clone(),
                    value: format!("{value:?}"),
                });
            }
        }
        Ok(())
    }
}

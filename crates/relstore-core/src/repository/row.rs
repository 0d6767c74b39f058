//! Bridges a stored row to the condition engine's [`RowContext`], resolving
//! dotted paths across `ref<T>`/`list<ref<T>>` fields as the engine walks
//! them.

use crate::catalog::Catalog;
use crate::storage::Store;
use relstore_lang::{EvalError, RowContext};
use relstore_proto::{RowId, TableRecord, Value};

pub struct StoreRow<'a> {
    catalog: &'a Catalog,
    store: &'a Store,
    table: String,
    id: RowId,
    record: TableRecord,
}

impl<'a> StoreRow<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a Store, table: &str, id: RowId, record: &TableRecord) -> Self {
        Self {
            catalog,
            store,
            table: table.to_string(),
            id,
            record: record.clone(),
        }
    }
}

impl<'a> RowContext for StoreRow<'a> {
    fn id(&self) -> RowId {
        self.id.clone()
    }

    fn field(&self, name: &str) -> Result<Value, EvalError> {
        self.record
            .get(name)
            .cloned()
            .ok_or_else(|| EvalError::UnknownField {
                field: name.to_string(),
            })
    }

    fn resolve(&self, name: &str) -> Result<Vec<Box<dyn RowContext + '_>>, EvalError> {
        let schema = self
            .catalog
            .get(&self.table)
            .ok_or_else(|| EvalError::UnknownField {
                field: name.to_string(),
            })?;

        if let Some(fk) = schema.get_reference(name) {
            let Some(Value::Id(target_id)) = self.record.get(name) else {
                return Ok(Vec::new());
            };
            return match self.store.get(&fk.target_table, target_id) {
                Some(target_row) => Ok(vec![Box::new(StoreRow::new(
                    self.catalog,
                    self.store,
                    &fk.target_table,
                    target_id.clone(),
                    &target_row,
                )) as Box<dyn RowContext + '_>]),
                None => Ok(Vec::new()),
            };
        }

        if let Some(rel) = schema.get_relationship(name) {
            let own_id = self.id.clone();
            let mut rows = Vec::new();
            for (_rel_id, rel_row) in self.store.entries(&rel.rel_table) {
                let Some(Value::Id(source_id)) = rel_row.get(&rel.source_column) else {
                    continue;
                };
                if source_id != &own_id {
                    continue;
                }
                let Some(Value::Id(target_id)) = rel_row.get(&rel.target_column) else {
                    continue;
                };
                if let Some(target_row) = self.store.get(&rel.target_table, target_id) {
                    rows.push(Box::new(StoreRow::new(
                        self.catalog,
                        self.store,
                        &rel.target_table,
                        target_id.clone(),
                        &target_row,
                    )) as Box<dyn RowContext + '_>);
                }
            }
            return Ok(rows);
        }

        Err(EvalError::TypeMismatch {
            field: name.to_string(),
            expected: "reference field".to_string(),
            found: "non-reference field".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef, FieldType};

    #[test]
    fn resolve_follows_inline_reference() {
        let catalog = Catalog::new();
        catalog
            .register(EntityDef::new("Address", "id").with_field(FieldDef::new("id", FieldType::Int)).with_field(FieldDef::new("state", FieldType::Text)))
            .unwrap();
        catalog
            .register(
                EntityDef::new("User", "id")
                    .with_field(FieldDef::new("id", FieldType::Int))
                    .with_field(FieldDef::new("address", FieldType::Ref { target: "Address".into() })),
            )
            .unwrap();

        let store = Store::new();
        let mut address = TableRecord::new();
        address.set("state", Value::Text("NY".into()));
        store.put(&catalog, "Address", Some(RowId::Int(1)), address).unwrap();

        let mut user = TableRecord::new();
        user.set("address", Value::Id(RowId::Int(1)));

        let row = StoreRow::new(&catalog, &store, "User", RowId::Int(1), &user);
        let resolved = row.resolve("address").unwrap();
        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].field("state").unwrap(), Value::Text("NY".into()));
    }
}

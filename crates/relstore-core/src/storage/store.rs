//! The versioned table store: a named collection of [`Table`]s.
//!
//! Table creation is gated on the catalog — a write to a table with no
//! registered schema and no auto-derived relationship table fails with
//! [`Error::UnknownTable`].

use super::table::Table;
use crate::catalog::Catalog;
use crate::error::Error;
use parking_lot::RwLock;
use relstore_proto::{RowId, TableRecord};
use std::collections::HashMap;

/// A version snapshot of every table, captured when a transaction opens.
pub type VersionSnapshot = HashMap<String, u64>;

/// The in-memory, versioned table store.
pub struct Store {
    tables: RwLock<HashMap<String, Table>>,
}

impl Default for Store {
    fn default() -> Self {
        Self {
            tables: RwLock::new(HashMap::new()),
        }
    }
}

impl Store {
    pub fn new() -> Self {
        Self::default()
    }

    fn ensure_writable(&self, catalog: &Catalog, table: &str) -> Result<(), Error> {
        if catalog.get(table).is_some() || catalog.is_relationship_table(table) {
            Ok(())
        } else {
            Err(Error::UnknownTable {
                table: table.to_string(),
            })
        }
    }

    /// Store `record` under `id` in `table`, allocating an id if `id` is
    /// `None`. Fails with [`Error::UnknownTable`] unless the table has a
    /// registered schema or is an auto-created relationship table. For a
    /// registered entity, the allocated id is written back into the record
    /// under its declared id field (relationship-table rows, which have no
    /// entity schema, are left as given).
    pub fn put(
        &self,
        catalog: &Catalog,
        table: &str,
        id: Option<RowId>,
        record: TableRecord,
    ) -> Result<(RowId, u64), Error> {
        self.ensure_writable(catalog, table)?;
        let id_field = catalog.get(table).map(|s| s.entity.id_field.clone());
        let mut tables = self.tables.write();
        let entry = tables.entry(table.to_string()).or_default();
        Ok(entry.put(id, id_field.as_deref(), record))
    }

    pub fn get(&self, table: &str, id: &RowId) -> Option<TableRecord> {
        self.tables.read().get(table).and_then(|t| t.get(id).cloned())
    }

    pub fn entries(&self, table: &str) -> Vec<(RowId, TableRecord)> {
        self.tables
            .read()
            .get(table)
            .map(|t| t.entries().map(|(id, r)| (id.clone(), r.clone())).collect())
            .unwrap_or_default()
    }

    pub fn len(&self, table: &str) -> usize {
        self.tables.read().get(table).map(|t| t.len()).unwrap_or(0)
    }

    /// Remove a row. Referential-integrity checks are the caller's
    /// responsibility (the relationship resolver); the store itself never
    /// refuses a delete.
    pub fn delete(&self, table: &str, id: &RowId) -> Option<TableRecord> {
        self.tables.write().get_mut(table).and_then(|t| t.delete(id))
    }

    /// Current version of every table that has been written to.
    pub fn versions(&self) -> VersionSnapshot {
        self.tables
            .read()
            .iter()
            .map(|(name, table)| (name.clone(), table.version()))
            .collect()
    }

    /// Fold history up to (and including) each table's snapshot version —
    /// called once no open transaction can roll back past that point.
    pub fn consolidate(&self, snapshot: &VersionSnapshot) {
        let mut tables = self.tables.write();
        for (name, version) in snapshot {
            if let Some(table) = tables.get_mut(name) {
                table.consolidate(*version);
            }
        }
    }

    /// Restore every named table to its snapshot version, discarding any
    /// writes made since.
    pub fn rollback(&self, snapshot: &VersionSnapshot) {
        let mut tables = self.tables.write();
        for (name, version) in snapshot {
            if let Some(table) = tables.get_mut(name) {
                table.rollback(*version);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef, FieldType};
    use relstore_proto::Value;

    fn catalog_with_user() -> Catalog {
        let catalog = Catalog::new();
        catalog
            .register(EntityDef::new("User", "id").with_field(FieldDef::new("id", FieldType::Int)))
            .unwrap();
        catalog
    }

    fn record(email: &str) -> TableRecord {
        let mut r = TableRecord::new();
        r.set("email", Value::Text(email.to_string()));
        r
    }

    #[test]
    fn put_fails_for_unregistered_table() {
        let store = Store::new();
        let catalog = Catalog::new();
        let err = store.put(&catalog, "Ghost", None, record("a@x.com")).unwrap_err();
        assert!(matches!(err, Error::UnknownTable { table } if table == "Ghost"));
    }

    #[test]
    fn put_and_get_roundtrip() {
        let store = Store::new();
        let catalog = catalog_with_user();
        let (id, _) = store.put(&catalog, "User", None, record("a@x.com")).unwrap();
        let row = store.get("User", &id).unwrap();
        assert_eq!(row.get("email"), Some(&Value::Text("a@x.com".into())));
    }

    #[test]
    fn rollback_uses_store_wide_snapshot() {
        let store = Store::new();
        let catalog = catalog_with_user();
        let (id, _) = store.put(&catalog, "User", None, record("a@x.com")).unwrap();
        let snapshot = store.versions();
        store.put(&catalog, "User", Some(id.clone()), record("b@x.com")).unwrap();
        store.rollback(&snapshot);
        assert_eq!(store.get("User", &id).unwrap().get("email"), Some(&Value::Text("a@x.com".into())));
    }
}

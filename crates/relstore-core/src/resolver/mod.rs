//! Relationship resolver: materializes `ref<T>` and `list<ref<T>>` fields on
//! read, and cascades nested stores and relationship-table rows on write.

use crate::catalog::Catalog;
use crate::error::Error;
use crate::storage::Store;
use relstore_proto::{RowId, TableRecord, Value};
use std::collections::HashSet;

/// Controls how deep `ref<T>`/`list<ref<T>>` fields are materialized on read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolutionRules {
    /// Materialize inline `ref<T>` fields one level deep; leave
    /// `list<ref<T>>` fields as bare identifier lists.
    Shallow,
    /// Materialize both `ref<T>` and `list<ref<T>>` fields, recursing into
    /// every nested entity's own references.
    EagerAll,
}

impl Default for ResolutionRules {
    fn default() -> Self {
        ResolutionRules::Shallow
    }
}

/// Resolves and cascades relationships for a single catalog + store pair.
pub struct Resolver<'a> {
    catalog: &'a Catalog,
    store: &'a Store,
}

impl<'a> Resolver<'a> {
    pub fn new(catalog: &'a Catalog, store: &'a Store) -> Self {
        Self { catalog, store }
    }

    /// Materialize the reference fields of `record` (whose entity is
    /// `table`) per `rules`, recursing through nested entities' own schemas.
    pub fn resolve(
        &self,
        table: &str,
        record: &TableRecord,
        rules: ResolutionRules,
    ) -> Result<TableRecord, Error> {
        self.resolve_with_seen(table, record, rules, &mut HashSet::new())
    }

    fn resolve_with_seen(
        &self,
        table: &str,
        record: &TableRecord,
        rules: ResolutionRules,
        seen: &mut HashSet<(String, String)>,
    ) -> Result<TableRecord, Error> {
        let schema = self
            .catalog
            .get(table)
            .ok_or_else(|| Error::UnknownTable {
                table: table.to_string(),
            })?;

        let mut resolved = record.clone();

        for field in schema.entity.reference_fields() {
            let Some(Value::Id(target_id)) = record.get(&field.name).cloned() else {
                continue;
            };
            let fk = schema.get_reference(&field.name).expect("derived reference");
            let key = (fk.target_table.clone(), target_id.to_string());
            if seen.contains(&key) {
                continue;
            }
            if let Some(target_row) = self.store.get(&fk.target_table, &target_id) {
                seen.insert(key);
                let nested = if self.catalog.get(&fk.target_table).map_or(false, |s| {
                    !s.references.is_empty() || !s.relationships.is_empty()
                }) {
                    self.resolve_with_seen(&fk.target_table, &target_row, rules, seen)?
                } else {
                    target_row
                };
                resolved.set(field.name.clone(), Value::Record(Box::new(nested)));
            }
            // Dangling reference: leave the bare id in place, observable rather than elided.
        }

        if rules == ResolutionRules::EagerAll {
            for field in schema.entity.list_reference_fields() {
                let rel = schema
                    .get_relationship(&field.name)
                    .expect("derived relationship");
                let own_id = match record.get(&schema.entity.id_field) {
                    Some(Value::Id(id)) => id.clone(),
                    _ => continue,
                };
                let mut targets = Vec::new();
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
                    match self.store.get(&rel.target_table, target_id) {
                        Some(target_row) => {
                            let nested = self.resolve_with_seen(
                                &rel.target_table,
                                &target_row,
                                rules,
                                seen,
                            )?;
                            targets.push(nested);
                        }
                        None => {
                            // Dangling member of the relationship table: represent
                            // as a bare-id row so the caller can still see it.
                            let mut bare = TableRecord::new();
                            bare.set(
                                self.catalog
                                    .get(&rel.target_table)
                                    .map(|s| s.entity.id_field.clone())
                                    .unwrap_or_else(|| "id".to_string()),
                                Value::Id(target_id.clone()),
                            );
                            targets.push(bare);
                        }
                    }
                }
                resolved.set(field.name.clone(), Value::RecordList(targets));
            }
        }

        Ok(resolved)
    }

    /// Fail with [`Error::DeleteConstraint`] if any other table still holds
    /// a foreign key pointing at `(table, id)`.
    pub fn check_delete_allowed(&self, table: &str, id: &RowId) -> Result<(), Error> {
        for (source_table, fk) in self.catalog.references_to(table) {
            for (source_id, row) in self.store.entries(&source_table) {
                if row.get(&fk.field) == Some(&Value::Id(id.clone())) {
                    return Err(Error::DeleteConstraint {
                        source_table,
                        source_id: source_id.to_string(),
                        field: fk.field.clone(),
                        target_id: id.to_string(),
                    });
                }
            }
        }
        Ok(())
    }

    /// Rows `(table, id)` owns: the entities its own `ref<T>` fields point
    /// at (recursed into further by the caller), and the relationship-table
    /// join rows its `list<ref<T>>` fields created (leaves — not recursed
    /// into the entities they link to). Used by cascade delete alongside
    /// [`Resolver::dependents`] so deleting an entity also cleans up what it
    /// owns, not just what points at it.
    pub fn owned(&self, table: &str, id: &RowId) -> Vec<(String, RowId)> {
        let mut out = Vec::new();
        let Some(schema) = self.catalog.get(table) else {
            return out;
        };
        let Some(record) = self.store.get(table, id) else {
            return out;
        };

        for field in schema.entity.reference_fields() {
            if let Some(Value::Id(target_id)) = record.get(&field.name) {
                if let Some(fk) = schema.get_reference(&field.name) {
                    out.push((fk.target_table.clone(), target_id.clone()));
                }
            }
        }

        for field in schema.entity.list_reference_fields() {
            let Some(rel) = schema.get_relationship(&field.name) else {
                continue;
            };
            for (rel_id, rel_row) in self.store.entries(&rel.rel_table) {
                if rel_row.get(&rel.source_column) == Some(&Value::Id(id.clone())) {
                    out.push((rel.rel_table.clone(), rel_id));
                }
            }
        }

        out
    }

    /// Every row (across every table) that holds a foreign key or
    /// relationship-table entry pointing at `(table, id)` — used by cascade
    /// delete to find what must also be removed.
    pub fn dependents(&self, table: &str, id: &RowId) -> Vec<(String, RowId)> {
        let mut found = Vec::new();
        for (source_table, fk) in self.catalog.references_to(table) {
            for (source_id, row) in self.store.entries(&source_table) {
                if row.get(&fk.field) == Some(&Value::Id(id.clone())) {
                    found.push((source_table.clone(), source_id));
                }
            }
        }
        for rel in self.catalog.relationships_touching(table) {
            if rel.target_table != table {
                continue;
            }
            for (rel_id, row) in self.store.entries(&rel.rel_table) {
                if row.get(&rel.target_column) == Some(&Value::Id(id.clone())) {
                    found.push((rel.rel_table.clone(), rel_id));
                }
            }
        }
        found
    }
}

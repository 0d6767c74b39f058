//! Entity repository: the public read/write surface over a catalog, store,
//! and transaction coordinator. Backend-agnostic in the sense described by
//! the adapter contract — this in-memory store is one implementation of it.

mod row;

pub use row::StoreRow;

use crate::catalog::Catalog;
use crate::error::{Error, FieldInvalidKind};
use crate::constraint::ConstraintValidator;
use crate::resolver::{ResolutionRules, Resolver};
use crate::txn::Coordinator;
use parking_lot::RwLock;
use relstore_lang::{evaluate, parse, Expr, Params};
use relstore_proto::{RowId, TableRecord, Value};
use std::collections::HashMap;
use std::sync::Arc;

/// Caches parsed condition ASTs by their source text.
#[derive(Default)]
struct QueryCache {
    cache: RwLock<HashMap<String, Expr>>,
}

impl QueryCache {
    fn parse(&self, text: &str) -> Result<Expr, Error> {
        if let Some(expr) = self.cache.read().get(text) {
            return Ok(expr.clone());
        }
        let expr = parse(text)?;
        self.cache.write().insert(text.to_string(), expr.clone());
        Ok(expr)
    }
}

/// The entity repository.
pub struct EntityRepository {
    catalog: Arc<Catalog>,
    coordinator: Arc<Coordinator>,
    query_cache: QueryCache,
}

impl EntityRepository {
    pub fn new(catalog: Arc<Catalog>, coordinator: Arc<Coordinator>) -> Self {
        Self {
            catalog,
            coordinator,
            query_cache: QueryCache::default(),
        }
    }

    fn schema(&self, table: &str) -> Result<crate::catalog::Schema, Error> {
        self.catalog.get(table).ok_or_else(|| Error::UnknownTable {
            table: table.to_string(),
        })
    }

    pub fn select_by_id(
        &self,
        table: &str,
        id: &RowId,
        rules: ResolutionRules,
    ) -> Result<Option<TableRecord>, Error> {
        self.schema(table)?;
        let Some(record) = self.coordinator.store().get(table, id) else {
            return Ok(None);
        };
        let resolver = Resolver::new(&self.catalog, self.coordinator.store());
        Ok(Some(resolver.resolve(table, &record, rules)?))
    }

    pub fn select(
        &self,
        table: &str,
        matcher: &Expr,
        params: &Params,
        rules: ResolutionRules,
    ) -> Result<Vec<TableRecord>, Error> {
        self.schema(table)?;
        let resolver = Resolver::new(&self.catalog, self.coordinator.store());
        let mut out = Vec::new();
        for (id, record) in self.coordinator.store().entries(table) {
            let row = StoreRow::new(&self.catalog, self.coordinator.store(), table, id, &record);
            if evaluate(matcher, &row, params)? {
                out.push(resolver.resolve(table, &record, rules)?);
            }
        }
        Ok(out)
    }

    pub fn select_by_query(
        &self,
        table: &str,
        text: &str,
        params: &Params,
        rules: ResolutionRules,
    ) -> Result<Vec<TableRecord>, Error> {
        let expr = self.query_cache.parse(text)?;
        self.select(table, &expr, params, rules)
    }

    pub fn count(&self, table: &str, matcher: Option<(&Expr, &Params)>) -> Result<usize, Error> {
        self.schema(table)?;
        match matcher {
            None => Ok(self.coordinator.store().len(table)),
            Some((expr, params)) => {
                let mut n = 0;
                for (id, record) in self.coordinator.store().entries(table) {
                    let row =
                        StoreRow::new(&self.catalog, self.coordinator.store(), table, id, &record);
                    if evaluate(expr, &row, params)? {
                        n += 1;
                    }
                }
                Ok(n)
            }
        }
    }

    pub fn length(&self, table: &str) -> usize {
        self.coordinator.store().len(table)
    }

    pub fn exists_id(&self, table: &str, id: &RowId) -> bool {
        self.coordinator.store().get(table, id).is_some()
    }

    /// Render a resolved record in the external JSON format (§6): the same
    /// formatter `EntityReference`/`EntityReferenceList` use for their
    /// embedded entities, so the two can never disagree.
    pub fn to_json(&self, record: &TableRecord) -> serde_json::Value {
        record.to_canonical_json()
    }

    /// Store `record`, allocating an id if absent. Any nested unstored
    /// entity in a `ref<T>`/`list<ref<T>>` field is stored first,
    /// depth-first, and relationship-table rows for list-of-reference
    /// fields are diffed against the row's previous set.
    pub fn store(&self, table: &str, id: Option<RowId>, mut record: TableRecord) -> Result<RowId, Error> {
        let schema = self.schema(table)?;

        for field in schema.entity.reference_fields() {
            if let Some(Value::Record(nested)) = record.get(&field.name).cloned() {
                let fk = schema.get_reference(&field.name).unwrap();
                let nested_id = self.store(&fk.target_table, None, *nested)?;
                record.set(field.name.clone(), Value::Id(nested_id));
            }
        }

        let list_ref_updates: Vec<(String, Vec<RowId>)> = {
            let mut updates = Vec::new();
            for field in schema.entity.list_reference_fields() {
                if let Some(value) = record.get(&field.name).cloned() {
                    let ids = match value {
                        Value::RecordList(records) => {
                            let fk_target = schema.get_relationship(&field.name).unwrap().target_table.clone();
                            let mut ids = Vec::new();
                            for nested in records {
                                ids.push(self.store(&fk_target, None, nested)?);
                            }
                            ids
                        }
                        Value::IdList(ids) => ids,
                        _ => continue,
                    };
                    updates.push((field.name.clone(), ids));
                    record.remove(&field.name);
                }
            }
            updates
        };

        let store = self.coordinator.store();
        let validator = ConstraintValidator::new(store);
        validator.validate(&schema, id.as_ref(), &record)?;

        let row_id = self.coordinator.auto_commit(|tx| {
            let (row_id, _) = tx.put(table, &self.catalog, id.clone(), record.clone())?;
            Ok(row_id)
        })?;

        for (field_name, target_ids) in list_ref_updates {
            self.sync_relationship_rows(&schema, &field_name, &row_id, &target_ids)?;
        }

        tracing::debug!(table, id = %row_id, "entity stored");
        Ok(row_id)
    }

    /// Reconstruct and store an entity from an external (JSON-shaped)
    /// field map: nested sub-entities given inline are stored recursively;
    /// given as bare ids they are used as-is.
    pub fn store_from_json(
        &self,
        table: &str,
        json: &serde_json::Map<String, serde_json::Value>,
    ) -> Result<RowId, Error> {
        let schema = self.schema(table)?;
        let mut record = TableRecord::new();

        for field in &schema.entity.fields {
            let Some(raw) = lookup_field(json, &field.name) else {
                continue;
            };
            let value = self.json_to_value(field, raw)?;
            record.set(field.name.clone(), value);
        }

        let id = record.get(&schema.entity.id_field).and_then(|v| v.as_id().cloned());
        self.store(table, id, record)
    }

    fn json_to_value(
        &self,
        field: &crate::catalog::FieldDef,
        raw: &serde_json::Value,
    ) -> Result<Value, Error> {
        use crate::catalog::FieldType;
        if raw.is_null() {
            return Ok(Value::Null);
        }
        match &field.field_type {
            FieldType::Bool => Ok(Value::Bool(raw.as_bool().unwrap_or_default())),
            FieldType::Int => Ok(Value::Int(raw.as_i64().unwrap_or_default())),
            FieldType::Float => Ok(Value::Float(raw.as_f64().unwrap_or_default())),
            FieldType::Decimal => raw
                .as_str()
                .and_then(|s| s.parse().ok())
                .map(Value::Decimal)
                .ok_or_else(|| Error::TypeMismatch {
                    expected: "decimal string".into(),
                    found: raw.to_string(),
                }),
            FieldType::Text | FieldType::Enum { .. } => {
                Ok(Value::Text(raw.as_str().unwrap_or_default().to_string()))
            }
            FieldType::Timestamp => Ok(Value::Timestamp(raw.as_i64().unwrap_or_default())),
            FieldType::TimeOfDay => raw
                .as_str()
                .and_then(|s| chrono::NaiveTime::parse_from_str(s, "%H:%M:%S").ok())
                .map(Value::TimeOfDay)
                .ok_or_else(|| Error::TypeMismatch {
                    expected: "HH:MM:SS".into(),
                    found: raw.to_string(),
                }),
            FieldType::Bytes => Ok(Value::Bytes(raw.as_str().unwrap_or_default().as_bytes().to_vec())),
            FieldType::Ref { target } => {
                if let Some(obj) = raw.as_object() {
                    let nested_id = self.store_from_json(target, obj)?;
                    Ok(Value::Id(nested_id))
                } else {
                    Ok(Value::Id(json_scalar_to_row_id(raw)))
                }
            }
            FieldType::ListRef { target } => {
                let arr = raw.as_array().cloned().unwrap_or_default();
                let mut ids = Vec::new();
                for item in arr {
                    if let Some(obj) = item.as_object() {
                        ids.push(self.store_from_json(target, obj)?);
                    } else {
                        ids.push(json_scalar_to_row_id(&item));
                    }
                }
                Ok(Value::IdList(ids))
            }
        }
    }

    /// Diff `target_ids` against the relationship table's current rows for
    /// `source_id`, inserting new rows and deleting removed ones.
    /// Duplicate rows (same source + target) are deduplicated by reusing
    /// the existing row rather than inserting a second one.
    fn sync_relationship_rows(
        &self,
        schema: &crate::catalog::Schema,
        field_name: &str,
        source_id: &RowId,
        target_ids: &[RowId],
    ) -> Result<(), Error> {
        let rel = schema.get_relationship(field_name).unwrap();
        let store = self.coordinator.store();

        let existing: Vec<(RowId, RowId)> = store
            .entries(&rel.rel_table)
            .into_iter()
            .filter_map(|(rel_id, row)| {
                let Some(Value::Id(src)) = row.get(&rel.source_column) else {
                    return None;
                };
                if src != source_id {
                    return None;
                }
                let Some(Value::Id(target)) = row.get(&rel.target_column) else {
                    return None;
                };
                Some((rel_id, target.clone()))
            })
            .collect();

        let wanted: std::collections::HashSet<&RowId> = target_ids.iter().collect();
        let had: std::collections::HashSet<&RowId> = existing.iter().map(|(_, t)| t).collect();

        for (rel_id, target) in &existing {
            if !wanted.contains(target) {
                store.delete(&rel.rel_table, rel_id);
            }
        }

        for target in target_ids {
            if had.contains(target) {
                continue;
            }
            let mut row = TableRecord::new();
            row.set(rel.source_column.clone(), Value::Id(source_id.clone()));
            row.set(rel.target_column.clone(), Value::Id(target.clone()));
            self.coordinator.auto_commit(|tx| {
                tx.put(&rel.rel_table, &self.catalog, None, row.clone())?;
                Ok(())
            })?;
        }

        Ok(())
    }

    /// Delete every row matching `matcher`, failing with
    /// [`Error::DeleteConstraint`] if any is still referenced.
    pub fn delete(&self, table: &str, matcher: &Expr, params: &Params) -> Result<Vec<TableRecord>, Error> {
        self.schema(table)?;
        let resolver = Resolver::new(&self.catalog, self.coordinator.store());
        let matches: Vec<(RowId, TableRecord)> = self
            .coordinator
            .store()
            .entries(table)
            .into_iter()
            .filter(|(id, record)| {
                let row = StoreRow::new(&self.catalog, self.coordinator.store(), table, id.clone(), record);
                evaluate(matcher, &row, params).unwrap_or(false)
            })
            .collect();

        for (id, _) in &matches {
            resolver.check_delete_allowed(table, id)?;
        }

        let mut deleted = Vec::new();
        for (id, _) in &matches {
            if let Some(row) = self.coordinator.store().delete(table, id) {
                deleted.push(row);
            }
        }
        tracing::debug!(table, count = deleted.len(), "rows deleted");
        Ok(deleted)
    }

    /// Delete `(table, id)` and every row transitively connected to it,
    /// inside a single transaction: rows that reference it (via
    /// [`Resolver::dependents`]) and rows it owns in turn — its own
    /// `ref<T>` targets and `list<ref<T>>` join rows (via [`Resolver::owned`]).
    /// Aborts (and returns the error) if a cycle is detected or a dependent
    /// is blocked by a reference outside the cascading set.
    pub fn delete_entity_cascade(&self, table: &str, id: &RowId) -> Result<Vec<TableRecord>, Error> {
        self.schema(table)?;
        let tx_id = self.coordinator.open();
        let result = self.coordinator.execute(tx_id, |tx| {
            let mut to_delete = vec![(table.to_string(), id.clone())];
            let mut seen = std::collections::HashSet::new();
            let mut frontier = vec![(table.to_string(), id.clone())];

            while let Some((t, i)) = frontier.pop() {
                if !seen.insert((t.clone(), i.to_string())) {
                    continue;
                }
                let resolver = Resolver::new(&self.catalog, self.coordinator.store());
                let mut deps = resolver.dependents(&t, &i);
                deps.extend(resolver.owned(&t, &i));
                for dep in deps {
                    if seen.contains(&(dep.0.clone(), dep.1.to_string())) {
                        continue;
                    }
                    to_delete.push(dep.clone());
                    frontier.push(dep);
                }
            }

            // Delete leaves first: relationship-table rows, then entities
            // furthest from the root.
            let mut removed = Vec::new();
            for (t, i) in to_delete.iter().rev() {
                if let Some(row) = tx.delete(t, i) {
                    removed.push(row);
                }
            }
            Ok(removed)
        });

        match result {
            Ok(removed) => {
                self.coordinator.commit(tx_id)?;
                tracing::debug!(table, id = %id, count = removed.len(), "cascade delete committed");
                Ok(removed)
            }
            Err(e) => Err(e),
        }
    }
}

fn lookup_field<'a>(
    json: &'a serde_json::Map<String, serde_json::Value>,
    name: &str,
) -> Option<&'a serde_json::Value> {
    if let Some(v) = json.get(name) {
        return Some(v);
    }
    let lower = name.to_lowercase();
    if let Some((_, v)) = json.iter().find(|(k, _)| k.to_lowercase() == lower) {
        return Some(v);
    }
    let simplified = simplify(name);
    json.iter()
        .find(|(k, _)| simplify(k) == simplified)
        .map(|(_, v)| v)
}

fn simplify(s: &str) -> String {
    s.chars()
        .filter(|c| c.is_ascii_alphanumeric())
        .flat_map(|c| c.to_lowercase())
        .collect()
}

fn json_scalar_to_row_id(value: &serde_json::Value) -> RowId {
    if let Some(n) = value.as_i64() {
        RowId::Int(n)
    } else {
        RowId::Text(value.as_str().unwrap_or_default().to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::{EntityDef, FieldDef, FieldType};
    use crate::storage::Store;
    use pretty_assertions::assert_eq;
    use relstore_lang::parse;

    fn repo() -> (Arc<Catalog>, EntityRepository) {
        let catalog = Arc::new(Catalog::new());
        catalog
            .register(
                EntityDef::new("Address", "id")
                    .with_field(FieldDef::new("id", FieldType::Int))
                    .with_field(FieldDef::new("state", FieldType::Text)),
            )
            .unwrap();
        catalog
            .register(
                EntityDef::new("User", "id")
                    .with_field(FieldDef::new("id", FieldType::Int))
                    .with_field(FieldDef::new("email", FieldType::Text).with_unique())
                    .with_field(FieldDef::new(
                        "address",
                        FieldType::Ref {
                            target: "Address".into(),
                        },
                    )),
            )
            .unwrap();

        let store = Arc::new(Store::new());
        let coordinator = Arc::new(Coordinator::new(store));
        (catalog.clone(), EntityRepository::new(catalog, coordinator))
    }

    #[test]
    fn store_then_select_by_id_resolves_reference() {
        let (_, repo) = repo();
        let mut address = TableRecord::new();
        address.set("state", Value::Text("NY".into()));
        let address_id = repo.store("Address", None, address).unwrap();

        let mut user = TableRecord::new();
        user.set("email", Value::Text("joe@x.com".into()));
        user.set("address", Value::Id(address_id));
        let user_id = repo.store("User", None, user).unwrap();

        let fetched = repo
            .select_by_id("User", &user_id, ResolutionRules::Shallow)
            .unwrap()
            .unwrap();
        assert!(matches!(fetched.get("address"), Some(Value::Record(_))));
    }

    #[test]
    fn duplicate_unique_email_fails_and_count_stays_one() {
        let (_, repo) = repo();
        let mut address = TableRecord::new();
        address.set("state", Value::Text("NY".into()));
        let address_id = repo.store("Address", None, address).unwrap();

        let mut user = TableRecord::new();
        user.set("email", Value::Text("joe@x.com".into()));
        user.set("address", Value::Id(address_id.clone()));
        repo.store("User", None, user).unwrap();

        let mut dup = TableRecord::new();
        dup.set("email", Value::Text("joe@x.com".into()));
        dup.set("address", Value::Id(address_id));
        let err = repo.store("User", None, dup).unwrap_err();
        assert!(matches!(
            err,
            Error::FieldInvalid {
                kind: FieldInvalidKind::Unique,
                ..
            }
        ));
        assert_eq!(repo.length("User"), 1);
    }

    #[test]
    fn delete_referenced_address_fails() {
        let (_, repo) = repo();
        let mut address = TableRecord::new();
        address.set("state", Value::Text("NY".into()));
        let address_id = repo.store("Address", None, address).unwrap();

        let mut user = TableRecord::new();
        user.set("email", Value::Text("joe@x.com".into()));
        user.set("address", Value::Id(address_id.clone()));
        repo.store("User", None, user).unwrap();

        let matcher = parse("#ID == ?").unwrap();
        let params = Params::new().with_positional(vec![Value::Id(address_id)]);
        let err = repo.delete("Address", &matcher, &params).unwrap_err();
        assert!(matches!(err, Error::DeleteConstraint { .. }));
    }

    #[test]
    fn store_from_json_then_to_json_round_trips_nested_reference() {
        let (_, repo) = repo();
        let user_json = serde_json::json!({
            "email": "joe@x.com",
            "address": { "state": "NY" },
        });
        let user_id = repo
            .store_from_json("User", user_json.as_object().unwrap())
            .unwrap();

        let fetched = repo
            .select_by_id("User", &user_id, ResolutionRules::Shallow)
            .unwrap()
            .unwrap();
        let json = repo.to_json(&fetched);
        assert_eq!(json["email"], serde_json::json!("joe@x.com"));
        assert_eq!(json["address"]["state"], serde_json::json!("NY"));
    }

    #[test]
    fn select_by_query_finds_matching_state() {
        let (_, repo) = repo();
        let mut address = TableRecord::new();
        address.set("state", Value::Text("NY".into()));
        repo.store("Address", None, address).unwrap();

        let results = repo
            .select_by_query("Address", "state == ?", &Params::new().with_positional(vec![Value::Text("NY".into())]), ResolutionRules::Shallow)
            .unwrap();
        assert_eq!(results.len(), 1);
    }
}

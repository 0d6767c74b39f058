//! A single versioned table: id-keyed rows plus an append-only snapshot
//! history used for transaction rollback.

use relstore_proto::{RowId, TableRecord, Value};
use std::collections::{BTreeMap, HashMap};

/// One table's rows at the current version, plus every prior version's
/// full snapshot so a transaction can be rolled back to the version it
/// opened at.
#[derive(Debug, Clone)]
pub struct Table {
    version: u64,
    next_id: i64,
    current: HashMap<RowId, TableRecord>,
    history: BTreeMap<u64, HashMap<RowId, TableRecord>>,
}

impl Default for Table {
    fn default() -> Self {
        let mut history = BTreeMap::new();
        history.insert(0, HashMap::new());
        Self {
            version: 0,
            next_id: 0,
            current: HashMap::new(),
            history,
        }
    }
}

impl Table {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn get(&self, id: &RowId) -> Option<&TableRecord> {
        self.current.get(id)
    }

    pub fn entries(&self) -> impl Iterator<Item = (&RowId, &TableRecord)> {
        self.current.iter()
    }

    pub fn len(&self) -> usize {
        self.current.len()
    }

    pub fn is_empty(&self) -> bool {
        self.current.is_empty()
    }

    /// Store `record` under `id`, allocating an id when `id` is `None`.
    /// When `id_field` names the entity's id field, the allocated id is
    /// written back into `record` under that field — a stored row always
    /// carries its own id as an ordinary value, which `list<ref<T>>`
    /// resolution depends on to find the relationship rows pointing back at
    /// it. Returns the id used and the new table version.
    pub fn put(&mut self, id: Option<RowId>, id_field: Option<&str>, mut record: TableRecord) -> (RowId, u64) {
        let id = match id {
            Some(RowId::Int(n)) => {
                // An explicit id past the counter resets allocation, so the
                // next auto-assigned id never collides with a caller-chosen one.
                self.next_id = self.next_id.max(n + 1);
                RowId::Int(n)
            }
            Some(id) => id,
            None => {
                if self.next_id == 0 {
                    self.seed_next_id();
                }
                let id = self.next_id;
                self.next_id += 1;
                RowId::Int(id)
            }
        };
        if let Some(field) = id_field {
            record.set(field.to_string(), Value::Id(id.clone()));
        }
        self.current.insert(id.clone(), record);
        self.snapshot();
        (id, self.version)
    }

    /// Remove a row, returning it if it existed, and bump the version
    /// regardless (deletion of an absent row is a no-op version bump, kept
    /// simple since callers check existence before calling this).
    pub fn delete(&mut self, id: &RowId) -> Option<TableRecord> {
        let removed = self.current.remove(id);
        if removed.is_some() {
            self.snapshot();
        }
        removed
    }

    fn seed_next_id(&mut self) {
        let max = self
            .current
            .keys()
            .filter_map(|id| match id {
                RowId::Int(n) => Some(*n),
                RowId::Text(_) => None,
            })
            .max();
        self.next_id = max.map(|n| n + 1).unwrap_or(1);
    }

    fn snapshot(&mut self) {
        self.version += 1;
        self.history.insert(self.version, self.current.clone());
    }

    /// Drop history strictly older than `upto` — those versions can no
    /// longer be rolled back to once the enclosing transaction has
    /// committed past them.
    pub fn consolidate(&mut self, upto: u64) {
        self.history.retain(|&v, _| v >= upto);
    }

    /// Restore the table to the state it had at `version`, discarding every
    /// later version's history.
    pub fn rollback(&mut self, version: u64) {
        if let Some(snapshot) = self.history.get(&version) {
            self.current = snapshot.clone();
        }
        self.history.retain(|&v, _| v <= version);
        self.version = version;
    }
}

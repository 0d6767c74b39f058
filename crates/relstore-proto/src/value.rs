//! Runtime value types held in a table row.

use std::collections::HashMap;
use std::fmt;

use chrono::NaiveTime;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

/// The identifier of a row within a table.
///
/// Most tables allocate a monotonically increasing integer id. A table whose
/// primary key is a content hash (e.g. a blob keyed by its digest) instead
/// carries a caller-supplied textual id; the two are never comparable to
/// each other.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RowId {
    Int(i64),
    Text(String),
}

impl fmt::Display for RowId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RowId::Int(i) => write!(f, "{i}"),
            RowId::Text(s) => write!(f, "{s}"),
        }
    }
}

impl RowId {
    /// Render as a bare JSON scalar (number or string), matching how an
    /// identifier is embedded inline rather than wrapped.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        match self {
            RowId::Int(i) => serde_json::json!(i),
            RowId::Text(s) => serde_json::Value::String(s.clone()),
        }
    }
}

impl From<i64> for RowId {
    fn from(v: i64) -> Self {
        RowId::Int(v)
    }
}

impl From<String> for RowId {
    fn from(v: String) -> Self {
        RowId::Text(v)
    }
}

impl From<&str> for RowId {
    fn from(v: &str) -> Self {
        RowId::Text(v.to_string())
    }
}

/// A runtime value held in a single field of a [`TableRecord`].
///
/// This is the tagged union named by the data model: a row is a map from
/// field name to `Value`, never a loosely-typed `dynamic`. `RecordList`
/// nests `TableRecord`s directly; since this crate serializes through serde
/// rather than a zero-copy format, the recursion is unproblematic.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value")]
pub enum Value {
    Null,
    Bool(bool),
    Int(i64),
    Decimal(Decimal),
    Float(f64),
    Text(String),
    /// Milliseconds since the Unix epoch.
    Timestamp(i64),
    TimeOfDay(NaiveTime),
    Bytes(Vec<u8>),
    Id(RowId),
    IdList(Vec<RowId>),
    /// A materialized `ref<T>` field: the target row, substituted in place
    /// of its identifier by the relationship resolver.
    Record(Box<TableRecord>),
    /// A materialized `list<ref<T>>` field under eager resolution rules.
    RecordList(Vec<TableRecord>),
}

impl Value {
    pub fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    pub fn is_list(&self) -> bool {
        matches!(self, Value::IdList(_) | Value::RecordList(_))
    }

    pub fn as_id(&self) -> Option<&RowId> {
        match self {
            Value::Id(id) => Some(id),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(b) => Some(*b),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(i) => Some(*i),
            _ => None,
        }
    }

    /// Elements of a list-valued field, as a vector of values for iteration.
    ///
    /// A non-list value is treated as a single-element list, matching the
    /// "existential over some element" semantics the condition engine needs
    /// for both real list fields and scalars used in list position.
    pub fn iter_elements(&self) -> Vec<Value> {
        match self {
            Value::IdList(ids) => ids.iter().cloned().map(Value::Id).collect(),
            other => vec![other.clone()],
        }
    }

    /// Render this value in the external JSON format: enums and ids as
    /// plain strings/numbers, decimals as canonical strings, timestamps as
    /// milliseconds, times-of-day as `HH:MM:SS`, bytes as hex. No schema is
    /// needed — every distinction this format draws is already carried by
    /// the `Value` variant itself.
    pub fn to_canonical_json(&self) -> serde_json::Value {
        match self {
            Value::Null => serde_json::Value::Null,
            Value::Bool(b) => serde_json::Value::Bool(*b),
            Value::Int(i) => serde_json::json!(i),
            Value::Decimal(d) => serde_json::Value::String(d.to_string()),
            Value::Float(f) => serde_json::json!(f),
            Value::Text(s) => serde_json::Value::String(s.clone()),
            Value::Timestamp(ms) => serde_json::json!(ms),
            Value::TimeOfDay(t) => serde_json::Value::String(t.format("%H:%M:%S").to_string()),
            Value::Bytes(b) => serde_json::Value::String(hex::encode(b)),
            Value::Id(id) => id.to_canonical_json(),
            Value::IdList(ids) => {
                serde_json::Value::Array(ids.iter().map(RowId::to_canonical_json).collect())
            }
            Value::Record(r) => r.to_canonical_json(),
            Value::RecordList(rs) => {
                serde_json::Value::Array(rs.iter().map(TableRecord::to_canonical_json).collect())
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<RowId> for Value {
    fn from(v: RowId) -> Self {
        Value::Id(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(val) => val.into(),
            None => Value::Null,
        }
    }
}

/// An ordered mapping from field name to [`Value`].
///
/// The canonical field order for serialization comes from the entity's
/// schema, not from this map's internal order; `TableRecord` itself is a
/// plain lookup table.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TableRecord(HashMap<String, Value>);

impl TableRecord {
    pub fn new() -> Self {
        Self(HashMap::new())
    }

    pub fn get(&self, field: &str) -> Option<&Value> {
        self.0.get(field)
    }

    pub fn set(&mut self, field: impl Into<String>, value: Value) {
        self.0.insert(field.into(), value);
    }

    pub fn remove(&mut self, field: &str) -> Option<Value> {
        self.0.remove(field)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.0.iter()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Render as a JSON object keyed by field name, each value in canonical
    /// external form (see [`Value::to_canonical_json`]).
    pub fn to_canonical_json(&self) -> serde_json::Value {
        let map: serde_json::Map<String, serde_json::Value> = self
            .0
            .iter()
            .map(|(k, v)| (k.clone(), v.to_canonical_json()))
            .collect();
        serde_json::Value::Object(map)
    }
}

impl FromIterator<(String, Value)> for TableRecord {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

//! Evaluates a parsed [`Expr`] against a row, resolving relationships,
//! the `#ID` pseudo-field, and bound parameters along the way.

use std::cell::Cell;
use std::collections::HashMap;

use relstore_proto::{RowId, Value};

use crate::ast::{BoolOp, CompareOp, Expr, Literal, Path, ValueExpr};
use crate::error::EvalError;
use crate::span::Spanned;

/// The row-shaped data a condition is evaluated against.
///
/// A dotted path like `address.state` resolves one segment at a time:
/// every segment but the last calls [`RowContext::resolve`] to step across a
/// relationship, and the final segment calls [`RowContext::field`] to read a
/// scalar (or list) value. Implementors decide what "resolving a
/// relationship" means — a foreign key lookup, a join-table traversal, or
/// (in tests) a plain in-memory map.
pub trait RowContext {
    /// The row's own primary key, bound by the `#ID` pseudo-field.
    fn id(&self) -> RowId;

    /// Read a field's value. `UnknownField` if the row's schema has no such
    /// field at all.
    fn field(&self, name: &str) -> Result<Value, EvalError>;

    /// Step across a relationship field to the row(s) it refers to. A
    /// to-one relationship yields at most one row; a to-many relationship
    /// yields each related row. `UnknownField` if there's no such
    /// relationship.
    fn resolve(&self, name: &str) -> Result<Vec<Box<dyn RowContext + '_>>, EvalError>;
}

/// Bound parameters for `?` (positional) and `:name` (named) placeholders.
///
/// A single parameter map can serve both purposes: [`Params::from_map`]
/// populates only the named side, but nothing stops a caller from combining
/// [`Params::with_positional`] and [`Params::with_named`] on the same value.
#[derive(Debug, Default, Clone)]
pub struct Params {
    positional: Vec<Value>,
    named: HashMap<String, Value>,
}

impl Params {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_positional(mut self, values: Vec<Value>) -> Self {
        self.positional = values;
        self
    }

    pub fn with_named(mut self, named: HashMap<String, Value>) -> Self {
        self.named = named;
        self
    }

    pub fn from_map(named: HashMap<String, Value>) -> Self {
        Self::new().with_named(named)
    }

    fn positional_at(&self, index: usize) -> Result<&Value, EvalError> {
        self.positional
            .get(index)
            .ok_or(EvalError::MissingPositionalParameter { index })
    }

    fn named_get(&self, name: &str) -> Result<&Value, EvalError> {
        self.named
            .get(name)
            .ok_or_else(|| EvalError::MissingNamedParameter {
                name: name.to_string(),
            })
    }
}

enum Resolved {
    Scalar(Value),
    List(Vec<Value>),
}

/// Evaluate a parsed condition against a single row.
pub fn evaluate(expr: &Expr, row: &dyn RowContext, params: &Params) -> Result<bool, EvalError> {
    let positional_cursor = Cell::new(0usize);
    eval_expr(expr, row, params, &positional_cursor)
}

fn eval_expr(
    expr: &Expr,
    row: &dyn RowContext,
    params: &Params,
    cursor: &Cell<usize>,
) -> Result<bool, EvalError> {
    match expr {
        Expr::Comparison { path, op, value, .. } => {
            eval_comparison(path, *op, value, row, params, cursor)
        }
        Expr::Group { first, rest, .. } => {
            let mut acc = eval_expr(first, row, params, cursor)?;
            for (op, operand) in rest {
                let rhs = eval_expr(operand, row, params, cursor)?;
                acc = match op {
                    BoolOp::And => acc && rhs,
                    BoolOp::Or => acc || rhs,
                };
            }
            Ok(acc)
        }
    }
}

fn eval_comparison(
    path: &Path,
    op: CompareOp,
    value: &ValueExpr,
    row: &dyn RowContext,
    params: &Params,
    cursor: &Cell<usize>,
) -> Result<bool, EvalError> {
    let lhs = resolve_path(path, row)?;
    let rhs = resolve_value_expr(value, params, cursor)?;

    let result = match (op, &rhs) {
        (CompareOp::In, Resolved::List(items)) => lhs
            .iter()
            .any(|l| items.iter().any(|r| values_equal(l, r).unwrap_or(false))),
        (CompareOp::In, Resolved::Scalar(_)) => {
            return Err(type_mismatch(path, "list", "scalar"))
        }
        (CompareOp::Contains, Resolved::List(items)) => lhs
            .iter()
            .any(|l| items.iter().any(|r| values_equal(l, r).unwrap_or(false))),
        (CompareOp::Contains, Resolved::Scalar(r)) => {
            lhs.iter().any(|l| values_equal(l, r).unwrap_or(false))
        }
        (CompareOp::Eq, Resolved::Scalar(r)) => any_satisfies(&lhs, r, values_equal, path)?,
        (CompareOp::Ne, Resolved::Scalar(r)) => {
            any_satisfies(&lhs, r, |a, b| values_equal(a, b).map(|eq| !eq), path)?
        }
        (CompareOp::Lt, Resolved::Scalar(r)) => {
            any_satisfies(&lhs, r, |a, b| ordering(a, b, |o| o.is_lt()), path)?
        }
        (CompareOp::Le, Resolved::Scalar(r)) => {
            any_satisfies(&lhs, r, |a, b| ordering(a, b, |o| o.is_le()), path)?
        }
        (CompareOp::Gt, Resolved::Scalar(r)) => {
            any_satisfies(&lhs, r, |a, b| ordering(a, b, |o| o.is_gt()), path)?
        }
        (CompareOp::Ge, Resolved::Scalar(r)) => {
            any_satisfies(&lhs, r, |a, b| ordering(a, b, |o| o.is_ge()), path)?
        }
        (CompareOp::Eq | CompareOp::Ne | CompareOp::Lt | CompareOp::Le | CompareOp::Gt | CompareOp::Ge,
            Resolved::List(_)) => return Err(type_mismatch(path, "scalar", "list")),
    };

    Ok(result)
}

fn any_satisfies(
    lhs: &[Value],
    rhs: &Value,
    f: impl Fn(&Value, &Value) -> Result<bool, EvalError>,
    path: &Path,
) -> Result<bool, EvalError> {
    for l in lhs {
        match f(l, rhs) {
            Ok(true) => return Ok(true),
            Ok(false) => continue,
            Err(EvalError::TypeMismatch { expected, found, .. }) => {
                return Err(EvalError::TypeMismatch {
                    field: path_display(path),
                    expected,
                    found,
                })
            }
            Err(other) => return Err(other),
        }
    }
    Ok(false)
}

fn ordering(
    a: &Value,
    b: &Value,
    check: impl Fn(std::cmp::Ordering) -> bool,
) -> Result<bool, EvalError> {
    values_compare(a, b).map(check)
}

/// Resolve a path to its leaf values, expanding any list-valued field (real
/// `IdList`s, and relationship hops that yield more than one row) along the
/// way so comparisons act existentially: "some element matches".
fn resolve_path(path: &Path, row: &dyn RowContext) -> Result<Vec<Value>, EvalError> {
    if path.is_id_pseudo_field() {
        return Ok(vec![Value::Id(row.id())]);
    }
    resolve_segments(&path.segments, row)
}

fn resolve_segments(segments: &[Spanned<String>], row: &dyn RowContext) -> Result<Vec<Value>, EvalError> {
    if segments.len() == 1 {
        return Ok(row.field(&segments[0].value)?.iter_elements());
    }

    let head = &segments[0].value;
    let related = row.resolve(head)?;
    let mut out = Vec::new();
    for r in related {
        out.extend(resolve_segments(&segments[1..], r.as_ref())?);
    }
    Ok(out)
}

fn resolve_value_expr(
    value: &ValueExpr,
    params: &Params,
    cursor: &Cell<usize>,
) -> Result<Resolved, EvalError> {
    match value {
        ValueExpr::Positional(_) => {
            let index = cursor.get();
            cursor.set(index + 1);
            Ok(Resolved::Scalar(params.positional_at(index)?.clone()))
        }
        ValueExpr::Named(name) => Ok(Resolved::Scalar(params.named_get(&name.value)?.clone())),
        ValueExpr::Literal(lit) => Ok(Resolved::Scalar(literal_to_value(&lit.value))),
        ValueExpr::List(items, _) => Ok(Resolved::List(
            items.iter().map(|l| literal_to_value(&l.value)).collect(),
        )),
    }
}

fn literal_to_value(literal: &Literal) -> Value {
    match literal {
        Literal::Null => Value::Null,
        Literal::Bool(b) => Value::Bool(*b),
        Literal::Int(i) => Value::Int(*i),
        Literal::Float(f) => Value::Float(*f),
        Literal::String(s) => Value::Text(s.clone()),
    }
}

fn type_mismatch(path: &Path, expected: &str, found: &str) -> EvalError {
    EvalError::TypeMismatch {
        field: path_display(path),
        expected: expected.to_string(),
        found: found.to_string(),
    }
}

fn path_display(path: &Path) -> String {
    path.segments
        .iter()
        .map(|s| s.value.as_str())
        .collect::<Vec<_>>()
        .join(".")
}

fn type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Int(_) => "int",
        Value::Decimal(_) => "decimal",
        Value::Float(_) => "float",
        Value::Text(_) => "text",
        Value::Timestamp(_) => "timestamp",
        Value::TimeOfDay(_) => "time",
        Value::Bytes(_) => "binary",
        Value::Id(_) => "id",
        Value::IdList(_) => "id_list",
        Value::Record(_) => "record",
        Value::RecordList(_) => "record_list",
    }
}

fn values_equal(a: &Value, b: &Value) -> Result<bool, EvalError> {
    use Value::*;
    match (a, b) {
        (Null, Null) => Ok(true),
        (Null, _) | (_, Null) => Ok(false),
        (Bool(x), Bool(y)) => Ok(x == y),
        (Int(x), Int(y)) => Ok(x == y),
        (Int(x), Float(y)) | (Float(y), Int(x)) => Ok((*x as f64) == *y),
        (Float(x), Float(y)) => Ok(x == y),
        (Decimal(x), Decimal(y)) => Ok(x == y),
        (Text(x), Text(y)) => Ok(x == y),
        (Timestamp(x), Timestamp(y)) => Ok(x == y),
        (TimeOfDay(x), TimeOfDay(y)) => Ok(x == y),
        (Bytes(x), Bytes(y)) => Ok(x == y),
        (Id(x), Id(y)) => Ok(x == y),
        (IdList(x), IdList(y)) => Ok(x == y),
        _ => Err(EvalError::TypeMismatch {
            field: String::new(),
            expected: type_name(a).to_string(),
            found: type_name(b).to_string(),
        }),
    }
}

fn values_compare(a: &Value, b: &Value) -> Result<std::cmp::Ordering, EvalError> {
    use Value::*;
    match (a, b) {
        (Int(x), Int(y)) => Ok(x.cmp(y)),
        (Int(x), Float(y)) => (*x as f64)
            .partial_cmp(y)
            .ok_or_else(|| type_name_mismatch(a, b)),
        (Float(x), Int(y)) => x
            .partial_cmp(&(*y as f64))
            .ok_or_else(|| type_name_mismatch(a, b)),
        (Float(x), Float(y)) => x.partial_cmp(y).ok_or_else(|| type_name_mismatch(a, b)),
        (Decimal(x), Decimal(y)) => Ok(x.cmp(y)),
        (Text(x), Text(y)) => Ok(x.cmp(y)),
        (Timestamp(x), Timestamp(y)) => Ok(x.cmp(y)),
        (TimeOfDay(x), TimeOfDay(y)) => Ok(x.cmp(y)),
        _ => Err(type_name_mismatch(a, b)),
    }
}

fn type_name_mismatch(a: &Value, b: &Value) -> EvalError {
    EvalError::TypeMismatch {
        field: String::new(),
        expected: type_name(a).to_string(),
        found: type_name(b).to_string(),
    }
}

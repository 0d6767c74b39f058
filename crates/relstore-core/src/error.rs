//! Error taxonomy for the entity store.
//!
//! Every variant here is user-visible: it carries a stable `kind` (the
//! variant name itself) and, for field-level errors, the offending table and
//! field. Validation errors raised inside a transaction always abort it;
//! fetch-hook errors surface as [`Error::FetchFailed`] without aborting.

use thiserror::Error;

/// The kind of field-level validation that failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldInvalidKind {
    Unique,
    Required,
    Regexp,
    Maximum,
    Minimum,
    Type,
    Range,
}

impl std::fmt::Display for FieldInvalidKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            FieldInvalidKind::Unique => "unique",
            FieldInvalidKind::Required => "required",
            FieldInvalidKind::Regexp => "regexp",
            FieldInvalidKind::Maximum => "maximum",
            FieldInvalidKind::Minimum => "minimum",
            FieldInvalidKind::Type => "type",
            FieldInvalidKind::Range => "range",
        };
        write!(f, "{s}")
    }
}

/// Core database errors.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum Error {
    #[error("field '{field}' invalid ({kind}): {value}")]
    FieldInvalid {
        kind: FieldInvalidKind,
        field: String,
        value: String,
    },

    #[error("field not found: {field}")]
    FieldNotFound { field: String },

    #[error("delete constraint violated: {source_table}.#{source_id}.{field} -> #{target_id}")]
    DeleteConstraint {
        source_table: String,
        source_id: String,
        field: String,
        target_id: String,
    },

    #[error("unknown table: {table}")]
    UnknownTable { table: String },

    #[error("type mismatch: expected {expected}, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("condition parse error: {0}")]
    ConditionParseError(String),

    #[error("transaction aborted: {reason}")]
    TransactionAborted { reason: String },

    #[error("nested transaction")]
    NestedTransaction,

    #[error("pool timeout")]
    PoolTimeout,

    #[error("fetch failed: {0}")]
    FetchFailed(String),
}

impl From<relstore_lang::ParseError> for Error {
    fn from(e: relstore_lang::ParseError) -> Self {
        Error::ConditionParseError(e.message)
    }
}

impl From<relstore_lang::ConditionError> for Error {
    fn from(e: relstore_lang::ConditionError) -> Self {
        Error::ConditionParseError(e.to_string())
    }
}

impl From<relstore_lang::EvalError> for Error {
    fn from(e: relstore_lang::EvalError) -> Self {
        match e {
            relstore_lang::EvalError::UnknownField { field } => Error::FieldNotFound { field },
            other => Error::TypeMismatch {
                expected: "comparable value".to_string(),
                found: other.to_string(),
            },
        }
    }
}

impl From<relstore_proto::Error> for Error {
    fn from(e: relstore_proto::Error) -> Self {
        match e {
            relstore_proto::Error::TypeMismatch { expected, found } => {
                Error::TypeMismatch { expected, found }
            }
            relstore_proto::Error::InvalidLiteral { input, target } => Error::TypeMismatch {
                expected: target,
                found: input,
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn field_invalid_kind_displays_lowercase() {
        assert_eq!(FieldInvalidKind::Unique.to_string(), "unique");
        assert_eq!(FieldInvalidKind::Regexp.to_string(), "regexp");
    }

    #[test]
    fn condition_error_converts_from_eval_error() {
        let err: Error = relstore_lang::EvalError::UnknownField {
            field: "ghost".to_string(),
        }
        .into();
        assert_eq!(
            err,
            Error::FieldNotFound {
                field: "ghost".to_string()
            }
        );
    }
}

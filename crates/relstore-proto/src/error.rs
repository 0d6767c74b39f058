//! Value-level error types.

use thiserror::Error;

/// Errors raised while coercing or comparing raw [`crate::Value`]s, below
/// the level where a field name or table is known.
#[derive(Debug, Error, PartialEq)]
pub enum Error {
    #[error("expected a {expected} value, found {found}")]
    TypeMismatch { expected: String, found: String },

    #[error("cannot parse {input:?} as a {target} value")]
    InvalidLiteral { input: String, target: String },
}

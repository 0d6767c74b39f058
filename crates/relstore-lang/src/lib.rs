//! Condition language: the small boolean-expression grammar used to filter
//! rows throughout the engine.
//!
//! ```text
//! query := group
//! group := expr (('&&'|'||') expr)*
//! expr  := path op value | '(' group ')'
//! path  := ident ('.' ident)*
//! op    := '==' | '!=' | '=~' | '<' | '<=' | '>' | '>=' | 'IN'
//! value := '?' | ':' ident | literal
//! ```
//!
//! `#ID` is a reserved pseudo-field binding to a row's primary key.
//!
//! # Usage
//!
//! ```rust
//! use relstore_lang::parse;
//!
//! let expr = parse(r#"address.state == "NY" && age >= 18"#).unwrap();
//! ```
//!
//! Parsing produces an [`Expr`] tree; [`evaluate`] walks it against a
//! [`RowContext`] implementation, resolving relationship hops and bound
//! [`Params`] along the way.

pub mod ast;
pub mod error;
pub mod eval;
pub mod lexer;
pub mod parser;
pub mod span;

pub use ast::{BoolOp, CompareOp, Expr, Literal, Path, ValueExpr};
pub use error::{ConditionError, EvalError, ParseError};
pub use eval::{evaluate, Params, RowContext};
pub use span::{Span, Spanned};

/// Parse a condition-language source string into an [`Expr`].
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    parser::parse(source)
}

/// Parse and evaluate a condition against a row in one step.
pub fn parse_and_evaluate(
    source: &str,
    row: &dyn RowContext,
    params: &Params,
) -> Result<bool, ConditionError> {
    let expr = parse(source)?;
    Ok(evaluate(&expr, row, params)?)
}

/// Tokenize a source string (for debugging/testing).
pub fn tokenize(source: &str) -> Vec<lexer::SpannedToken> {
    lexer::tokenize(source)
}

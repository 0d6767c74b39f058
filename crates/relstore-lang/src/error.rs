//! Error types for parsing and evaluating conditions.

use crate::span::{offset_to_line_col, Span};
use thiserror::Error;

/// Error during lexing/parsing.
#[derive(Debug, Error, Clone, PartialEq)]
pub struct ParseError {
    pub message: String,
    pub span: Span,
    pub hint: Option<String>,
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl ParseError {
    pub fn new(message: impl Into<String>, span: Span) -> Self {
        Self {
            message: message.into(),
            span,
            hint: None,
        }
    }

    pub fn with_hint(mut self, hint: impl Into<String>) -> Self {
        self.hint = Some(hint.into());
        self
    }

    /// Format the error with source context, e.g.:
    /// ```text
    /// error: expected '==' but found '='
    ///   --> line 1:30
    ///    |
    ///   1| User.findMany().where(status = "active")
    ///    |                              ^
    /// ```
    pub fn format_with_source(&self, source: &str) -> String {
        let (line, col) = offset_to_line_col(source, self.span.start);
        let mut result = format!("error: {}\n", self.message);
        result.push_str(&format!("  --> line {}:{}\n", line, col));

        if let Some(source_line) = source.lines().nth(line - 1) {
            result.push_str(&format!("   |\n{:3}| {}\n   |", line, source_line));
            for _ in 0..col {
                result.push(' ');
            }
            result.push('^');
            let span_len = self.span.end.saturating_sub(self.span.start);
            if span_len > 1 {
                for _ in 1..span_len.min(source_line.len() - col + 1) {
                    result.push('~');
                }
            }
            result.push('\n');
        }

        if let Some(hint) = &self.hint {
            result.push_str(&format!("   = hint: {}\n", hint));
        }

        result
    }
}

/// Error raised while evaluating a parsed condition against a row.
///
/// Unlike [`ParseError`], these depend on the schema of the row being
/// evaluated, so they can only surface once evaluation begins.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum EvalError {
    #[error("unknown field '{field}'")]
    UnknownField { field: String },

    #[error("type mismatch on field '{field}': expected {expected}, found {found}")]
    TypeMismatch {
        field: String,
        expected: String,
        found: String,
    },

    #[error("missing positional parameter at index {index}")]
    MissingPositionalParameter { index: usize },

    #[error("missing named parameter ':{name}'")]
    MissingNamedParameter { name: String },
}

/// The unified error type returned by [`crate::parse_condition`] and
/// [`crate::evaluate`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum ConditionError {
    #[error("parse error: {0}")]
    Parse(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Eval(#[from] EvalError),
}

impl ConditionError {
    pub fn format_with_source(&self, source: &str) -> String {
        match self {
            ConditionError::Parse(e) => e.format_with_source(source),
            ConditionError::Eval(e) => e.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn formats_parse_error_with_source() {
        let source = "status = \"active\"";
        let err = ParseError::new("expected comparison operator, found Assign", Span::new(7, 8))
            .with_hint("use '==' for equality comparison");
        let formatted = err.format_with_source(source);
        assert!(formatted.contains("line 1:8"));
        assert!(formatted.contains("hint: use '=='"));
    }
}

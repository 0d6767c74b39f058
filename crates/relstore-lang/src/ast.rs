//! Abstract syntax tree for the condition language.
//!
//! The grammar is intentionally flat:
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
//! Unlike a typical boolean expression grammar, `&&` and `||` share one
//! precedence level and associate left to right — `a && b || c` parses as
//! `(a && b) || c`, never as `a && (b || c)`. [`Expr::Group`] mirrors that
//! directly: a first operand plus an ordered list of `(operator, operand)`
//! pairs, folded left to right by the evaluator.

use crate::span::{Span, Spanned};

/// A dotted field path, e.g. `address.state` or `#ID`.
#[derive(Debug, Clone, PartialEq)]
pub struct Path {
    pub segments: Vec<Spanned<String>>,
    pub span: Span,
}

impl Path {
    /// The pseudo-field naming the current row's primary key.
    pub const ID_PSEUDO_FIELD: &'static str = "#ID";

    pub fn head(&self) -> &str {
        &self.segments[0].value
    }

    pub fn tail(&self) -> &[Spanned<String>] {
        &self.segments[1..]
    }

    pub fn is_id_pseudo_field(&self) -> bool {
        self.segments.len() == 1 && self.segments[0].value == Self::ID_PSEUDO_FIELD
    }

    fn to_text(&self) -> String {
        self.segments
            .iter()
            .map(|s| s.value.as_str())
            .collect::<Vec<_>>()
            .join(".")
    }
}

/// Comparison operators accepted by the grammar.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompareOp {
    Eq,
    Ne,
    /// `=~`: containment — "any element equals" for list-valued operands.
    Contains,
    Lt,
    Le,
    Gt,
    Ge,
    In,
}

impl CompareOp {
    pub fn as_str(self) -> &'static str {
        match self {
            CompareOp::Eq => "==",
            CompareOp::Ne => "!=",
            CompareOp::Contains => "=~",
            CompareOp::Lt => "<",
            CompareOp::Le => "<=",
            CompareOp::Gt => ">",
            CompareOp::Ge => ">=",
            CompareOp::In => "IN",
        }
    }
}

/// A literal value written directly in condition text.
#[derive(Debug, Clone, PartialEq)]
pub enum Literal {
    Null,
    Bool(bool),
    Int(i64),
    Float(f64),
    String(String),
}

impl Literal {
    pub fn type_name(&self) -> &'static str {
        match self {
            Literal::Null => "null",
            Literal::Bool(_) => "bool",
            Literal::Int(_) => "int",
            Literal::Float(_) => "float",
            Literal::String(_) => "string",
        }
    }

    fn to_text(&self) -> String {
        match self {
            Literal::Null => "null".to_string(),
            Literal::Bool(b) => b.to_string(),
            Literal::Int(n) => n.to_string(),
            Literal::Float(f) => f.to_string(),
            Literal::String(s) => format!("\"{}\"", escape_string(s)),
        }
    }
}

fn escape_string(s: &str) -> String {
    let mut out = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '"' => out.push_str("\\\""),
            '\\' => out.push_str("\\\\"),
            _ => out.push(c),
        }
    }
    out
}

/// The right-hand side of a comparison.
#[derive(Debug, Clone, PartialEq)]
pub enum ValueExpr {
    /// `?` — pulled positionally from the bound parameter list.
    Positional(Span),
    /// `:name` — pulled from the named parameter map.
    Named(Spanned<String>),
    Literal(Spanned<Literal>),
    /// `[a, b, c]` — an inline list literal, mainly used with `IN`.
    List(Vec<Spanned<Literal>>, Span),
}

impl ValueExpr {
    pub fn span(&self) -> Span {
        match self {
            ValueExpr::Positional(s) => *s,
            ValueExpr::Named(s) => s.span,
            ValueExpr::Literal(s) => s.span,
            ValueExpr::List(_, s) => *s,
        }
    }

    fn to_text(&self) -> String {
        match self {
            ValueExpr::Positional(_) => "?".to_string(),
            ValueExpr::Named(name) => format!(":{}", name.value),
            ValueExpr::Literal(lit) => lit.value.to_text(),
            ValueExpr::List(items, _) => {
                let rendered: Vec<String> = items.iter().map(|i| i.value.to_text()).collect();
                format!("[{}]", rendered.join(", "))
            }
        }
    }
}

/// Logical connective joining operands within a [`Expr::Group`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BoolOp {
    And,
    Or,
}

/// A parsed condition expression.
#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
    Comparison {
        path: Path,
        op: CompareOp,
        value: ValueExpr,
        span: Span,
    },
    /// A left-to-right chain of `&&`/`||` combined operands. A single
    /// operand with an empty `rest` is just that operand — no redundant
    /// wrapping, matching how the parser builds it up.
    Group {
        first: Box<Expr>,
        rest: Vec<(BoolOp, Expr)>,
        span: Span,
    },
}

impl Expr {
    pub fn span(&self) -> Span {
        match self {
            Expr::Comparison { span, .. } => *span,
            Expr::Group { span, .. } => *span,
        }
    }

    /// Wrap `first` with further `(op, expr)` terms, collapsing a group of
    /// one back down to its sole member.
    pub fn chain(first: Expr, rest: Vec<(BoolOp, Expr)>) -> Expr {
        if rest.is_empty() {
            first
        } else {
            let span = rest
                .iter()
                .fold(first.span(), |acc, (_, e)| acc.merge(e.span()));
            Expr::Group {
                first: Box::new(first),
                rest,
                span,
            }
        }
    }

    /// Render back to condition text that reparses to an equivalent AST.
    /// A `Group` operand nested inside another `Group` only arises from
    /// explicit parentheses in the source (the flat `chain` grammar has no
    /// other way to produce one), so it is re-wrapped in parentheses here
    /// to preserve that structure rather than flattening into the same
    /// left-to-right chain.
    pub fn to_text(&self) -> String {
        match self {
            Expr::Comparison { path, op, value, .. } => {
                format!("{} {} {}", path.to_text(), op.as_str(), value.to_text())
            }
            Expr::Group { first, rest, .. } => {
                let mut out = Self::operand_text(first);
                for (op, expr) in rest {
                    let joiner = match op {
                        BoolOp::And => "&&",
                        BoolOp::Or => "||",
                    };
                    out.push(' ');
                    out.push_str(joiner);
                    out.push(' ');
                    out.push_str(&Self::operand_text(expr));
                }
                out
            }
        }
    }

    fn operand_text(expr: &Expr) -> String {
        match expr {
            Expr::Group { .. } => format!("({})", expr.to_text()),
            Expr::Comparison { .. } => expr.to_text(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn chain_of_one_does_not_wrap() {
        let e = Expr::Comparison {
            path: Path {
                segments: vec![Spanned::new("a".into(), Span::new(0, 1))],
                span: Span::new(0, 1),
            },
            op: CompareOp::Eq,
            value: ValueExpr::Literal(Spanned::new(Literal::Int(1), Span::new(2, 3))),
            span: Span::new(0, 3),
        };
        let chained = Expr::chain(e.clone(), vec![]);
        assert_eq!(chained, e);
    }

    #[test]
    fn is_id_pseudo_field_detects_hash_id() {
        let path = Path {
            segments: vec![Spanned::new("#ID".into(), Span::new(0, 3))],
            span: Span::new(0, 3),
        };
        assert!(path.is_id_pseudo_field());
    }
}

//! Recursive descent parser for the condition language.

use crate::ast::*;
use crate::error::ParseError;
use crate::lexer::{Lexer, SpannedToken, Token};
use crate::span::{Span, Spanned};

/// Parser for the condition language.
pub struct Parser<'source> {
    lexer: Lexer<'source>,
    source: &'source str,
}

impl<'source> Parser<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            lexer: Lexer::new(source),
            source,
        }
    }

    /// Parse a complete condition: `group := expr (('&&'|'||') expr)*`.
    pub fn parse_condition(&mut self) -> Result<Expr, ParseError> {
        let expr = self.parse_expr()?;
        self.parse_condition_tail(expr)
    }

    fn parse_condition_tail(&mut self, first: Expr) -> Result<Expr, ParseError> {
        let mut rest = Vec::new();

        while let Some(tok) = self.lexer.peek() {
            let op = match tok.token {
                Token::And => BoolOp::And,
                Token::Or => BoolOp::Or,
                _ => break,
            };
            self.next_token()?;
            let operand = self.parse_expr()?;
            rest.push((op, operand));
        }

        Ok(Expr::chain(first, rest))
    }

    /// `expr := path op value | '(' group ')'`
    fn parse_expr(&mut self) -> Result<Expr, ParseError> {
        if let Some(tok) = self.lexer.peek() {
            if tok.token == Token::LParen {
                self.next_token()?;
                let inner = self.parse_condition()?;
                self.expect_token(Token::RParen)?;
                return Ok(inner);
            }
        }

        let path = self.parse_path()?;
        let op = self.parse_op()?;
        let value = self.parse_value_expr()?;
        let span = path.span.merge(value.span());

        Ok(Expr::Comparison {
            path,
            op,
            value,
            span,
        })
    }

    /// `path := ident ('.' ident)*`, where the first segment may be `#ID`.
    fn parse_path(&mut self) -> Result<Path, ParseError> {
        let first = self.parse_path_segment()?;
        let mut span = first.span;
        let mut segments = vec![first];

        while let Some(tok) = self.lexer.peek() {
            if tok.token != Token::Dot {
                break;
            }
            self.next_token()?; // consume '.'
            let segment = self.parse_path_segment()?;
            span = span.merge(segment.span);
            segments.push(segment);
        }

        Ok(Path { segments, span })
    }

    fn parse_path_segment(&mut self) -> Result<Spanned<String>, ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Ident(name) => Ok(Spanned::new(name, tok.span)),
            Token::PseudoId => Ok(Spanned::new(Path::ID_PSEUDO_FIELD.to_string(), tok.span)),
            _ => Err(ParseError::new(
                format!("expected a field name, found {:?}", tok.token),
                tok.span,
            )),
        }
    }

    fn parse_op(&mut self) -> Result<CompareOp, ParseError> {
        let tok = self.next_token()?;
        let op = match tok.token {
            Token::Eq => CompareOp::Eq,
            Token::Ne => CompareOp::Ne,
            Token::Contains => CompareOp::Contains,
            Token::Lt => CompareOp::Lt,
            Token::Le => CompareOp::Le,
            Token::Gt => CompareOp::Gt,
            Token::Ge => CompareOp::Ge,
            Token::In => CompareOp::In,
            _ => {
                return Err(ParseError::new(
                    format!("expected a comparison operator, found {:?}", tok.token),
                    tok.span,
                ))
            }
        };
        Ok(op)
    }

    /// `value := '?' | ':' ident | literal`, plus a `[...]` list literal
    /// accepted anywhere a value is, since `IN` needs one to compare against.
    fn parse_value_expr(&mut self) -> Result<ValueExpr, ParseError> {
        let tok = self.next_token()?;
        match tok.token {
            Token::Question => Ok(ValueExpr::Positional(tok.span)),
            Token::Colon => {
                let name_tok = self.next_token()?;
                match name_tok.token {
                    Token::Ident(name) => Ok(ValueExpr::Named(Spanned::new(
                        name,
                        tok.span.merge(name_tok.span),
                    ))),
                    _ => Err(ParseError::new(
                        format!("expected parameter name after ':', found {:?}", name_tok.token),
                        name_tok.span,
                    )),
                }
            }
            Token::LBracket => self.parse_list_literal(tok.span),
            _ => {
                let literal = self.token_to_literal(tok)?;
                Ok(ValueExpr::Literal(literal))
            }
        }
    }

    fn parse_list_literal(&mut self, open_span: Span) -> Result<ValueExpr, ParseError> {
        let mut values = Vec::new();

        if let Some(tok) = self.lexer.peek() {
            if tok.token == Token::RBracket {
                let close = self.next_token()?;
                return Ok(ValueExpr::List(values, open_span.merge(close.span)));
            }
        }

        loop {
            let tok = self.next_token()?;
            values.push(self.token_to_literal(tok)?);

            let tok = self.next_token()?;
            match tok.token {
                Token::Comma => continue,
                Token::RBracket => return Ok(ValueExpr::List(values, open_span.merge(tok.span))),
                _ => {
                    return Err(ParseError::new(
                        format!("expected ',' or ']' in list literal, found {:?}", tok.token),
                        tok.span,
                    ))
                }
            }
        }
    }

    fn token_to_literal(&self, tok: SpannedToken) -> Result<Spanned<Literal>, ParseError> {
        let literal = match tok.token {
            Token::Null => Literal::Null,
            Token::True => Literal::Bool(true),
            Token::False => Literal::Bool(false),
            Token::Int(i) => Literal::Int(i),
            Token::Float(f) => Literal::Float(f),
            Token::String(s) => Literal::String(s),
            _ => {
                return Err(ParseError::new(
                    format!("expected a literal value, found {:?}", tok.token),
                    tok.span,
                ))
            }
        };
        Ok(Spanned::new(literal, tok.span))
    }

    fn expect_token(&mut self, expected: Token) -> Result<SpannedToken, ParseError> {
        let tok = self.next_token()?;
        if std::mem::discriminant(&tok.token) == std::mem::discriminant(&expected) {
            Ok(tok)
        } else {
            Err(ParseError::new(
                format!("expected {:?}, found {:?}", expected, tok.token),
                tok.span,
            ))
        }
    }

    fn next_token(&mut self) -> Result<SpannedToken, ParseError> {
        self.lexer.next_token().ok_or_else(|| {
            ParseError::new(
                "unexpected end of input",
                Span::new(self.source.len(), self.source.len()),
            )
        })
    }

    /// Error if any input remains unconsumed (trailing garbage after a
    /// complete condition).
    pub fn expect_end(&mut self) -> Result<(), ParseError> {
        if let Some(tok) = self.lexer.peek() {
            return Err(ParseError::new(
                format!("unexpected trailing input: {:?}", tok.token),
                tok.span,
            ));
        }
        Ok(())
    }
}

/// Parse a condition-language source string into an [`Expr`].
pub fn parse(source: &str) -> Result<Expr, ParseError> {
    let mut parser = Parser::new(source);
    let expr = parser.parse_condition()?;
    parser.expect_end()?;
    Ok(expr)
}

//! Lexer for the condition language, using logos.

use crate::span::Span;
use logos::Logos;

/// Token types for the condition language.
#[derive(Logos, Debug, Clone, PartialEq)]
#[logos(skip r"[ \t\r\n]+")]
pub enum Token {
    // The primary-key pseudo-field. Must be matched before the general
    // identifier regex so `#ID` doesn't fall through to an error token.
    #[token("#ID")]
    PseudoId,

    #[regex(r"[a-zA-Z_][a-zA-Z0-9_]*", |lex| lex.slice().to_string())]
    Ident(String),

    #[regex(r#""([^"\\]|\\.)*""#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    #[regex(r#"'([^'\\]|\\.)*'"#, |lex| {
        let s = lex.slice();
        unescape_string(&s[1..s.len()-1])
    })]
    String(String),

    #[regex(r"-?[0-9]+\.[0-9]+", |lex| lex.slice().parse::<f64>().ok())]
    Float(f64),

    #[regex(r"-?[0-9]+", |lex| lex.slice().parse::<i64>().ok())]
    Int(i64),

    #[token("true")]
    True,
    #[token("false")]
    False,
    #[token("null")]
    Null,

    #[token("==")]
    Eq,
    #[token("!=")]
    Ne,
    #[token("=~")]
    Contains,
    #[token("<=")]
    Le,
    #[token(">=")]
    Ge,
    #[token("<")]
    Lt,
    #[token(">")]
    Gt,
    #[token("IN")]
    #[token("in")]
    In,

    #[token("&&")]
    And,
    #[token("||")]
    Or,

    #[token(".")]
    Dot,
    #[token(",")]
    Comma,
    #[token(":")]
    Colon,
    #[token("?")]
    Question,
    #[token("(")]
    LParen,
    #[token(")")]
    RParen,
    #[token("[")]
    LBracket,
    #[token("]")]
    RBracket,
}

/// Unescape a string literal, handling common escape sequences.
fn unescape_string(s: &str) -> String {
    let mut result = String::with_capacity(s.len());
    let mut chars = s.chars().peekable();

    while let Some(c) = chars.next() {
        if c == '\\' {
            match chars.next() {
                Some('n') => result.push('\n'),
                Some('r') => result.push('\r'),
                Some('t') => result.push('\t'),
                Some('\\') => result.push('\\'),
                Some('"') => result.push('"'),
                Some('\'') => result.push('\''),
                Some(other) => {
                    result.push('\\');
                    result.push(other);
                }
                None => result.push('\\'),
            }
        } else {
            result.push(c);
        }
    }

    result
}

/// A token with its span in the source.
#[derive(Debug, Clone, PartialEq)]
pub struct SpannedToken {
    pub token: Token,
    pub span: Span,
}

/// Lexer that produces spanned tokens, with one token of lookahead.
pub struct Lexer<'source> {
    inner: logos::Lexer<'source, Token>,
    peeked: Option<Option<SpannedToken>>,
}

impl<'source> Lexer<'source> {
    pub fn new(source: &'source str) -> Self {
        Self {
            inner: Token::lexer(source),
            peeked: None,
        }
    }

    pub fn peek(&mut self) -> Option<&SpannedToken> {
        if self.peeked.is_none() {
            self.peeked = Some(self.next_inner());
        }
        self.peeked.as_ref().and_then(|o| o.as_ref())
    }

    pub fn next_token(&mut self) -> Option<SpannedToken> {
        if let Some(peeked) = self.peeked.take() {
            peeked
        } else {
            self.next_inner()
        }
    }

    fn next_inner(&mut self) -> Option<SpannedToken> {
        loop {
            match self.inner.next() {
                Some(Ok(token)) => {
                    return Some(SpannedToken {
                        token,
                        span: self.inner.span().into(),
                    });
                }
                Some(Err(())) => continue,
                None => return None,
            }
        }
    }

    pub fn span(&self) -> Span {
        self.inner.span().into()
    }
}

impl Iterator for Lexer<'_> {
    type Item = SpannedToken;

    fn next(&mut self) -> Option<Self::Item> {
        self.next_token()
    }
}

/// Tokenize a source string into a vector of spanned tokens.
pub fn tokenize(source: &str) -> Vec<SpannedToken> {
    Lexer::new(source).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lexes_dotted_path_and_operator() {
        let tokens = tokenize("address.state == \"NY\"");
        assert_eq!(tokens[0].token, Token::Ident("address".into()));
        assert_eq!(tokens[1].token, Token::Dot);
        assert_eq!(tokens[2].token, Token::Ident("state".into()));
        assert_eq!(tokens[3].token, Token::Eq);
        assert_eq!(tokens[4].token, Token::String("NY".into()));
    }

    #[test]
    fn lexes_pseudo_id_field() {
        let tokens = tokenize("#ID == ?");
        assert_eq!(tokens[0].token, Token::PseudoId);
        assert_eq!(tokens[2].token, Token::Question);
    }

    #[test]
    fn lexes_named_parameter() {
        let tokens = tokenize("email == :email");
        assert_eq!(tokens[2].token, Token::Colon);
        assert_eq!(tokens[3].token, Token::Ident("email".into()));
    }

    #[test]
    fn lexes_in_case_insensitively() {
        assert_eq!(tokenize("a in [1]")[1].token, Token::In);
        assert_eq!(tokenize("a IN [1]")[1].token, Token::In);
    }

    #[test]
    fn lexes_contains_operator() {
        let tokens = tokenize("roles =~ ?");
        assert_eq!(tokens[1].token, Token::Contains);
    }

    #[test]
    fn lexes_logical_operators() {
        let tokens = tokenize("a == 1 && b == 2 || c == 3");
        assert!(tokens.iter().any(|t| t.token == Token::And));
        assert!(tokens.iter().any(|t| t.token == Token::Or));
    }
}

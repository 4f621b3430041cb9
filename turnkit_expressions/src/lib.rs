#![warn(
    clippy::all,
    clippy::nursery,
    clippy::pedantic,
    clippy::style,
    clippy::complexity,
    clippy::perf,
    clippy::correctness,
    clippy::suspicious,
    clippy::unwrap_used,
    clippy::expect_used
)]
#![allow(
    clippy::similar_names,
    clippy::missing_safety_doc,
    clippy::missing_panics_doc,
    clippy::missing_errors_doc
)]

//! Text parser for expression lists such as
//! `greeting(hello), property(city(Paris))`.
//!
//! Grammar:
//! - `list := expression (',' expression)*` (may be empty)
//! - `expression := name ('(' list ')')?`
//! - `name` is a quoted string (`'..'` or `".."`, `\` escapes the next
//!   character) or a trimmed run of characters other than `(`, `)` and `,`.
//!
//! Nesting deeper than [`MAX_DEPTH`] parentheses is rejected.

use tracing::trace;
use turnkit_core::{Expression, ExpressionError, ExpressionParser};

/// Deepest accepted parenthesis nesting.
pub const MAX_DEPTH: usize = 64;

/// Default [`ExpressionParser`] for the textual expression format.
#[derive(Debug, Clone, Copy, Default)]
pub struct TextExpressionParser;

impl TextExpressionParser {
    #[must_use]
    pub const fn new() -> Self {
        Self
    }
}

impl ExpressionParser for TextExpressionParser {
    fn parse_expressions(&self, text: &str) -> Result<Vec<Expression>, ExpressionError> {
        let mut cursor = Cursor::new(text);
        let expressions = cursor.parse_list()?;
        cursor.skip_whitespace();
        match cursor.peek() {
            None => {
                trace!("Parsed {} expressions from {text:?}", expressions.len());
                Ok(expressions)
            }
            Some(b')') => Err(ExpressionError::UnbalancedParentheses {
                input: text.to_string(),
                position: cursor.pos,
            }),
            Some(_) => Err(ExpressionError::TrailingInput {
                input: text.to_string(),
                position: cursor.pos,
            }),
        }
    }
}

struct Cursor<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
}

impl<'a> Cursor<'a> {
    const fn new(input: &'a str) -> Self {
        Self {
            input,
            pos: 0,
            depth: 0,
        }
    }

    fn peek(&self) -> Option<u8> {
        self.input.as_bytes().get(self.pos).copied()
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_list(&mut self) -> Result<Vec<Expression>, ExpressionError> {
        let mut list = Vec::new();
        self.skip_whitespace();
        if matches!(self.peek(), None | Some(b')')) {
            return Ok(list);
        }

        loop {
            list.push(self.parse_expression()?);
            self.skip_whitespace();
            if self.peek() == Some(b',') {
                self.pos += 1;
            } else {
                return Ok(list);
            }
        }
    }

    fn parse_expression(&mut self) -> Result<Expression, ExpressionError> {
        self.skip_whitespace();
        let start = self.pos;
        let name = self.parse_name()?;
        if name.is_empty() {
            return Err(ExpressionError::EmptyName {
                input: self.input.to_string(),
                position: start,
            });
        }

        self.skip_whitespace();
        if self.peek() != Some(b'(') {
            return Ok(Expression::new(name));
        }

        let open = self.pos;
        if self.depth >= MAX_DEPTH {
            return Err(ExpressionError::TooDeep {
                input: self.input.to_string(),
                position: open,
            });
        }
        self.pos += 1;
        self.depth += 1;
        let sub_expressions = self.parse_list()?;
        self.depth -= 1;
        self.skip_whitespace();
        if self.peek() != Some(b')') {
            return Err(ExpressionError::UnbalancedParentheses {
                input: self.input.to_string(),
                position: open,
            });
        }
        self.pos += 1;

        Ok(Expression::with_subs(name, sub_expressions))
    }

    fn parse_name(&mut self) -> Result<String, ExpressionError> {
        match self.peek() {
            Some(quote @ (b'"' | b'\'')) => self.parse_quoted(char::from(quote)),
            _ => {
                let start = self.pos;
                while self.peek().is_some_and(|b| !matches!(b, b'(' | b')' | b',')) {
                    self.pos += 1;
                }
                Ok(self.input[start..self.pos].trim().to_string())
            }
        }
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, ExpressionError> {
        let start = self.pos;
        let body = &self.input[start + 1..];
        let mut value = String::new();
        let mut chars = body.char_indices();

        while let Some((offset, c)) = chars.next() {
            if c == quote {
                self.pos = start + 1 + offset + c.len_utf8();
                return Ok(value);
            }
            if c == '\\' {
                match chars.next() {
                    Some((_, escaped)) => value.push(escaped),
                    None => break,
                }
            } else {
                value.push(c);
            }
        }

        Err(ExpressionError::UnterminatedQuote {
            input: self.input.to_string(),
            position: start,
        })
    }
}

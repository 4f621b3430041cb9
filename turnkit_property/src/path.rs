//! Path evaluation over the template snapshot.
//!
//! Paths navigate a [`serde_json::Value`] tree with dotted field access
//! (`memory.current.input`), list indexing (`memory.past[0]`) and quoted
//! map-key access (`context["user name"]`).

use serde_json::Value;
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum PathError {
    #[error("invalid path {path:?} at byte {position}: {reason}")]
    Syntax {
        path: String,
        position: usize,
        reason: &'static str,
    },

    #[error("path {path:?}: no key {key:?} at {at:?}")]
    MissingKey {
        path: String,
        at: String,
        key: String,
    },

    #[error("path {path:?}: index {index} out of bounds for list of length {len} at {at:?}")]
    IndexOutOfBounds {
        path: String,
        at: String,
        index: usize,
        len: usize,
    },

    #[error("path {path:?}: cannot apply {segment} to {found} at {at:?}")]
    TypeMismatch {
        path: String,
        at: String,
        segment: String,
        found: &'static str,
    },
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Segment {
    Field(String),
    Index(usize),
}

impl fmt::Display for Segment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Field(name) => write!(f, "field {name:?}"),
            Self::Index(index) => write!(f, "index [{index}]"),
        }
    }
}

/// A compiled path expression.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PathExpression {
    source: String,
    segments: Vec<Segment>,
}

impl PathExpression {
    pub fn parse(path: &str) -> Result<Self, PathError> {
        PathParser::new(path).parse()
    }

    #[must_use]
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.source
    }

    /// Resolve the path against `root`.
    pub fn evaluate<'v>(&self, root: &'v Value) -> Result<&'v Value, PathError> {
        let mut current = root;
        for (i, segment) in self.segments.iter().enumerate() {
            current = self.step(current, segment, i)?;
        }
        Ok(current)
    }

    fn step<'v>(
        &self,
        value: &'v Value,
        segment: &Segment,
        i: usize,
    ) -> Result<&'v Value, PathError> {
        match (value, segment) {
            (Value::Object(map), Segment::Field(key)) => {
                map.get(key).ok_or_else(|| self.missing_key(i, key.clone()))
            }
            (Value::Object(map), Segment::Index(index)) => {
                let key = index.to_string();
                map.get(&key).ok_or_else(|| self.missing_key(i, key))
            }
            (Value::Array(items), Segment::Index(index)) => {
                items.get(*index).ok_or_else(|| PathError::IndexOutOfBounds {
                    path: self.source.clone(),
                    at: self.prefix(i),
                    index: *index,
                    len: items.len(),
                })
            }
            (other, segment) => Err(PathError::TypeMismatch {
                path: self.source.clone(),
                at: self.prefix(i),
                segment: segment.to_string(),
                found: kind_of(other),
            }),
        }
    }

    fn missing_key(&self, i: usize, key: String) -> PathError {
        PathError::MissingKey {
            path: self.source.clone(),
            at: self.prefix(i),
            key,
        }
    }

    /// Rendering of the first `len` segments, used in error messages.
    fn prefix(&self, len: usize) -> String {
        let mut rendered = String::from("$");
        for segment in &self.segments[..len] {
            match segment {
                Segment::Field(name) => {
                    rendered.push('.');
                    rendered.push_str(name);
                }
                Segment::Index(index) => {
                    rendered.push('[');
                    rendered.push_str(&index.to_string());
                    rendered.push(']');
                }
            }
        }
        rendered
    }
}

impl FromStr for PathExpression {
    type Err = PathError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for PathExpression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Parse and evaluate `path` against `root` in one go.
pub fn evaluate_path<'v>(path: &str, root: &'v Value) -> Result<&'v Value, PathError> {
    PathExpression::parse(path)?.evaluate(root)
}

const fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "list",
        Value::Object(_) => "map",
    }
}

struct PathParser<'a> {
    path: &'a str,
    pos: usize,
}

impl<'a> PathParser<'a> {
    const fn new(path: &'a str) -> Self {
        Self { path, pos: 0 }
    }

    fn peek(&self) -> Option<u8> {
        self.path.as_bytes().get(self.pos).copied()
    }

    fn error(&self, reason: &'static str) -> PathError {
        PathError::Syntax {
            path: self.path.to_string(),
            position: self.pos,
            reason,
        }
    }

    fn parse(mut self) -> Result<PathExpression, PathError> {
        if self.path.trim().is_empty() {
            return Err(self.error("empty path"));
        }

        let mut segments = Vec::new();
        match self.peek() {
            Some(b'[') => segments.push(self.parse_bracket()?),
            _ => segments.push(Segment::Field(self.parse_ident()?)),
        }

        while let Some(b) = self.peek() {
            match b {
                b'.' => {
                    self.pos += 1;
                    segments.push(Segment::Field(self.parse_ident()?));
                }
                b'[' => segments.push(self.parse_bracket()?),
                _ => return Err(self.error("expected '.' or '['")),
            }
        }

        Ok(PathExpression {
            source: self.path.to_string(),
            segments,
        })
    }

    fn parse_ident(&mut self) -> Result<String, PathError> {
        let start = self.pos;
        match self.peek() {
            Some(b) if b.is_ascii_alphabetic() || b == b'_' || b == b'$' => self.pos += 1,
            _ => return Err(self.error("expected identifier")),
        }
        while self
            .peek()
            .is_some_and(|b| b.is_ascii_alphanumeric() || matches!(b, b'_' | b'$' | b'-'))
        {
            self.pos += 1;
        }
        Ok(self.path[start..self.pos].to_string())
    }

    fn skip_whitespace(&mut self) {
        while self.peek().is_some_and(|b| b.is_ascii_whitespace()) {
            self.pos += 1;
        }
    }

    fn parse_bracket(&mut self) -> Result<Segment, PathError> {
        self.pos += 1;
        self.skip_whitespace();

        let segment = match self.peek() {
            Some(quote @ (b'"' | b'\'')) => Segment::Field(self.parse_quoted(char::from(quote))?),
            Some(b) if b.is_ascii_digit() => {
                let start = self.pos;
                while self.peek().is_some_and(|b| b.is_ascii_digit()) {
                    self.pos += 1;
                }
                let index = self.path[start..self.pos]
                    .parse()
                    .map_err(|_| self.error("index too large"))?;
                Segment::Index(index)
            }
            _ => return Err(self.error("expected index or quoted key")),
        };

        self.skip_whitespace();
        if self.peek() != Some(b']') {
            return Err(self.error("expected ']'"));
        }
        self.pos += 1;
        Ok(segment)
    }

    fn parse_quoted(&mut self, quote: char) -> Result<String, PathError> {
        let start = self.pos;
        let mut key = String::new();
        let mut chars = self.path[start + 1..].char_indices();

        while let Some((offset, c)) = chars.next() {
            if c == quote {
                self.pos = start + 1 + offset + c.len_utf8();
                return Ok(key);
            }
            if c == '\\' {
                match chars.next() {
                    Some((_, escaped)) => key.push(escaped),
                    None => break,
                }
            } else {
                key.push(c);
            }
        }

        Err(PathError::Syntax {
            path: self.path.to_string(),
            position: start,
            reason: "unterminated quoted key",
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn template() -> Value {
        json!({
            "context": {
                "user name": "Ada",
                "user": {"address": {"city": "Paris"}}
            },
            "memory": {
                "current": {"actions": ["greet", "ask_city"]},
                "past": [{"input": "hello"}, {"input": "Paris"}]
            },
            "properties": {"count": 3, "1": "one"}
        })
    }

    #[test]
    fn nested_field_access() {
        let root = template();
        assert_eq!(
            evaluate_path("context.user.address.city", &root).ok(),
            Some(&json!("Paris"))
        );
    }

    #[test]
    fn list_indexing() {
        let root = template();
        assert_eq!(
            evaluate_path("memory.current.actions[1]", &root).ok(),
            Some(&json!("ask_city"))
        );
        assert_eq!(
            evaluate_path("memory.past[0].input", &root).ok(),
            Some(&json!("hello"))
        );
    }

    #[test]
    fn quoted_map_key_access() {
        let root = template();
        assert_eq!(
            evaluate_path(r#"context["user name"]"#, &root).ok(),
            Some(&json!("Ada"))
        );
        assert_eq!(
            evaluate_path("context['user'].address", &root).ok(),
            Some(&json!({"city": "Paris"}))
        );
        assert_eq!(evaluate_path("properties[1]", &root).ok(), Some(&json!("one")));
    }

    #[test]
    fn missing_key_fails() {
        let root = template();
        let err = evaluate_path("context.user.phone", &root).err();
        assert_eq!(
            err,
            Some(PathError::MissingKey {
                path: "context.user.phone".to_string(),
                at: "$.context.user".to_string(),
                key: "phone".to_string(),
            })
        );
    }

    #[test]
    fn index_out_of_bounds_fails() {
        let root = template();
        assert!(matches!(
            evaluate_path("memory.past[5]", &root),
            Err(PathError::IndexOutOfBounds { index: 5, len: 2, .. })
        ));
    }

    #[test]
    fn navigating_into_scalar_fails() {
        let root = template();
        assert!(matches!(
            evaluate_path("properties.count.value", &root),
            Err(PathError::TypeMismatch { found: "number", .. })
        ));
        assert!(matches!(
            evaluate_path("memory.past.input", &root),
            Err(PathError::TypeMismatch { found: "list", .. })
        ));
    }

    #[test]
    fn syntax_errors_report_position() {
        assert!(matches!(
            PathExpression::parse(""),
            Err(PathError::Syntax { reason: "empty path", .. })
        ));
        assert!(matches!(
            PathExpression::parse("a..b"),
            Err(PathError::Syntax { position: 2, .. })
        ));
        assert!(matches!(
            PathExpression::parse("a[1"),
            Err(PathError::Syntax { position: 3, .. })
        ));
        assert!(matches!(
            PathExpression::parse("a['x"),
            Err(PathError::Syntax { position: 2, .. })
        ));
        assert!(matches!(
            PathExpression::parse("a b"),
            Err(PathError::Syntax { position: 1, .. })
        ));
    }

    #[test]
    fn compiled_path_is_reusable() {
        let path: PathExpression = "memory.past[1].input"
            .parse()
            .unwrap_or_else(|e| panic!("path should parse: {e}"));
        assert_eq!(path.segments().len(), 4);
        assert_eq!(path.to_string(), "memory.past[1].input");
        let root = template();
        assert_eq!(path.evaluate(&root).ok(), Some(&json!("Paris")));
    }
}

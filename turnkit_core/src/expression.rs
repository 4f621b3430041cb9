use serde::{Deserialize, Serialize};
use std::fmt;

/// A typed semantic unit such as `property(city(Paris))`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Expression {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub sub_expressions: Vec<Self>,
}

impl Expression {
    /// Create an expression without sub-expressions.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            sub_expressions: Vec::new(),
        }
    }

    /// Create an expression with the given sub-expressions.
    #[must_use]
    pub fn with_subs(name: impl Into<String>, sub_expressions: Vec<Self>) -> Self {
        Self {
            name: name.into(),
            sub_expressions,
        }
    }

    #[must_use]
    pub fn is_leaf(&self) -> bool {
        self.sub_expressions.is_empty()
    }
}

impl fmt::Display for Expression {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.name)?;
        if self.sub_expressions.is_empty() {
            return Ok(());
        }
        write!(f, "(")?;
        for (i, sub) in self.sub_expressions.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{sub}")?;
        }
        write!(f, ")")
    }
}

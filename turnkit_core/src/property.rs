use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Persistence class of a property.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Scope {
    #[default]
    Conversation,
    LongTerm,
}

impl std::fmt::Display for Scope {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Conversation => write!(f, "conversation"),
            Self::LongTerm => write!(f, "longTerm"),
        }
    }
}

impl std::str::FromStr for Scope {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "conversation" => Ok(Self::Conversation),
            "longTerm" => Ok(Self::LongTerm),
            _ => Err(anyhow::anyhow!("unknown property scope: {s}")),
        }
    }
}

/// A named property committed to conversation memory.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Property {
    pub name: String,
    pub value: Value,
    pub scope: Scope,
}

impl Property {
    #[must_use]
    pub fn new(name: impl Into<String>, value: Value, scope: Scope) -> Self {
        Self {
            name: name.into(),
            value,
            scope,
        }
    }
}

/// An extracted property awaiting naming by downstream stages.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PropertyEntry {
    pub meanings: Vec<String>,
    pub value: Value,
}

impl PropertyEntry {
    #[must_use]
    pub const fn new(meanings: Vec<String>, value: Value) -> Self {
        Self { meanings, value }
    }
}

/// Configured instruction for setting a property when an action fires.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PropertyInstruction {
    pub name: Option<String>,
    pub value: Option<Value>,
    pub from_object_path: Option<String>,
    pub scope: Scope,
}

impl PropertyInstruction {
    /// Instruction setting a literal value.
    #[must_use]
    pub fn literal(name: impl Into<String>, value: Value) -> Self {
        Self {
            name: Some(name.into()),
            value: Some(value),
            ..Self::default()
        }
    }

    /// Instruction resolving its value from a template path.
    #[must_use]
    pub fn from_path(name: impl Into<String>, path: impl Into<String>) -> Self {
        Self {
            name: Some(name.into()),
            from_object_path: Some(path.into()),
            ..Self::default()
        }
    }

    /// The path to evaluate, if one is set and non-empty.
    #[must_use]
    pub fn path(&self) -> Option<&str> {
        self.from_object_path
            .as_deref()
            .filter(|path| !path.is_empty())
    }
}

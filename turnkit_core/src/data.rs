//! Keyed data items recorded on a conversation step.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};

use crate::property::PropertyEntry;

/// Well-known data item keys.
pub mod keys {
    pub const INPUT_INITIAL: &str = "input:initial";
    pub const EXPRESSIONS_PARSED: &str = "expressions:parsed";
    pub const ACTIONS: &str = "actions";
    pub const CONTEXT: &str = "context";
    pub const CONTEXT_PREFIX: &str = "context:";
    pub const PROPERTIES_EXTRACTED: &str = "properties:extracted";

    /// Separator between a key's namespace and its subkey.
    pub const SEPARATOR: char = ':';

    /// Build a context key, e.g. `context:properties.city`.
    #[must_use]
    pub fn context(subkey: &str) -> String {
        format!("{CONTEXT_PREFIX}{subkey}")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextType {
    String,
    Expressions,
    Object,
}

impl std::fmt::Display for ContextType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::String => write!(f, "string"),
            Self::Expressions => write!(f, "expressions"),
            Self::Object => write!(f, "object"),
        }
    }
}

/// A context value handed to the conversation from outside.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Context {
    #[serde(rename = "type")]
    pub context_type: ContextType,
    pub value: Value,
}

impl Context {
    #[must_use]
    pub const fn new(context_type: ContextType, value: Value) -> Self {
        Self {
            context_type,
            value,
        }
    }

    /// Context value holding raw expression text.
    #[must_use]
    pub fn expressions(text: impl Into<String>) -> Self {
        Self::new(ContextType::Expressions, Value::String(text.into()))
    }

    /// The value as text; strings are returned verbatim, anything else is
    /// rendered as JSON.
    #[must_use]
    pub fn value_text(&self) -> String {
        match &self.value {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        }
    }
}

/// Payload of a data item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum DataValue {
    Text(String),
    Actions(Vec<String>),
    Context(Context),
    Properties(Vec<PropertyEntry>),
}

impl DataValue {
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text(text) => Some(text),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_actions(&self) -> Option<&[String]> {
        match self {
            Self::Actions(actions) => Some(actions),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_context(&self) -> Option<&Context> {
        match self {
            Self::Context(context) => Some(context),
            _ => None,
        }
    }

    #[must_use]
    pub fn as_properties(&self) -> Option<&[PropertyEntry]> {
        match self {
            Self::Properties(entries) => Some(entries),
            _ => None,
        }
    }

    /// Render the payload into the uniform value tree used by templates.
    #[must_use]
    pub fn to_json(&self) -> Value {
        match self {
            Self::Text(text) => Value::String(text.clone()),
            Self::Actions(actions) => {
                Value::Array(actions.iter().cloned().map(Value::String).collect())
            }
            Self::Context(context) => context.value.clone(),
            Self::Properties(entries) => Value::Array(
                entries
                    .iter()
                    .map(|entry| json!({"meanings": entry.meanings, "value": entry.value}))
                    .collect(),
            ),
        }
    }
}

/// A single keyed, timestamped entry of a conversation step.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem<T = DataValue> {
    pub key: String,
    pub result: T,
    pub timestamp: DateTime<Utc>,
    /// Public items are the step's output for downstream consumers.
    #[serde(default)]
    pub public: bool,
}

impl<T> DataItem<T> {
    #[must_use]
    pub fn new(key: impl Into<String>, result: T) -> Self {
        Self {
            key: key.into(),
            result,
            timestamp: Utc::now(),
            public: false,
        }
    }

    #[must_use]
    pub const fn public(mut self) -> Self {
        self.public = true;
        self
    }

    /// Part of the key after the first separator, if any.
    #[must_use]
    pub fn subkey(&self) -> Option<&str> {
        self.key
            .split_once(keys::SEPARATOR)
            .map(|(_, subkey)| subkey)
    }

    /// Part of the key before the first separator, or the whole key.
    #[must_use]
    pub fn namespace(&self) -> &str {
        self.key
            .split_once(keys::SEPARATOR)
            .map_or(self.key.as_str(), |(namespace, _)| namespace)
    }
}

impl DataItem {
    #[must_use]
    pub fn text(key: impl Into<String>, text: impl Into<String>) -> Self {
        Self::new(key, DataValue::Text(text.into()))
    }

    #[must_use]
    pub fn actions<I, S>(actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::new(
            keys::ACTIONS,
            DataValue::Actions(actions.into_iter().map(Into::into).collect()),
        )
    }

    #[must_use]
    pub fn context(subkey: &str, context: Context) -> Self {
        Self::new(keys::context(subkey), DataValue::Context(context))
    }
}

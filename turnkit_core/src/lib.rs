#![deny(
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
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

use thiserror::Error;

pub mod data;
pub mod expression;
pub mod lifecycle;
pub mod memory;
pub mod property;

pub use data::{Context, ContextType, DataItem, DataValue, keys};
pub use expression::Expression;
pub use lifecycle::{LifecycleError, LifecycleTask};
pub use memory::{
    ConversationMemory, ConversationProperties, ConversationStep, PreviousSteps,
    TemplateMemoryConverter,
};
pub use property::{Property, PropertyEntry, PropertyInstruction, Scope};

/// Failure raised while turning raw expression text into [`Expression`]s.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExpressionError {
    #[error("unbalanced parentheses at byte {position} in {input:?}")]
    UnbalancedParentheses { input: String, position: usize },

    #[error("empty expression name at byte {position} in {input:?}")]
    EmptyName { input: String, position: usize },

    #[error("unterminated quote starting at byte {position} in {input:?}")]
    UnterminatedQuote { input: String, position: usize },

    #[error("unexpected input at byte {position} in {input:?}")]
    TrailingInput { input: String, position: usize },

    #[error("nesting too deep at byte {position} in {input:?}")]
    TooDeep { input: String, position: usize },
}

/// Converts raw expression text into structured expressions.
pub trait ExpressionParser: Send + Sync {
    fn parse_expressions(&self, text: &str) -> Result<Vec<Expression>, ExpressionError>;
}

/// Policy deriving property entries from a list of expressions.
///
/// Implementations must be pure: the same input always yields the same
/// entries, in input order.
pub trait PropertyDisposer: Send + Sync {
    fn extract_properties(&self, expressions: &[Expression]) -> Vec<PropertyEntry>;
}

/// Renders a conversation memory into a read-only template snapshot.
pub trait MemoryItemConverter: Send + Sync {
    fn convert(&self, memory: &ConversationMemory) -> serde_json::Map<String, serde_json::Value>;
}

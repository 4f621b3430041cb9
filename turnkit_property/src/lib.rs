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
    clippy::missing_errors_doc,
    clippy::module_name_repetitions
)]

//! Property extraction for conversation turns.
//!
//! The [`PropertyExtractionStage`] derives named properties from a turn's
//! expressions, context and actions and writes them back into the
//! conversation memory.

pub mod disposer;
mod error;
pub mod instructions;
pub mod path;
pub mod stage;

pub use disposer::ExpressionPropertyDisposer;
pub use error::PropertyError;
pub use instructions::{
    ActionInstructionMap, ActionInstructionMapBuilder, CompiledInstruction, ConfigError,
    OneOrMany, PropertyInstructionDef, PropertySetterConfig, SetOnActions,
};
pub use path::{PathError, PathExpression, evaluate_path};
pub use stage::{
    CATCH_ANY_INPUT_AS_PROPERTY_ACTION, PropertyExtractionStage, TASK_ID, USER_INPUT_MEANING,
};

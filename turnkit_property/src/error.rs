use thiserror::Error;
use turnkit_core::ExpressionError;

use crate::path::PathError;

/// Failure while extracting properties for a single turn.
#[derive(Debug, Error)]
pub enum PropertyError {
    #[error("failed to parse expressions of {key}: {source}")]
    ExpressionParsing {
        key: String,
        #[source]
        source: ExpressionError,
    },

    #[error("property instruction #{position} of action {action:?} has no name")]
    MissingName { action: String, position: usize },

    #[error("failed to resolve property {name:?} for action {action:?}: {source}")]
    PathEvaluation {
        action: String,
        name: String,
        #[source]
        source: PathError,
    },
}

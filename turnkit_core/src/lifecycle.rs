//! Pipeline stage seam.

use thiserror::Error;

use crate::memory::ConversationMemory;

type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Stage-level failure carrying the original cause.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("task {task_id} failed: {source}")]
    Task {
        task_id: String,
        #[source]
        source: BoxError,
    },
}

impl LifecycleError {
    pub fn task(task_id: impl Into<String>, source: impl Into<BoxError>) -> Self {
        Self::Task {
            task_id: task_id.into(),
            source: source.into(),
        }
    }

    #[must_use]
    pub fn task_id(&self) -> &str {
        match self {
            Self::Task { task_id, .. } => task_id,
        }
    }
}

/// A unit of per-turn work executed against a conversation memory.
///
/// Tasks are shared read-only between conversations, so any configuration
/// must be complete before the first call to [`LifecycleTask::execute`].
pub trait LifecycleTask: Send + Sync {
    fn id(&self) -> &str;

    fn execute(&self, memory: &mut ConversationMemory) -> Result<(), LifecycleError>;
}

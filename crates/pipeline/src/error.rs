use thiserror::Error;

use copydesk_core::{TaskStatus, ValidationError};

/// Errors surfaced by lifecycle operations.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// The submission payload failed validation.
    #[error(transparent)]
    Validation(#[from] ValidationError),

    /// No task with the given id exists.
    #[error("task {0} not found")]
    NotFound(String),

    /// A decision was attempted against the wrong lifecycle position.
    #[error("task is {actual}, expected {expected}")]
    InvalidStatus {
        actual: TaskStatus,
        expected: TaskStatus,
    },

    /// A concurrent writer moved the task between read and write; the
    /// operation wrote nothing and is safe to retry against fresh state.
    #[error("task changed concurrently, now {actual}")]
    Conflict { actual: TaskStatus },

    /// The generation call failed; the task was left untouched and the run
    /// can be retried.
    #[error(transparent)]
    Generation(#[from] copydesk_generation::GenerationError),

    /// The task store failed.
    #[error(transparent)]
    Store(#[from] copydesk_store::StoreError),
}

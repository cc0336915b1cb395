use thiserror::Error;

/// Errors surfaced by task store backends.
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be reached.
    #[error("store connection error: {0}")]
    Connection(String),

    /// The backend rejected or failed the operation.
    #[error("store backend error: {0}")]
    Backend(String),

    /// A stored row could not be mapped back into a task.
    #[error("corrupt task record: {0}")]
    Corrupt(String),
}

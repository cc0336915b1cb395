use thiserror::Error;

/// Errors surfaced by the queue backend.
#[derive(Debug, Error)]
pub enum QueueError {
    /// The broker could not be reached.
    #[error("queue connection error: {0}")]
    Connection(String),

    /// The broker rejected or failed the operation.
    #[error("queue backend error: {0}")]
    Backend(String),

    /// A job payload could not be encoded or decoded.
    #[error("job serialization error: {0}")]
    Serialization(String),
}

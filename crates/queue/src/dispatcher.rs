use async_trait::async_trait;
use tracing::debug;

use copydesk_core::{Job, JobId};

use crate::error::QueueError;

/// Capability interface for handing a job to the queue.
///
/// Chosen once at startup: a Redis-backed implementation when a broker is
/// configured, otherwise [`NoopDispatcher`]. Call sites never null-check a
/// connection; they ask the dispatcher and read the answer.
#[async_trait]
pub trait JobDispatcher: Send + Sync {
    /// Enqueue a job. Returns the broker's job id, or `None` when no broker
    /// backs this dispatcher and the caller should fall back to synchronous
    /// processing or an external trigger.
    async fn enqueue(&self, job: &Job) -> Result<Option<JobId>, QueueError>;

    /// `true` when a real broker backs this dispatcher.
    fn is_backed(&self) -> bool;
}

/// Dispatcher used when no broker is configured. Enqueue accepts every job
/// and returns no id.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoopDispatcher;

#[async_trait]
impl JobDispatcher for NoopDispatcher {
    async fn enqueue(&self, job: &Job) -> Result<Option<JobId>, QueueError> {
        debug!(task_id = %job.task_id, "queue not configured, job not enqueued");
        Ok(None)
    }

    fn is_backed(&self) -> bool {
        false
    }
}

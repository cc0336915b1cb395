use std::time::Duration;

use async_trait::async_trait;

use copydesk_core::{Job, JobId};

use crate::error::QueueError;

/// Consumer-side view of the queue.
///
/// The worker drives jobs through this trait so its scheduling logic can be
/// exercised against an in-memory implementation in tests.
#[async_trait]
pub trait JobSource: Send + Sync {
    /// Claim one due job, atomically removing it from the ready set.
    /// Returns `None` when nothing is due.
    async fn claim_due(&self) -> Result<Option<(JobId, Job)>, QueueError>;

    /// Record a finished job.
    async fn complete(&self, id: &JobId, job: &Job) -> Result<(), QueueError>;

    /// Schedule a redelivery of the job after `delay`.
    async fn retry(&self, job: Job, delay: Duration) -> Result<(), QueueError>;

    /// Park a job whose attempts are exhausted.
    async fn fail(&self, id: &JobId, job: &Job, error: &str) -> Result<(), QueueError>;
}

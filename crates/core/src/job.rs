use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::types::{TaskId, TenantId};

/// Broker-assigned identifier of an enqueued job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(String);

impl JobId {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Generate a fresh random job id.
    #[must_use]
    pub fn generate() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for JobId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.0)
    }
}

/// An at-least-once delivery envelope pointing at a task.
///
/// A job's existence says nothing about the task's current status: delivery
/// may be delayed, retried, or reordered relative to concurrent approve and
/// reject calls, so consumers must re-fetch the task before acting.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Job {
    /// The task to process.
    pub task_id: TaskId,
    /// Tenant owning the task, carried for logging and isolation checks.
    pub tenant_id: TenantId,
    /// Zero-based delivery attempt, incremented on each redelivery.
    #[serde(default)]
    pub attempt: u32,
}

impl Job {
    /// Create a first-attempt job for a task.
    #[must_use]
    pub fn new(task_id: TaskId, tenant_id: TenantId) -> Self {
        Self {
            task_id,
            tenant_id,
            attempt: 0,
        }
    }

    /// The envelope for the next redelivery of this job.
    #[must_use]
    pub fn next_attempt(&self) -> Self {
        Self {
            task_id: self.task_id.clone(),
            tenant_id: self.tenant_id.clone(),
            attempt: self.attempt + 1,
        }
    }
}

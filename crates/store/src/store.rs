use async_trait::async_trait;

use copydesk_core::{Task, TaskId, TaskStatus};

use crate::error::StoreError;

/// What to do with the `content` column during a status transition.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentPatch {
    /// Leave the stored content untouched.
    Keep,
    /// Replace the stored content (generation finished).
    Set(String),
    /// Drop the stored content (regeneration re-queues the task).
    Clear,
}

/// Result of a conditional status transition.
#[derive(Debug, Clone)]
pub enum Transition {
    /// The expected status matched; the returned task reflects the write.
    Applied(Task),
    /// The task's current status differed from the expectation; nothing was
    /// written.
    Conflict { actual: TaskStatus },
    /// No task with that id exists.
    NotFound,
}

/// Trait for persisting task records.
///
/// Implementations must be `Send + Sync` and safe for concurrent access.
/// Tasks are never deleted; the trait deliberately has no delete operation.
#[async_trait]
pub trait TaskStore: Send + Sync {
    /// Persist a freshly created task. Returns the stored record.
    async fn create(&self, task: Task) -> Result<Task, StoreError>;

    /// Fetch a task by id. Returns `None` if unknown.
    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError>;

    /// Atomically move a task from `expected` to `next`, applying the
    /// content patch and bumping `updated_at` in the same write.
    ///
    /// This is the optimistic-concurrency guard for the whole lifecycle:
    /// a transition only lands if the row still has the status the caller
    /// observed, so two concurrent writers cannot both win.
    async fn transition(
        &self,
        id: &TaskId,
        expected: TaskStatus,
        next: TaskStatus,
        content: ContentPatch,
    ) -> Result<Transition, StoreError>;

    /// Cheap reachability probe for readiness checks.
    async fn ping(&self) -> Result<(), StoreError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    // Verify object safety: the server holds the store as a trait object.
    fn _assert_dyn_task_store(_: &dyn TaskStore) {}
}

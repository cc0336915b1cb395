use async_trait::async_trait;
use chrono::Utc;
use dashmap::DashMap;

use copydesk_core::{Task, TaskId, TaskStatus};

use crate::error::StoreError;
use crate::store::{ContentPatch, TaskStore, Transition};

/// In-memory [`TaskStore`] backed by a concurrent map.
///
/// Used by tests and by brokerless single-process deployments. Each entry is
/// mutated under its shard lock, so `transition` is atomic per task.
#[derive(Debug, Default)]
pub struct MemoryTaskStore {
    tasks: DashMap<String, Task>,
}

impl MemoryTaskStore {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored tasks.
    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[async_trait]
impl TaskStore for MemoryTaskStore {
    async fn create(&self, task: Task) -> Result<Task, StoreError> {
        self.tasks.insert(task.id.as_str().to_owned(), task.clone());
        Ok(task)
    }

    async fn get(&self, id: &TaskId) -> Result<Option<Task>, StoreError> {
        Ok(self.tasks.get(id.as_str()).map(|entry| entry.clone()))
    }

    async fn transition(
        &self,
        id: &TaskId,
        expected: TaskStatus,
        next: TaskStatus,
        content: ContentPatch,
    ) -> Result<Transition, StoreError> {
        let Some(mut entry) = self.tasks.get_mut(id.as_str()) else {
            return Ok(Transition::NotFound);
        };

        if entry.status != expected {
            return Ok(Transition::Conflict {
                actual: entry.status,
            });
        }

        entry.status = next;
        match content {
            ContentPatch::Keep => {}
            ContentPatch::Set(text) => entry.content = Some(text),
            ContentPatch::Clear => entry.content = None,
        }
        entry.updated_at = Utc::now();

        Ok(Transition::Applied(entry.clone()))
    }

    async fn ping(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::run_task_store_conformance_tests;

    #[tokio::test]
    async fn conformance() {
        let store = MemoryTaskStore::new();
        run_task_store_conformance_tests(&store).await.unwrap();
    }

    #[tokio::test]
    async fn concurrent_transitions_only_one_wins() {
        use std::sync::Arc;

        use copydesk_core::BriefInput;

        let store = Arc::new(MemoryTaskStore::new());
        let task = store
            .create(Task::new(BriefInput {
                tenant_id: "t1".into(),
                brief: "Launch our new espresso blend".into(),
                tone: None,
                audience: None,
                platform: None,
            }))
            .await
            .unwrap();

        let mut handles = Vec::new();
        for i in 0..8 {
            let store = Arc::clone(&store);
            let id = task.id.clone();
            handles.push(tokio::spawn(async move {
                store
                    .transition(
                        &id,
                        TaskStatus::Queued,
                        TaskStatus::PendingApproval,
                        ContentPatch::Set(format!("draft {i}")),
                    )
                    .await
                    .unwrap()
            }));
        }

        let mut applied = 0;
        for handle in handles {
            if matches!(handle.await.unwrap(), Transition::Applied(_)) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1, "exactly one concurrent transition may land");
    }
}

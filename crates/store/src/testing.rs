//! Conformance test suite for [`TaskStore`] backends.
//!
//! Call [`run_task_store_conformance_tests`] from a backend's test module
//! with a fresh store instance.

use copydesk_core::{BriefInput, Task, TaskStatus};

use crate::error::StoreError;
use crate::store::{ContentPatch, TaskStore, Transition};

fn sample_task() -> Task {
    Task::new(BriefInput {
        tenant_id: "test-tenant".into(),
        brief: "Announce the spring tasting menu".into(),
        tone: Some("warm".into()),
        audience: None,
        platform: None,
    })
}

/// Run the full task store conformance suite.
///
/// # Errors
///
/// Returns an error if any conformance check fails.
pub async fn run_task_store_conformance_tests(store: &dyn TaskStore) -> Result<(), StoreError> {
    test_get_missing(store).await?;
    test_create_and_get(store).await?;
    test_transition_applies(store).await?;
    test_transition_conflict(store).await?;
    test_transition_not_found(store).await?;
    test_content_clear_on_requeue(store).await?;
    test_ping(store).await?;
    Ok(())
}

async fn test_get_missing(store: &dyn TaskStore) -> Result<(), StoreError> {
    let missing = store.get(&copydesk_core::TaskId::new("no-such-task")).await?;
    assert!(missing.is_none(), "get on a missing id should return None");
    Ok(())
}

async fn test_create_and_get(store: &dyn TaskStore) -> Result<(), StoreError> {
    let task = store.create(sample_task()).await?;
    assert_eq!(task.status, TaskStatus::Queued);
    assert!(task.content.is_none());

    let fetched = store.get(&task.id).await?.expect("created task must exist");
    assert_eq!(fetched.brief, task.brief);
    assert_eq!(fetched.tenant, task.tenant, "tenant must persist unchanged");
    assert_eq!(fetched.tone.as_deref(), Some("warm"));
    Ok(())
}

async fn test_transition_applies(store: &dyn TaskStore) -> Result<(), StoreError> {
    let task = store.create(sample_task()).await?;

    let result = store
        .transition(
            &task.id,
            TaskStatus::Queued,
            TaskStatus::PendingApproval,
            ContentPatch::Set("generated copy".into()),
        )
        .await?;

    match result {
        Transition::Applied(updated) => {
            assert_eq!(updated.status, TaskStatus::PendingApproval);
            assert_eq!(updated.content.as_deref(), Some("generated copy"));
            assert!(updated.updated_at >= task.updated_at);
        }
        other => panic!("expected Applied, got {other:?}"),
    }

    // The write must be visible to a subsequent read.
    let fetched = store.get(&task.id).await?.expect("task must exist");
    assert_eq!(fetched.status, TaskStatus::PendingApproval);
    Ok(())
}

async fn test_transition_conflict(store: &dyn TaskStore) -> Result<(), StoreError> {
    let task = store.create(sample_task()).await?;

    let result = store
        .transition(
            &task.id,
            TaskStatus::PendingApproval,
            TaskStatus::Approved,
            ContentPatch::Keep,
        )
        .await?;

    match result {
        Transition::Conflict { actual } => assert_eq!(actual, TaskStatus::Queued),
        other => panic!("expected Conflict, got {other:?}"),
    }

    // Nothing may have been written.
    let fetched = store.get(&task.id).await?.expect("task must exist");
    assert_eq!(fetched.status, TaskStatus::Queued);
    assert!(fetched.content.is_none());
    Ok(())
}

async fn test_transition_not_found(store: &dyn TaskStore) -> Result<(), StoreError> {
    let result = store
        .transition(
            &copydesk_core::TaskId::new("no-such-task"),
            TaskStatus::Queued,
            TaskStatus::PendingApproval,
            ContentPatch::Keep,
        )
        .await?;
    assert!(matches!(result, Transition::NotFound));
    Ok(())
}

async fn test_content_clear_on_requeue(store: &dyn TaskStore) -> Result<(), StoreError> {
    let task = store.create(sample_task()).await?;
    store
        .transition(
            &task.id,
            TaskStatus::Queued,
            TaskStatus::PendingApproval,
            ContentPatch::Set("first draft".into()),
        )
        .await?;

    let result = store
        .transition(
            &task.id,
            TaskStatus::PendingApproval,
            TaskStatus::Queued,
            ContentPatch::Clear,
        )
        .await?;

    match result {
        Transition::Applied(updated) => {
            assert_eq!(updated.status, TaskStatus::Queued);
            assert!(
                updated.content.is_none(),
                "requeued tasks must not retain stale content"
            );
        }
        other => panic!("expected Applied, got {other:?}"),
    }
    Ok(())
}

async fn test_ping(store: &dyn TaskStore) -> Result<(), StoreError> {
    store.ping().await
}

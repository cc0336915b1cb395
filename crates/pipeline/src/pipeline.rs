use std::sync::Arc;

use tokio_util::task::TaskTracker;
use tracing::{info, instrument, warn};

use copydesk_core::{
    BriefInput, FeedbackInput, FeedbackType, Job, JobId, Task, TaskId, TaskStatus,
};
use copydesk_events::{Event, EventEmitter};
use copydesk_generation::{GenerateRequest, GenerationGateway};
use copydesk_insights::InsightsGateway;
use copydesk_queue::JobDispatcher;
use copydesk_store::{ContentPatch, TaskStore, Transition};

use crate::error::PipelineError;

/// Result of a brief submission.
#[derive(Debug, Clone)]
pub struct SubmitOutcome {
    pub task: Task,
    /// Broker job id when a queue accepted the work; `None` means the
    /// caller should trigger the run itself.
    pub job_id: Option<JobId>,
}

/// Result of a generation run.
#[derive(Debug, Clone)]
pub struct RunOutcome {
    pub task: Task,
    pub hashtags: Vec<String>,
    pub image_prompt: String,
}

/// Result of a rejection.
#[derive(Debug, Clone)]
pub struct RejectOutcome {
    pub task: Task,
    pub will_regenerate: bool,
    /// Job id of the regeneration enqueue, when one happened.
    pub job_id: Option<JobId>,
}

/// Orchestrates the task lifecycle over the store, the queue, and the
/// upstream gateways.
///
/// Every status change goes through the store's conditional transition, so
/// two concurrent writers cannot both land. Event emission runs on tracked
/// spawned tasks; call [`shutdown`](Self::shutdown) to drain them.
pub struct TaskPipeline {
    store: Arc<dyn TaskStore>,
    dispatcher: Arc<dyn JobDispatcher>,
    generation: Arc<GenerationGateway>,
    insights: Arc<InsightsGateway>,
    events: Arc<EventEmitter>,
    event_tracker: TaskTracker,
}

impl TaskPipeline {
    #[must_use]
    pub fn new(
        store: Arc<dyn TaskStore>,
        dispatcher: Arc<dyn JobDispatcher>,
        generation: Arc<GenerationGateway>,
        insights: Arc<InsightsGateway>,
        events: Arc<EventEmitter>,
    ) -> Self {
        Self {
            store,
            dispatcher,
            generation,
            insights,
            events,
            event_tracker: TaskTracker::new(),
        }
    }

    /// Accept a brief: validate, persist the task as `queued`, and attempt
    /// to enqueue a processing job.
    ///
    /// Enqueue failure is not fatal — the task is durable and can still be
    /// run by a direct call or an external trigger.
    #[instrument(skip(self, input), fields(tenant = %input.tenant_id))]
    pub async fn submit(&self, input: BriefInput) -> Result<SubmitOutcome, PipelineError> {
        input.validate()?;

        let task = self.store.create(Task::new(input)).await?;

        let job = Job::new(task.id.clone(), task.tenant.clone());
        let job_id = match self.dispatcher.enqueue(&job).await {
            Ok(job_id) => job_id,
            Err(e) => {
                warn!(task_id = %task.id, error = %e, "enqueue failed, task stays runnable");
                None
            }
        };

        info!(task_id = %task.id, queued = job_id.is_some(), "task created");
        Ok(SubmitOutcome { task, job_id })
    }

    /// Drive one task through generation into the approval gate.
    ///
    /// On generation failure the task is left untouched, so a retry — by
    /// the broker or a caller — sees exactly the state this run saw.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn run(&self, task_id: &TaskId) -> Result<RunOutcome, PipelineError> {
        let task = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(task_id.to_string()))?;

        let hints = self.insights.hints(task.tenant.as_str()).await;
        if !hints.is_empty() {
            info!(tenant = %task.tenant, "applying generation hints");
        }

        self.emit(Event::writer(
            task.tenant.as_str(),
            "agent.writer.run.start",
            serde_json::json!({
                "taskId": task.id,
                "brief": task.brief,
                "tone": task.tone,
                "audience": task.audience,
                "hasHints": !hints.is_empty(),
            }),
        ));

        let request = GenerateRequest {
            tenant_id: Some(task.tenant.as_str().to_owned()),
            brief: task.brief.clone(),
            tone: hints.tone.clone().or_else(|| task.tone.clone()),
            audience: task.audience.clone(),
            platform: task.platform.clone(),
            image_brief: None,
        };
        let generated = self.generation.generate(&request).await?;

        // Conditional write keyed on the status observed above: if anything
        // moved the task meanwhile, nothing is written.
        let transition = self
            .store
            .transition(
                &task.id,
                task.status,
                TaskStatus::PendingApproval,
                ContentPatch::Set(generated.content.clone()),
            )
            .await?;

        let updated = match transition {
            Transition::Applied(updated) => updated,
            Transition::Conflict { actual } => {
                return Err(PipelineError::Conflict { actual });
            }
            Transition::NotFound => {
                return Err(PipelineError::NotFound(task_id.to_string()));
            }
        };

        self.emit(Event::writer(
            updated.tenant.as_str(),
            "agent.writer.run.pending_approval",
            serde_json::json!({
                "taskId": updated.id,
                "contentLen": updated.content.as_deref().map_or(0, str::len),
            }),
        ));

        info!(task_id = %updated.id, "task awaiting approval");
        Ok(RunOutcome {
            task: updated,
            hashtags: generated.hashtags,
            image_prompt: generated.image_prompt,
        })
    }

    /// Record a human approval. Only valid from `pending_approval`.
    #[instrument(skip(self), fields(task_id = %task_id))]
    pub async fn approve(&self, task_id: &TaskId) -> Result<Task, PipelineError> {
        let transition = self
            .store
            .transition(
                task_id,
                TaskStatus::PendingApproval,
                TaskStatus::Approved,
                ContentPatch::Keep,
            )
            .await?;

        let task = match transition {
            Transition::Applied(task) => task,
            Transition::Conflict { actual } => {
                return Err(PipelineError::InvalidStatus {
                    actual,
                    expected: TaskStatus::PendingApproval,
                });
            }
            Transition::NotFound => {
                return Err(PipelineError::NotFound(task_id.to_string()));
            }
        };

        let mut feedback = FeedbackInput::decision(
            task.tenant.as_str(),
            task.id.as_str(),
            FeedbackType::Approved,
        );
        if let Some(content) = task.content.as_deref() {
            feedback = feedback.with_original_content(content);
        }
        self.send_feedback(feedback).await;

        info!(task_id = %task.id, "task approved");
        Ok(task)
    }

    /// Record a human rejection. With `regenerate` the task loops back to
    /// `queued` (stale content cleared) and a fresh job is enqueued, so the
    /// same run path handles the redo.
    #[instrument(skip(self, reason), fields(task_id = %task_id, regenerate))]
    pub async fn reject(
        &self,
        task_id: &TaskId,
        reason: Option<String>,
        regenerate: bool,
    ) -> Result<RejectOutcome, PipelineError> {
        // Read first: the pre-rejection content feeds the feedback record
        // even when regeneration clears it from the row.
        let existing = self
            .store
            .get(task_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(task_id.to_string()))?;
        let judged_content = existing.content.clone();

        let (next, patch) = if regenerate {
            (TaskStatus::Queued, ContentPatch::Clear)
        } else {
            (TaskStatus::Rejected, ContentPatch::Keep)
        };

        let transition = self
            .store
            .transition(task_id, TaskStatus::PendingApproval, next, patch)
            .await?;

        let task = match transition {
            Transition::Applied(task) => task,
            Transition::Conflict { actual } => {
                return Err(PipelineError::InvalidStatus {
                    actual,
                    expected: TaskStatus::PendingApproval,
                });
            }
            Transition::NotFound => {
                return Err(PipelineError::NotFound(task_id.to_string()));
            }
        };

        let mut feedback = FeedbackInput::decision(
            task.tenant.as_str(),
            task.id.as_str(),
            FeedbackType::Rejected,
        );
        if let Some(content) = judged_content.as_deref() {
            feedback = feedback.with_original_content(content);
        }
        if let Some(reason) = reason {
            feedback = feedback.with_rejection_reason(reason);
        }
        self.send_feedback(feedback).await;

        let job_id = if regenerate {
            let job = Job::new(task.id.clone(), task.tenant.clone());
            match self.dispatcher.enqueue(&job).await {
                Ok(job_id) => job_id,
                Err(e) => {
                    warn!(task_id = %task.id, error = %e, "regeneration enqueue failed");
                    None
                }
            }
        } else {
            None
        };

        info!(task_id = %task.id, regenerate, "task rejected");
        Ok(RejectOutcome {
            task,
            will_regenerate: regenerate,
            job_id,
        })
    }

    /// Fetch a task by id.
    pub async fn get(&self, task_id: &TaskId) -> Result<Task, PipelineError> {
        self.store
            .get(task_id)
            .await?
            .ok_or_else(|| PipelineError::NotFound(task_id.to_string()))
    }

    /// Wait for all in-flight event emissions to finish.
    pub async fn shutdown(&self) {
        self.event_tracker.close();
        self.event_tracker.wait().await;
        info!("pipeline shutdown complete");
    }

    /// Spawn a tracked fire-and-forget event emission.
    fn emit(&self, event: Event) {
        let emitter = Arc::clone(&self.events);
        self.event_tracker.spawn(async move {
            let _ = emitter.log_event(&event).await;
        });
    }

    /// Attempt a feedback call whose failure only warns.
    async fn send_feedback(&self, input: FeedbackInput) {
        if let Err(e) = self.insights.send_feedback(&input).await {
            warn!(
                content_id = %input.content_id,
                feedback_type = %input.feedback_type,
                error = %e,
                "feedback delivery failed"
            );
        }
    }
}

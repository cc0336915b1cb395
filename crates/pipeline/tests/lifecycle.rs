//! Lifecycle tests for the task pipeline against stubbed upstream services.

use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use axum::routing::{get, post};

use copydesk_auth::{AuthConfig, TokenAuthority};
use copydesk_client::{RequestOptions, ResilientClient};
use copydesk_core::{BriefInput, Job, JobId, TaskId, TaskStatus};
use copydesk_events::{EventEmitter, EventsConfig};
use copydesk_generation::{GenerationConfig, GenerationGateway};
use copydesk_insights::{InsightsConfig, InsightsGateway};
use copydesk_pipeline::{PipelineError, TaskPipeline};
use copydesk_queue::{JobDispatcher, QueueError};
use copydesk_store::MemoryTaskStore;

/// Observed traffic at the stub upstreams.
#[derive(Clone, Default)]
struct Upstreams {
    generation_calls: Arc<AtomicU32>,
    generation_down: Arc<AtomicBool>,
    feedback_types: Arc<Mutex<Vec<String>>>,
    events: Arc<Mutex<Vec<String>>>,
}

async fn spawn_upstreams(state: Upstreams) -> SocketAddr {
    async fn llm(State(s): State<Upstreams>) -> (StatusCode, Json<serde_json::Value>) {
        s.generation_calls.fetch_add(1, Ordering::SeqCst);
        if s.generation_down.load(Ordering::SeqCst) {
            return (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(serde_json::json!({"error": "hub down"})),
            );
        }
        (
            StatusCode::OK,
            Json(serde_json::json!({
                "output": r##"{"content":"☕ Fresh espresso, bold mornings","hashtags":["#coffee"],"imagePrompt":"espresso macro shot"}"##
            })),
        )
    }

    async fn hints() -> Json<serde_json::Value> {
        Json(serde_json::json!({"hints": {"tone": "warm"}}))
    }

    async fn feedback(
        State(s): State<Upstreams>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        s.feedback_types
            .lock()
            .unwrap()
            .push(body["action"].as_str().unwrap_or_default().to_owned());
        Json(serde_json::json!({"ok": true}))
    }

    async fn learning() -> Json<serde_json::Value> {
        Json(serde_json::json!({"ok": true}))
    }

    async fn log_event(
        State(s): State<Upstreams>,
        Json(body): Json<serde_json::Value>,
    ) -> Json<serde_json::Value> {
        s.events
            .lock()
            .unwrap()
            .push(body["eventType"].as_str().unwrap_or_default().to_owned());
        Json(serde_json::json!({"ok": true}))
    }

    async fn profile() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    let app = axum::Router::new()
        .route("/v1/llm/generate", post(llm))
        .route("/v1/insights/hints/writer", get(hints))
        .route("/v1/metrics/feedback", post(feedback))
        .route("/v1/insights/learning-event", post(learning))
        .route("/v1/events/log", post(log_event))
        .route("/v1/brand/profile/{tenant}", get(profile))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

/// Dispatcher that records enqueued jobs and returns broker ids.
#[derive(Default)]
struct RecordingDispatcher {
    jobs: Mutex<Vec<Job>>,
}

#[async_trait]
impl JobDispatcher for RecordingDispatcher {
    async fn enqueue(&self, job: &Job) -> Result<Option<JobId>, QueueError> {
        self.jobs.lock().unwrap().push(job.clone());
        Ok(Some(JobId::generate()))
    }

    fn is_backed(&self) -> bool {
        true
    }
}

struct Harness {
    pipeline: TaskPipeline,
    upstreams: Upstreams,
    dispatcher: Arc<RecordingDispatcher>,
    store: Arc<MemoryTaskStore>,
}

async fn harness() -> Harness {
    let upstreams = Upstreams::default();
    let addr = spawn_upstreams(upstreams.clone()).await;
    let base = format!("http://{addr}");

    let opts = RequestOptions::default()
        .with_timeout(Duration::from_secs(2))
        .with_max_retries(0)
        .with_retry_delay(Duration::from_millis(1));
    let client = ResilientClient::new(opts).unwrap();
    let authority = Arc::new(TokenAuthority::new(AuthConfig::new("test-secret-value")));

    let store = Arc::new(MemoryTaskStore::new());
    let dispatcher = Arc::new(RecordingDispatcher::default());

    let pipeline = TaskPipeline::new(
        Arc::clone(&store) as _,
        Arc::clone(&dispatcher) as _,
        Arc::new(GenerationGateway::new(
            client.clone(),
            Arc::clone(&authority),
            GenerationConfig::new(base.clone(), base.clone()),
        )),
        Arc::new(InsightsGateway::new(
            client.clone(),
            Arc::clone(&authority),
            InsightsConfig {
                base_url: base.clone(),
            },
        )),
        Arc::new(EventEmitter::new(
            client,
            authority,
            EventsConfig { base_url: base },
        )),
    );

    Harness {
        pipeline,
        upstreams,
        dispatcher,
        store,
    }
}

fn brief(tenant: &str, text: &str) -> BriefInput {
    BriefInput {
        tenant_id: tenant.into(),
        brief: text.into(),
        tone: None,
        audience: None,
        platform: None,
    }
}

#[tokio::test]
async fn submit_creates_queued_task_and_enqueues() {
    let h = harness().await;

    let outcome = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();

    assert_eq!(outcome.task.status, TaskStatus::Queued);
    assert!(outcome.task.content.is_none());
    assert!(outcome.job_id.is_some());
    assert_eq!(h.dispatcher.jobs.lock().unwrap().len(), 1);
}

#[tokio::test]
async fn submit_rejects_invalid_payloads() {
    let h = harness().await;

    assert!(matches!(
        h.pipeline.submit(brief("", "long enough brief")).await,
        Err(PipelineError::Validation(_))
    ));
    assert!(matches!(
        h.pipeline.submit(brief("t1", "tiny")).await,
        Err(PipelineError::Validation(_))
    ));
    assert!(h.store.is_empty(), "invalid submissions must not persist");
}

#[tokio::test]
async fn run_moves_queued_task_to_pending_approval() {
    let h = harness().await;
    let submitted = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();

    let outcome = h.pipeline.run(&submitted.task.id).await.unwrap();

    assert_eq!(outcome.task.status, TaskStatus::PendingApproval);
    assert_eq!(
        outcome.task.content.as_deref(),
        Some("☕ Fresh espresso, bold mornings")
    );
    assert_eq!(outcome.hashtags, vec!["#coffee"]);
    assert_eq!(outcome.image_prompt, "espresso macro shot");

    // Lifecycle events are fire-and-forget; drain before asserting.
    h.pipeline.shutdown().await;
    let events = h.upstreams.events.lock().unwrap();
    assert!(events.contains(&"agent.writer.run.start".to_owned()));
    assert!(events.contains(&"agent.writer.run.pending_approval".to_owned()));
}

#[tokio::test]
async fn run_failure_leaves_task_untouched() {
    let h = harness().await;
    let submitted = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();

    h.upstreams.generation_down.store(true, Ordering::SeqCst);
    let err = h.pipeline.run(&submitted.task.id).await.unwrap_err();
    assert!(matches!(err, PipelineError::Generation(_)));

    let task = h.pipeline.get(&submitted.task.id).await.unwrap();
    assert_eq!(task.status, TaskStatus::Queued, "safe to retry");
    assert!(task.content.is_none());

    // A retry after recovery succeeds.
    h.upstreams.generation_down.store(false, Ordering::SeqCst);
    let outcome = h.pipeline.run(&submitted.task.id).await.unwrap();
    assert_eq!(outcome.task.status, TaskStatus::PendingApproval);
}

#[tokio::test]
async fn run_unknown_task_is_not_found() {
    let h = harness().await;
    assert!(matches!(
        h.pipeline.run(&TaskId::new("no-such-task")).await,
        Err(PipelineError::NotFound(_))
    ));
    assert_eq!(h.upstreams.generation_calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn approve_requires_pending_approval() {
    let h = harness().await;
    let submitted = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();

    // queued -> approve is invalid
    match h.pipeline.approve(&submitted.task.id).await.unwrap_err() {
        PipelineError::InvalidStatus { actual, expected } => {
            assert_eq!(actual, TaskStatus::Queued);
            assert_eq!(expected, TaskStatus::PendingApproval);
        }
        other => panic!("expected InvalidStatus, got {other:?}"),
    }

    h.pipeline.run(&submitted.task.id).await.unwrap();
    let approved = h.pipeline.approve(&submitted.task.id).await.unwrap();
    assert_eq!(approved.status, TaskStatus::Approved);

    // approved -> approve again is invalid
    assert!(matches!(
        h.pipeline.approve(&submitted.task.id).await,
        Err(PipelineError::InvalidStatus { .. })
    ));

    // rejected tasks cannot be approved either
    let second = h
        .pipeline
        .submit(brief("t1", "Another campaign brief"))
        .await
        .unwrap();
    h.pipeline.run(&second.task.id).await.unwrap();
    h.pipeline
        .reject(&second.task.id, None, false)
        .await
        .unwrap();
    assert!(matches!(
        h.pipeline.approve(&second.task.id).await,
        Err(PipelineError::InvalidStatus { .. })
    ));
}

#[tokio::test]
async fn reject_without_regenerate_is_terminal() {
    let h = harness().await;
    let submitted = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();
    h.pipeline.run(&submitted.task.id).await.unwrap();

    let outcome = h
        .pipeline
        .reject(&submitted.task.id, Some("off brand".into()), false)
        .await
        .unwrap();

    assert_eq!(outcome.task.status, TaskStatus::Rejected);
    assert!(!outcome.will_regenerate);
    assert!(outcome.job_id.is_none());
    assert!(outcome.task.content.is_some(), "content kept for audit");

    let feedback = h.upstreams.feedback_types.lock().unwrap();
    assert_eq!(feedback.as_slice(), ["rejected"]);
}

#[tokio::test]
async fn reject_with_regenerate_loops_back_to_queued() {
    let h = harness().await;
    let submitted = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();
    h.pipeline.run(&submitted.task.id).await.unwrap();

    let outcome = h
        .pipeline
        .reject(&submitted.task.id, Some("try again".into()), true)
        .await
        .unwrap();

    assert_eq!(outcome.task.status, TaskStatus::Queued);
    assert!(outcome.will_regenerate);
    assert!(outcome.job_id.is_some());
    assert!(
        outcome.task.content.is_none(),
        "stale content cleared on requeue"
    );

    // submit + regeneration = two enqueued jobs for the same task path.
    assert_eq!(h.dispatcher.jobs.lock().unwrap().len(), 2);

    // The same run path picks the task up again.
    let rerun = h.pipeline.run(&submitted.task.id).await.unwrap();
    assert_eq!(rerun.task.status, TaskStatus::PendingApproval);
}

#[tokio::test]
async fn end_to_end_submit_run_approve_with_feedback() {
    let h = harness().await;

    let submitted = h
        .pipeline
        .submit(brief("t1", "Launch our new espresso blend"))
        .await
        .unwrap();
    assert_eq!(submitted.task.status, TaskStatus::Queued);

    let run = h.pipeline.run(&submitted.task.id).await.unwrap();
    assert_eq!(run.task.status, TaskStatus::PendingApproval);
    assert!(!run.task.content.as_deref().unwrap_or_default().is_empty());

    let approved = h.pipeline.approve(&submitted.task.id).await.unwrap();
    assert_eq!(approved.status, TaskStatus::Approved);

    let feedback = h.upstreams.feedback_types.lock().unwrap();
    assert_eq!(feedback.as_slice(), ["approved"]);
}

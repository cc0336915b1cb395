//! Router-level tests: auth, tenant isolation, and the full
//! submit → run → approve/reject lifecycle over HTTP.

use std::net::SocketAddr;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::{Request, StatusCode};
use axum::routing::{get, post};
use tower::ServiceExt;

use copydesk_auth::{AuthConfig, TokenAuthority};
use copydesk_client::{RequestOptions, ResilientClient};
use copydesk_core::{Job, JobId};
use copydesk_events::{EventEmitter, EventsConfig};
use copydesk_generation::{GenerationConfig, GenerationGateway};
use copydesk_insights::{InsightsConfig, InsightsGateway};
use copydesk_pipeline::TaskPipeline;
use copydesk_queue::{JobDispatcher, NoopDispatcher, QueueError};
use copydesk_server::api::{AppState, router};
use copydesk_store::MemoryTaskStore;

const DEV_SECRET: &str = "test-dev-secret";

// -- Stub upstreams -------------------------------------------------------

#[derive(Clone, Default)]
struct Upstreams {
    feedback_types: Arc<Mutex<Vec<String>>>,
}

async fn spawn_upstreams(state: Upstreams) -> SocketAddr {
    async fn llm() -> Json<serde_json::Value> {
        Json(serde_json::json!({
            "output": r##"{"content":"☕ Espresso time","hashtags":["#coffee"],"imagePrompt":"macro shot"}"##
        }))
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
    async fn ok() -> Json<serde_json::Value> {
        Json(serde_json::json!({"ok": true}))
    }
    async fn profile() -> StatusCode {
        StatusCode::NOT_FOUND
    }

    let app = axum::Router::new()
        .route("/v1/llm/generate", post(llm))
        .route("/v1/insights/hints/writer", get(hints))
        .route("/v1/metrics/feedback", post(feedback))
        .route("/v1/insights/learning-event", post(ok))
        .route("/v1/events/log", post(ok))
        .route("/v1/brand/profile/{tenant}", get(profile))
        .with_state(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
    addr
}

// -- Harness --------------------------------------------------------------

/// Dispatcher standing in for a live broker.
struct BackedDispatcher;

#[async_trait]
impl JobDispatcher for BackedDispatcher {
    async fn enqueue(&self, _job: &Job) -> Result<Option<JobId>, QueueError> {
        Ok(Some(JobId::new("job-42")))
    }

    fn is_backed(&self) -> bool {
        true
    }
}

struct Harness {
    app: axum::Router,
    authority: Arc<TokenAuthority>,
    upstreams: Upstreams,
}

async fn harness() -> Harness {
    harness_with(Arc::new(NoopDispatcher)).await
}

async fn harness_with(dispatcher: Arc<dyn JobDispatcher>) -> Harness {
    let upstreams = Upstreams::default();
    let addr = spawn_upstreams(upstreams.clone()).await;
    let base = format!("http://{addr}");

    let authority = Arc::new(TokenAuthority::new(
        AuthConfig::new("test-secret-value-0123").with_dev_admin_secret(DEV_SECRET),
    ));
    let client = ResilientClient::new(
        RequestOptions::default()
            .with_timeout(Duration::from_secs(2))
            .with_max_retries(0)
            .with_retry_delay(Duration::from_millis(1)),
    )
    .unwrap();

    let store = Arc::new(MemoryTaskStore::new());
    let insights = Arc::new(InsightsGateway::new(
        client.clone(),
        Arc::clone(&authority),
        InsightsConfig {
            base_url: base.clone(),
        },
    ));
    let pipeline = Arc::new(TaskPipeline::new(
        Arc::clone(&store) as _,
        dispatcher,
        Arc::new(GenerationGateway::new(
            client.clone(),
            Arc::clone(&authority),
            GenerationConfig::new(base.clone(), base.clone()),
        )),
        Arc::clone(&insights),
        Arc::new(EventEmitter::new(
            client,
            Arc::clone(&authority),
            EventsConfig { base_url: base },
        )),
    ));

    let state = AppState {
        pipeline,
        authority: Arc::clone(&authority),
        insights,
        store,
        service_name: "copydesk-writer".to_owned(),
    };

    Harness {
        app: router(state),
        authority,
        upstreams,
    }
}

impl Harness {
    async fn send(&self, request: Request<Body>) -> (StatusCode, serde_json::Value) {
        let response = self.app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        let json = if bytes.is_empty() {
            serde_json::Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }
}

fn get_request(uri: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder().uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::empty()).unwrap()
}

fn post_request(uri: &str, token: Option<&str>, body: &serde_json::Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {token}"));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn brief_body(tenant: &str) -> serde_json::Value {
    serde_json::json!({
        "tenantId": tenant,
        "brief": "Launch our new espresso blend",
        "tone": "playful",
    })
}

// -- Tests ----------------------------------------------------------------

#[tokio::test]
async fn healthz_needs_no_auth() {
    let h = harness().await;
    let (status, body) = h.send(get_request("/healthz", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["service"], "copydesk-writer");
}

#[tokio::test]
async fn readyz_reports_store_reachability() {
    let h = harness().await;
    let (status, body) = h.send(get_request("/readyz", None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ready"], true);
}

#[tokio::test]
async fn protected_routes_reject_missing_or_bad_tokens() {
    let h = harness().await;

    let (status, _) = h
        .send(post_request("/v1/write/brief", None, &brief_body("t1")))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = h
        .send(post_request(
            "/v1/write/brief",
            Some("garbage"),
            &brief_body("t1"),
        ))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn dev_mint_requires_the_admin_secret() {
    let h = harness().await;

    let bad = Request::builder()
        .method("POST")
        .uri("/v1/dev/mint")
        .header("content-type", "application/json")
        .header("x-dev-secret", "wrong")
        .body(Body::from(r#"{"name":"t1"}"#))
        .unwrap();
    let (status, _) = h.send(bad).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let good = Request::builder()
        .method("POST")
        .uri("/v1/dev/mint")
        .header("content-type", "application/json")
        .header("x-dev-secret", DEV_SECRET)
        .body(Body::from(r#"{"name":"t1"}"#))
        .unwrap();
    let (status, body) = h.send(good).await;
    assert_eq!(status, StatusCode::OK);
    let token = body["token"].as_str().unwrap();
    assert!(h.authority.verify(token).is_ok());
}

#[tokio::test]
async fn dev_token_is_tenant_scoped() {
    let h = harness().await;
    // A dev token's subject is the tenant it may act on.
    let token = h.authority.issue_dev("t1", DEV_SECRET).unwrap();

    let (status, _) = h
        .send(post_request(
            "/v1/write/brief",
            Some(&token),
            &brief_body("t1"),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);

    let (status, body) = h
        .send(post_request(
            "/v1/write/brief",
            Some(&token),
            &brief_body("t2"),
        ))
        .await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    assert!(body["error"].as_str().unwrap().contains("t2"));
}

#[tokio::test]
async fn internal_token_acts_on_any_tenant() {
    let h = harness().await;
    let token = h.authority.issue_internal("writer").unwrap();

    for tenant in ["t1", "t2"] {
        let (status, _) = h
            .send(post_request(
                "/v1/write/brief",
                Some(&token),
                &brief_body(tenant),
            ))
            .await;
        assert_eq!(status, StatusCode::CREATED);
    }
}

#[tokio::test]
async fn submit_with_backed_queue_is_accepted_async() {
    let h = harness_with(Arc::new(BackedDispatcher)).await;
    let token = h.authority.issue_internal("writer").unwrap();

    let (status, body) = h
        .send(post_request(
            "/v1/write/brief",
            Some(&token),
            &brief_body("t1"),
        ))
        .await;
    assert_eq!(status, StatusCode::ACCEPTED);
    assert_eq!(body["status"], "queued");
    assert_eq!(body["async"], true);
    assert_eq!(body["jobId"], "job-42");
}

#[tokio::test]
async fn submit_validation_errors_are_400() {
    let h = harness().await;
    let token = h.authority.issue_internal("writer").unwrap();

    let (status, body) = h
        .send(post_request(
            "/v1/write/brief",
            Some(&token),
            &serde_json::json!({"tenantId": "t1", "brief": "tiny"}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "validation_error");
    assert_eq!(body["details"]["field"], "brief");
}

#[tokio::test]
async fn run_of_unknown_task_is_404() {
    let h = harness().await;
    let token = h.authority.issue_internal("writer").unwrap();

    let (status, body) = h
        .send(post_request(
            "/v1/write/run",
            Some(&token),
            &serde_json::json!({"taskId": "no-such-task"}),
        ))
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "not found");
}

#[tokio::test]
async fn full_lifecycle_over_http() {
    let h = harness().await;
    let token = h.authority.issue_internal("writer").unwrap();

    // Submit: brokerless, so 201 and status queued with no content.
    let (status, task) = h
        .send(post_request(
            "/v1/write/brief",
            Some(&token),
            &brief_body("t1"),
        ))
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(task["status"], "queued");
    assert!(task["content"].is_null());
    let task_id = task["id"].as_str().unwrap().to_owned();

    // Run: generation lands in the approval gate.
    let (status, run) = h
        .send(post_request(
            "/v1/write/run",
            Some(&token),
            &serde_json::json!({"taskId": task_id}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(run["status"], "pending_approval");
    assert_eq!(run["content"], "☕ Espresso time");
    assert_eq!(run["imagePrompt"], "macro shot");
    assert_eq!(run["hashtags"][0], "#coffee");

    // Read it back.
    let (status, fetched) = h
        .send(get_request(&format!("/v1/write/{task_id}"), Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["status"], "pending_approval");

    // Approve; a positive feedback call reaches insights.
    let (status, body) = h
        .send(post_request(
            &format!("/v1/writer/approve/{task_id}"),
            Some(&token),
            &serde_json::json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["task"]["status"], "approved");
    assert_eq!(
        h.upstreams.feedback_types.lock().unwrap().as_slice(),
        ["approved"]
    );

    // A second approve hits the state-machine guard.
    let (status, body) = h
        .send(post_request(
            &format!("/v1/writer/approve/{task_id}"),
            Some(&token),
            &serde_json::json!({}),
        ))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["error"], "invalid_status");
    assert!(
        body["message"]
            .as_str()
            .unwrap()
            .contains("expected pending_approval")
    );
}

#[tokio::test]
async fn reject_with_regenerate_requeues_over_http() {
    let h = harness().await;
    let token = h.authority.issue_internal("writer").unwrap();

    let (_, task) = h
        .send(post_request(
            "/v1/write/brief",
            Some(&token),
            &brief_body("t1"),
        ))
        .await;
    let task_id = task["id"].as_str().unwrap().to_owned();

    let (status, _) = h
        .send(post_request(
            "/v1/write/run",
            Some(&token),
            &serde_json::json!({"taskId": task_id}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = h
        .send(post_request(
            &format!("/v1/writer/reject/{task_id}"),
            Some(&token),
            &serde_json::json!({"reason": "off brand", "regenerate": true}),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["willRegenerate"], true);
    assert_eq!(body["task"]["status"], "queued");
    assert!(body["task"]["content"].is_null());
    assert_eq!(
        h.upstreams.feedback_types.lock().unwrap().as_slice(),
        ["rejected"]
    );
}

#[tokio::test]
async fn hints_requires_tenant_and_forwards() {
    let h = harness().await;
    let token = h.authority.issue_internal("writer").unwrap();

    let (status, _) = h.send(get_request("/v1/writer/hints", Some(&token))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = h
        .send(get_request("/v1/writer/hints?tenantId=t1", Some(&token)))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["hints"]["tone"], "warm");
}

#[tokio::test]
async fn feedback_passthrough_reports_ack() {
    let h = harness().await;
    let token = h.authority.issue_dev("t1", DEV_SECRET).unwrap();

    let (status, body) = h
        .send(post_request(
            "/v1/writer/feedback",
            Some(&token),
            &serde_json::json!({
                "tenantId": "t1",
                "contentId": "task-9",
                "feedbackType": "edited",
                "editedContent": "better copy",
            }),
        ))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["ok"], true);
    assert_eq!(body["feedbackType"], "edited");
    assert_eq!(body["insightsResponse"]["ok"], true);
    assert_eq!(
        h.upstreams.feedback_types.lock().unwrap().as_slice(),
        ["edited"]
    );
}

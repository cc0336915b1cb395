pub mod auth;
pub mod health;
pub mod write;
pub mod writer;

use std::sync::Arc;

use axum::Router;
use axum::middleware;
use axum::routing::{get, post};
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

use copydesk_auth::TokenAuthority;
use copydesk_insights::InsightsGateway;
use copydesk_pipeline::TaskPipeline;
use copydesk_store::TaskStore;

/// Shared application state passed to all handlers.
#[derive(Clone)]
pub struct AppState {
    /// The lifecycle pipeline.
    pub pipeline: Arc<TaskPipeline>,
    /// Token issuance and verification.
    pub authority: Arc<TokenAuthority>,
    /// Direct insights access for the feedback/hints passthrough routes.
    pub insights: Arc<InsightsGateway>,
    /// Store handle for the readiness probe.
    pub store: Arc<dyn TaskStore>,
    /// This service's name, reported by the liveness probe.
    pub service_name: String,
}

/// Build the axum router with all routes and middleware.
pub fn router(state: AppState) -> Router {
    let public = Router::new()
        // Probes are unauthenticated by design.
        .route("/healthz", get(health::healthz))
        .route("/readyz", get(health::readyz))
        // Gated by the dev admin secret instead of a bearer token.
        .route("/v1/dev/mint", post(auth::mint_dev_token));

    let protected = Router::new()
        .route("/v1/write/brief", post(write::submit_brief))
        .route("/v1/write/run", post(write::run_task))
        .route("/v1/write/{id}", get(write::get_task))
        .route("/v1/writer/feedback", post(writer::feedback))
        .route("/v1/writer/hints", get(writer::hints))
        .route("/v1/writer/approve/{task_id}", post(writer::approve))
        .route("/v1/writer/reject/{task_id}", post(writer::reject))
        .layer(middleware::from_fn_with_state(
            state.clone(),
            auth::require_auth,
        ));

    public
        .merge(protected)
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(state)
}

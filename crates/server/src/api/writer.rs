use axum::Json;
use axum::extract::{Path, Query, State};
use serde::Deserialize;

use copydesk_auth::Claims;
use copydesk_core::{FeedbackInput, TaskId, ValidationError};

use crate::error::ServerError;

use super::AppState;

/// `POST /v1/writer/feedback` — forward a feedback record to insights.
///
/// The primary write is required; its failure surfaces as 502. The
/// advisory learning event never affects the response.
pub async fn feedback(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(input): Json<FeedbackInput>,
) -> Result<Json<serde_json::Value>, ServerError> {
    state
        .authority
        .authorize_tenant(&claims, Some(&input.tenant_id))?;

    let ack = state.insights.send_feedback(&input).await?;

    Ok(Json(serde_json::json!({
        "ok": true,
        "feedbackType": input.feedback_type,
        "insightsResponse": ack.response,
    })))
}

/// Query parameters for the hints route.
#[derive(Debug, Deserialize)]
pub struct HintsQuery {
    #[serde(rename = "tenantId")]
    pub tenant_id: Option<String>,
}

/// `GET /v1/writer/hints?tenantId=` — fetch generation hints.
pub async fn hints(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Query(query): Query<HintsQuery>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let tenant_id = query
        .tenant_id
        .filter(|t| !t.is_empty())
        .ok_or_else(|| ValidationError::new("tenantId", "required"))?;
    state
        .authority
        .authorize_tenant(&claims, Some(&tenant_id))?;

    let hints = state.insights.hints(&tenant_id).await;
    Ok(Json(serde_json::json!({ "hints": hints })))
}

/// `POST /v1/writer/approve/{task_id}` — record a human approval.
pub async fn approve(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Path(task_id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let task_id = TaskId::new(task_id);

    let task = state.pipeline.get(&task_id).await?;
    state
        .authority
        .authorize_tenant(&claims, Some(task.tenant.as_str()))?;

    let approved = state.pipeline.approve(&task_id).await?;
    Ok(Json(serde_json::json!({ "task": approved })))
}

/// Body of a reject request.
#[derive(Debug, Default, Deserialize)]
pub struct RejectRequest {
    pub reason: Option<String>,
    #[serde(default)]
    pub regenerate: bool,
}

/// `POST /v1/writer/reject/{task_id}` — record a human rejection,
/// optionally looping the task back for regeneration.
pub async fn reject(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Path(task_id): Path<String>,
    body: Option<Json<RejectRequest>>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let task_id = TaskId::new(task_id);
    let request = body.map(|Json(b)| b).unwrap_or_default();

    let task = state.pipeline.get(&task_id).await?;
    state
        .authority
        .authorize_tenant(&claims, Some(task.tenant.as_str()))?;

    let outcome = state
        .pipeline
        .reject(&task_id, request.reason, request.regenerate)
        .await?;

    let mut body = serde_json::json!({
        "task": outcome.task,
        "willRegenerate": outcome.will_regenerate,
    });
    if let (Some(obj), Some(job_id)) = (body.as_object_mut(), outcome.job_id) {
        obj.insert("jobId".to_owned(), serde_json::json!(job_id));
    }
    Ok(Json(body))
}

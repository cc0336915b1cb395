use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use serde::Deserialize;

use copydesk_auth::Claims;
use copydesk_core::{BriefInput, Task, TaskId};

use crate::error::ServerError;

use super::AppState;

fn task_json(task: &Task) -> serde_json::Value {
    serde_json::to_value(task).unwrap_or_else(|_| serde_json::json!({}))
}

/// `POST /v1/write/brief` — accept a brief and create a queued task.
///
/// Replies 202 with the broker job id when a queue accepted the work,
/// otherwise 201 and the caller (or an external trigger) drives the run.
pub async fn submit_brief(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(input): Json<BriefInput>,
) -> Result<impl IntoResponse, ServerError> {
    state
        .authority
        .authorize_tenant(&claims, Some(&input.tenant_id))?;

    let outcome = state.pipeline.submit(input).await?;

    let mut body = task_json(&outcome.task);
    if let Some(job_id) = outcome.job_id {
        if let Some(obj) = body.as_object_mut() {
            obj.insert("async".to_owned(), serde_json::json!(true));
            obj.insert("jobId".to_owned(), serde_json::json!(job_id));
        }
        Ok((StatusCode::ACCEPTED, Json(body)))
    } else {
        Ok((StatusCode::CREATED, Json(body)))
    }
}

/// Body of a run request.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RunRequest {
    pub task_id: String,
}

/// `POST /v1/write/run` — drive one task through generation.
///
/// Called by the worker for queued jobs and by direct callers for
/// synchronous processing; both take exactly this path.
pub async fn run_task(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Json(request): Json<RunRequest>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let task_id = TaskId::new(request.task_id);

    // The tenant lives on the task row, so fetch before authorizing.
    let task = state.pipeline.get(&task_id).await?;
    state
        .authority
        .authorize_tenant(&claims, Some(task.tenant.as_str()))?;

    let outcome = state.pipeline.run(&task_id).await?;

    let mut body = task_json(&outcome.task);
    if let Some(obj) = body.as_object_mut() {
        obj.insert(
            "imagePrompt".to_owned(),
            serde_json::json!(outcome.image_prompt),
        );
        obj.insert("hashtags".to_owned(), serde_json::json!(outcome.hashtags));
    }
    Ok(Json(body))
}

/// `GET /v1/write/{id}` — fetch a task.
pub async fn get_task(
    State(state): State<AppState>,
    axum::Extension(claims): axum::Extension<Claims>,
    Path(id): Path<String>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let task = state.pipeline.get(&TaskId::new(id)).await?;
    state
        .authority
        .authorize_tenant(&claims, Some(task.tenant.as_str()))?;
    Ok(Json(task_json(&task)))
}

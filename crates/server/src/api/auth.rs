use axum::Json;
use axum::extract::{Request, State};
use axum::http::HeaderMap;
use axum::http::header::AUTHORIZATION;
use axum::middleware::Next;
use axum::response::Response;
use serde::Deserialize;

use crate::error::ServerError;

use super::AppState;

/// Bearer-token middleware for all protected routes.
///
/// Verifies the token and stashes the decoded claims in request extensions;
/// tenant authorization happens per-route, where the requested tenant is
/// known.
pub async fn require_auth(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Result<Response, ServerError> {
    let header = request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let token = header.strip_prefix("Bearer ").unwrap_or_default();

    let claims = state.authority.verify(token)?;
    request.extensions_mut().insert(claims);
    Ok(next.run(request).await)
}

/// Body of a dev mint request.
#[derive(Debug, Default, Deserialize)]
pub struct MintRequest {
    /// Subject to mint the token for; defaults to `svc:cli`.
    pub name: Option<String>,
}

/// `POST /v1/dev/mint` — mint a 1-hour dev token.
///
/// Requires the `x-dev-secret` header to match the configured admin secret;
/// no bearer token is needed since this is how callers bootstrap one.
pub async fn mint_dev_token(
    State(state): State<AppState>,
    headers: HeaderMap,
    body: Option<Json<MintRequest>>,
) -> Result<Json<serde_json::Value>, ServerError> {
    let presented = headers
        .get("x-dev-secret")
        .and_then(|v| v.to_str().ok())
        .unwrap_or_default();
    let name = body
        .and_then(|Json(b)| b.name)
        .unwrap_or_else(|| "svc:cli".to_owned());

    let token = state.authority.issue_dev(&name, presented)?;
    Ok(Json(serde_json::json!({ "token": token })))
}

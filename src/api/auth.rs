use axum::{
    body::Body,
    extract::State,
    http::{header, Request, StatusCode},
    middleware::Next,
    response::Response,
};

use crate::api::AppState;

fn bearer(request: &Request<Body>) -> Option<&str> {
    request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .filter(|token| !token.is_empty())
}

/// Guards management endpoints with `api.api_key`.
pub async fn api_key_auth(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authorized = bearer(&request) == Some(state.ctx.config.load().api.api_key.as_str());
    if authorized {
        return Ok(next.run(request).await);
    }
    tracing::warn!(path = %request.uri().path(), "Rejected management request with bad credentials");
    Err(StatusCode::UNAUTHORIZED)
}

/// Guards the agent push endpoint with `api.agent_token`.
pub async fn agent_token_auth(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, StatusCode> {
    let authorized = bearer(&request) == Some(state.ctx.config.load().api.agent_token.as_str());
    if authorized {
        return Ok(next.run(request).await);
    }
    crate::observability::metrics::record_agent_report("unauthorized");
    tracing::warn!("Rejected agent report with bad token");
    Err(StatusCode::UNAUTHORIZED)
}

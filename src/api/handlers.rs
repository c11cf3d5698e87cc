use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::api::AppState;
use crate::collectors::push::{handle_report, AgentReport, PushError, PushSummary};
use crate::status::AggregateStatus;
use crate::store::{ResourceKey, ResourceKind, StatusRecord, StatusSource};

#[derive(Serialize)]
pub struct SystemStatus {
    pub version: &'static str,
    pub status: &'static str,
    pub tracked_resources: usize,
}

/// A stored status as returned by the API.
#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceView {
    pub key: String,
    pub status: AggregateStatus,
    pub label: String,
    pub source: StatusSource,
    pub container_count: usize,
    pub updated_at: u64,
}

impl ResourceView {
    fn new(key: &ResourceKey, record: &StatusRecord) -> Self {
        Self {
            key: key.to_string(),
            status: record.status,
            label: record.label(),
            source: record.source,
            container_count: record.container_count,
            updated_at: record.updated_at,
        }
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ResourceDetail {
    #[serde(flatten)]
    pub resource: ResourceView,
    /// Sub-resources of a service, placements of a multi-server application.
    pub children: Vec<ResourceView>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeployingRequest {
    pub deploying: bool,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DeployingResponse {
    pub resource: String,
    pub deploying: bool,
}

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("unknown resource kind: {0}")]
    UnknownKind(String),

    #[error("resource not found: {0}")]
    NotFound(String),

    #[error(transparent)]
    Push(#[from] PushError),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = match &self {
            ApiError::UnknownKind(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) | ApiError::Push(PushError::UnknownServer(_)) => StatusCode::NOT_FOUND,
        };
        (status, Json(serde_json::json!({ "error": self.to_string() }))).into_response()
    }
}

fn top_level_key(kind: &str, id: String) -> Result<ResourceKey, ApiError> {
    match ResourceKind::parse(kind) {
        Some(ResourceKind::Application) => Ok(ResourceKey::application(id)),
        Some(ResourceKind::Service) => Ok(ResourceKey::service(id)),
        None => Err(ApiError::UnknownKind(kind.to_string())),
    }
}

pub async fn get_health(State(state): State<AppState>) -> Json<SystemStatus> {
    Json(SystemStatus {
        version: env!("CARGO_PKG_VERSION"),
        status: "operational",
        tracked_resources: state.ctx.store.len(),
    })
}

pub async fn list_resources(State(state): State<AppState>) -> Json<Vec<ResourceView>> {
    let views = state
        .ctx
        .store
        .snapshot()
        .iter()
        .map(|(key, record)| ResourceView::new(key, record))
        .collect();
    Json(views)
}

pub async fn get_resource(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
) -> Result<Json<ResourceDetail>, ApiError> {
    let key = top_level_key(&kind, id)?;
    let record = state
        .ctx
        .store
        .get(&key)
        .ok_or_else(|| ApiError::NotFound(key.to_string()))?;
    let children = state
        .ctx
        .store
        .children(&key)
        .iter()
        .map(|(k, r)| ResourceView::new(k, r))
        .collect();

    Ok(Json(ResourceDetail {
        resource: ResourceView::new(&key, &record),
        children,
    }))
}

pub async fn agent_push(
    State(state): State<AppState>,
    Json(report): Json<AgentReport>,
) -> Result<Json<PushSummary>, ApiError> {
    Ok(Json(handle_report(&state.ctx, &report)?))
}

pub async fn set_deploying(
    State(state): State<AppState>,
    Path((kind, id)): Path<(String, String)>,
    Json(body): Json<DeployingRequest>,
) -> Result<Json<DeployingResponse>, ApiError> {
    let key = top_level_key(&kind, id)?;
    let config = state.ctx.config.load();
    let known = match key.kind {
        ResourceKind::Application => config.applications.iter().any(|a| a.id == key.id),
        ResourceKind::Service => config.services.iter().any(|s| s.id == key.id),
    };
    if !known {
        return Err(ApiError::NotFound(key.to_string()));
    }

    state.ctx.set_deploying(key.clone(), body.deploying);
    Ok(Json(DeployingResponse {
        resource: key.to_string(),
        deploying: body.deploying,
    }))
}

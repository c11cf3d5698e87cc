//! HTTP API.
//!
//! # Routes
//! ```text
//! GET  /api/health                              (open)
//! GET  /api/resources                           (open)
//! GET  /api/resources/{kind}/{id}               (open)
//! POST /api/agent/push                          (bearer agent_token)
//! PUT  /api/resources/{kind}/{id}/deploying     (bearer api_key)
//! ```

pub mod auth;
pub mod handlers;
pub mod server;

use std::time::Duration;

use axum::{
    middleware,
    routing::{get, post, put},
    Router,
};
use tower::ServiceBuilder;
use tower_http::{
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    timeout::TimeoutLayer,
    trace::TraceLayer,
};

use crate::collectors::CollectorContext;
use self::auth::{agent_token_auth, api_key_auth};
use self::handlers::*;

pub use server::serve;

/// Application state injected into handlers.
#[derive(Clone)]
pub struct AppState {
    pub ctx: CollectorContext,
}

impl AppState {
    pub fn new(ctx: CollectorContext) -> Self {
        Self { ctx }
    }
}

/// Build the API router with all middleware layers.
#[allow(deprecated)]
pub fn router(state: AppState) -> Router {
    let timeout = Duration::from_secs(state.ctx.config.load().api.request_timeout_secs);

    let agent = Router::new()
        .route("/api/agent/push", post(agent_push))
        .route_layer(middleware::from_fn_with_state(state.clone(), agent_token_auth));

    let management = Router::new()
        .route("/api/resources/{kind}/{id}/deploying", put(set_deploying))
        .route_layer(middleware::from_fn_with_state(state.clone(), api_key_auth));

    Router::new()
        .route("/api/health", get(get_health))
        .route("/api/resources", get(list_resources))
        .route("/api/resources/{kind}/{id}", get(get_resource))
        .merge(agent)
        .merge(management)
        .with_state(state)
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::x_request_id(MakeRequestUuid))
                .layer(TraceLayer::new_for_http())
                .layer(PropagateRequestIdLayer::x_request_id())
                .layer(TimeoutLayer::new(timeout)),
        )
}

use axum::{
    routing::{get, post},
    Router,
};
use std::sync::Arc;

use crate::bridge::handlers;
use crate::bridge::idle::ActivityTracker;
use crate::bridge::link::LinkRegistry;
use crate::error::AppResult;
use crate::modules::config::ConfigStore;

/// Axum application state
#[derive(Clone)]
pub struct AppState {
    pub registry: Arc<LinkRegistry>,
    pub config: ConfigStore,
    pub activity: Arc<ActivityTracker>,
    /// Shared client for file bed uploads
    pub http_client: reqwest::Client,
}

impl AppState {
    pub fn new(config: ConfigStore) -> AppResult<Self> {
        Ok(Self {
            registry: Arc::new(LinkRegistry::new()),
            config,
            activity: Arc::new(ActivityTracker::new()),
            http_client: crate::bridge::upload::build_http_client()?,
        })
    }
}

/// Bridge routes: the OpenAI surface, the agent socket and the internal
/// control endpoints. Only `/v1/*` sits behind the API key.
pub fn build_bridge_router(state: AppState) -> Router<()> {
    let api = Router::new()
        .route("/v1/models", get(handlers::openai::handle_list_models))
        .route("/v1/chat/completions", post(handlers::openai::handle_chat_completions))
        .route_layer(axum::middleware::from_fn_with_state(
            state.clone(),
            crate::bridge::middleware::auth_middleware,
        ));

    let agent = Router::new()
        .route("/ws", get(handlers::ws::handle_agent_socket))
        .route("/internal/request_model_update", post(handlers::internal::handle_request_model_update))
        .route("/internal/update_available_models", post(handlers::internal::handle_update_available_models))
        .route("/internal/start_id_capture", post(handlers::internal::handle_start_id_capture));

    api.merge(agent).with_state(state)
}

use axum::{extract::DefaultBodyLimit, http::StatusCode, response::IntoResponse, routing::get, Router};
use tower_http::trace::TraceLayer;

use arena_bridge_core::bridge::middleware::cors_layer;
use arena_bridge_core::bridge::{build_bridge_router, AppState};

/// Inline images arrive as base64 data URIs inside the chat body.
const MAX_BODY_BYTES: usize = 100 * 1024 * 1024;

pub fn build_router(state: AppState) -> Router {
    let public_routes = Router::new()
        .route("/health", get(health_check))
        .route("/healthz", get(health_check))
        .route("/version", get(version_info));

    public_routes
        .merge(build_bridge_router(state))
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .layer(cors_layer())
}

async fn health_check() -> impl IntoResponse {
    (StatusCode::OK, axum::Json(serde_json::json!({"status": "ok"})))
}

async fn version_info() -> impl IntoResponse {
    (
        StatusCode::OK,
        axum::Json(serde_json::json!({
            "version": option_env!("GIT_VERSION").unwrap_or("dev"),
            "build_time": option_env!("BUILD_TIME").unwrap_or("unknown"),
            "cargo_version": env!("CARGO_PKG_VERSION"),
        })),
    )
}

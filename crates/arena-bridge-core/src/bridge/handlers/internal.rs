//! Control endpoints used by the agent-side tooling.

use arena_bridge_types::protocol::Command;
use arena_bridge_types::BridgeError;
use axum::{
    extract::State,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;

use crate::bridge::handlers::bridge_error_response;
use crate::bridge::server::AppState;
use crate::modules::config::save_available_models;
use crate::modules::model_catalog::extract_models_from_html;

/// Ask the agent for the page source so the model list can be refreshed.
pub async fn handle_request_model_update(State(state): State<AppState>) -> Response {
    send_command(&state, Command::SendPageSource, "'send_page_source' command sent.")
}

/// Put the agent in id capture mode; the next arena request it sees is
/// reported back to the id updater.
pub async fn handle_start_id_capture(State(state): State<AppState>) -> Response {
    send_command(&state, Command::ActivateIdCapture, "Activation command sent.")
}

/// Receive the arena page HTML and write the model list found in it.
pub async fn handle_update_available_models(State(state): State<AppState>, html: String) -> Response {
    tracing::info!("Received page source ({} bytes), extracting models", html.len());

    let models = extract_models_from_html(&html);
    if models.is_empty() {
        tracing::warn!("No model data found in page source");
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({"status": "error", "message": "No model data found in HTML"})),
        )
            .into_response();
    }

    let Some(data_dir) = state.config.data_dir() else {
        return bridge_error_response(&BridgeError::Internal { message: "No data directory configured".to_string() });
    };

    match save_available_models(data_dir, &models).await {
        Ok(path) => {
            tracing::info!("Saved {} models to {}", models.len(), path.display());
            Json(json!({"status": "success", "message": format!("Saved {} models", models.len())}))
                .into_response()
        },
        Err(e) => {
            tracing::error!("Failed to save available models: {}", e);
            bridge_error_response(&BridgeError::Internal { message: e.to_string() })
        },
    }
}

fn send_command(state: &AppState, command: Command, message: &str) -> Response {
    match state.registry.send_command(command) {
        Ok(()) => Json(json!({"status": "success", "message": message})).into_response(),
        Err(e) => {
            tracing::warn!("Command '{}' not sent: {}", command, e);
            bridge_error_response(&e)
        },
    }
}

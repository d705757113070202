// OpenAI models listing
use arena_bridge_types::protocol::openai::ModelCard;
use axum::{extract::State, http::StatusCode, response::IntoResponse, Json};
use serde_json::json;

use crate::bridge::server::AppState;

pub async fn handle_list_models(State(state): State<AppState>) -> impl IntoResponse {
    let models = state.config.models();
    if models.is_empty() {
        return (
            StatusCode::NOT_FOUND,
            Json(json!({"error": "Model list is empty or 'models.json' was not found."})),
        )
            .into_response();
    }

    let created = chrono::Utc::now().timestamp();
    let data: Vec<ModelCard> = models
        .names()
        .map(|name| ModelCard {
            id: name.to_string(),
            object: "model".to_string(),
            created,
            owned_by: "arena-bridge".to_string(),
        })
        .collect();

    Json(json!({
        "object": "list",
        "data": data
    }))
    .into_response()
}

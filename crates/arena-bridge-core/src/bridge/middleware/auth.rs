use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use subtle::ConstantTimeEq;

use crate::bridge::server::AppState;

/// Bearer-key check for `/v1/*`.
///
/// The key is read from the current config on every request, so setting or
/// clearing `api_key` on disk applies without a restart. No key means open
/// access.
pub async fn auth_middleware(State(state): State<AppState>, request: Request, next: Next) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    tracing::debug!("Request: {} {}", method, path);

    if method == axum::http::Method::OPTIONS {
        return next.run(request).await;
    }

    let config = state.config.current();
    let Some(expected) = config.effective_api_key() else {
        return next.run(request).await;
    };

    let provided = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "));

    if provided.is_some_and(|k| constant_time_compare(k, expected)) {
        return next.run(request).await;
    }

    tracing::warn!("Unauthorized request: {} {}", method, path);
    let message = if provided.is_some() {
        "Invalid API key provided."
    } else {
        "API key required. Use 'Authorization: Bearer <key>'."
    };
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({"error": {"message": message, "type": "invalid_request_error", "code": "invalid_api_key"}})),
    )
        .into_response()
}

fn constant_time_compare(a: &str, b: &str) -> bool {
    if a.len() != b.len() {
        return false;
    }
    a.as_bytes().ct_eq(b.as_bytes()).into()
}

// Handlers module - API endpoint handlers

pub mod internal;
pub mod openai;
pub mod ws;

use arena_bridge_types::BridgeError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};

use crate::bridge::mappers::openai::error_body;

/// Error response with the status and OpenAI-style body of `err`.
pub(crate) fn bridge_error_response(err: &BridgeError) -> Response {
    let status = StatusCode::from_u16(err.http_status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);
    (status, Json(error_body(err))).into_response()
}

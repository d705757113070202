use std::sync::Arc;
use std::time::Duration;

use arena_bridge_types::protocol::ChatCompletionRequest;
use arena_bridge_types::{BridgeConfig, BridgeError};
use axum::{
    body::Body,
    extract::{Json, State},
    http::header,
    response::{IntoResponse, Response},
};
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::bridge::common::short_id;
use crate::bridge::decoder::decode_inbox;
use crate::bridge::handlers::bridge_error_response;
use crate::bridge::link::VerificationGate;
use crate::bridge::mappers::openai::{
    build_completion, collect_events, create_openai_sse_stream, resolve_session, translate_request,
    TranslationPolicy,
};
use crate::bridge::server::AppState;
use crate::bridge::upload::{upload_inline_images, FileBedClient};

pub async fn handle_chat_completions(State(state): State<AppState>, Json(body): Json<Value>) -> Response {
    state.activity.touch();

    let mut request: ChatCompletionRequest = match serde_json::from_value(body) {
        Ok(r) => r,
        Err(e) => {
            return bridge_error_response(&BridgeError::InvalidRequest { message: e.to_string() });
        },
    };

    let config = state.config.current();

    if let Err(e) = state.registry.current_link() {
        warn!("Rejecting chat request for '{}': {}", request.model, e);
        return bridge_error_response(&e);
    }

    let session = match resolve_session(&request.model, &config, state.config.endpoints()) {
        Ok(s) => s,
        Err(e) => return bridge_error_response(&e),
    };

    if config.file_bed_enabled {
        if let Err(e) = upload_attachments(&state, &config, &mut request).await {
            return bridge_error_response(&e);
        }
    }

    let policy = TranslationPolicy::resolve(&config, &session);
    let payload = translate_request(&request, &session, state.config.models(), &policy);

    let request_id = uuid::Uuid::new_v4().to_string();
    info!(
        "[{}] Chat request: model={}, stream={}, messages={}",
        short_id(&request_id),
        request.model,
        request.stream,
        request.messages.len()
    );

    let inbox = match state.registry.register(&request_id) {
        Ok(inbox) => inbox,
        Err(e) => return bridge_error_response(&e),
    };
    if let Err(e) = state.registry.send_payload(&request_id, payload) {
        warn!("[{}] Failed to send payload: {}", short_id(&request_id), e);
        return bridge_error_response(&e);
    }
    debug!("[{}] Payload sent to agent", short_id(&request_id));

    let gate: Arc<dyn VerificationGate> = state.registry.clone();
    let timeout = Duration::from_secs(config.stream_response_timeout_seconds);
    let events = decode_inbox(inbox, gate, timeout);

    if request.stream {
        let stream = create_openai_sse_stream(events, request.model, request_id);
        return (
            [
                (header::CONTENT_TYPE, "text/event-stream"),
                (header::CACHE_CONTROL, "no-cache"),
                (header::CONNECTION, "keep-alive"),
            ],
            Body::from_stream(stream),
        )
            .into_response();
    }

    match collect_events(events, &request_id).await {
        Ok(collected) => Json(build_completion(collected, &request.model)).into_response(),
        Err(e) => bridge_error_response(&e),
    }
}

async fn upload_attachments(
    state: &AppState,
    config: &BridgeConfig,
    request: &mut ChatCompletionRequest,
) -> Result<(), BridgeError> {
    let Some(upload_url) = config.file_bed_url() else {
        return Err(BridgeError::AttachmentUpload {
            message: "File bed is enabled but 'file_bed_upload_url' is not configured.".to_string(),
        });
    };

    let client = FileBedClient::new(state.http_client.clone(), upload_url, config.file_bed_api_key.clone());
    let uploaded = upload_inline_images(request, &client).await?;
    if uploaded > 0 {
        info!("Uploaded {} inline attachments for '{}'", uploaded, request.model);
    }
    Ok(())
}

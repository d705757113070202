//! Agent WebSocket endpoint.
//!
//! One connection at a time is the active link. Every frame the agent sends is
//! routed to the inbox of its request; frames for the agent are serialized by a
//! writer task fed from the link's channel.

use arena_bridge_types::protocol::{InboundFrame, OutboundFrame};
use axum::{
    extract::{
        ws::{Message, WebSocket, WebSocketUpgrade},
        State,
    },
    response::Response,
};
use futures::{SinkExt, StreamExt};
use tokio::sync::mpsc;

use crate::bridge::common::short_id;
use crate::bridge::link::{Fragment, LinkRegistry};
use crate::bridge::server::AppState;

pub async fn handle_agent_socket(ws: WebSocketUpgrade, State(state): State<AppState>) -> Response {
    ws.on_upgrade(move |socket| run_agent_link(socket, state))
}

async fn run_agent_link(socket: WebSocket, state: AppState) {
    let (mut sink, mut stream) = socket.split();
    let (tx, mut rx) = mpsc::unbounded_channel::<OutboundFrame>();
    let link_id = state.registry.attach(tx);
    tracing::info!("Agent connected (link {})", link_id);

    let writer = tokio::spawn(async move {
        while let Some(frame) = rx.recv().await {
            let text = match serde_json::to_string(&frame) {
                Ok(text) => text,
                Err(e) => {
                    tracing::error!("Failed to serialize frame for agent: {}", e);
                    continue;
                },
            };
            if sink.send(Message::Text(text)).await.is_err() {
                break;
            }
        }
        // Channel closed: the link was superseded or detached.
        let _ = sink.send(Message::Close(None)).await;
    });

    while let Some(message) = stream.next().await {
        match message {
            Ok(Message::Text(text)) => route_agent_message(&state.registry, &text),
            Ok(Message::Close(_)) => break,
            Ok(_) => {},
            Err(e) => {
                tracing::warn!("Agent socket error on link {}: {}", link_id, e);
                break;
            },
        }
    }

    state.registry.detach(link_id);
    writer.abort();
    tracing::info!("Agent link {} closed", link_id);
}

/// Route one inbound text frame. Malformed frames are logged and dropped.
pub(crate) fn route_agent_message(registry: &LinkRegistry, text: &str) {
    let frame: InboundFrame = match serde_json::from_str(text) {
        Ok(frame) => frame,
        Err(e) => {
            tracing::error!("Invalid JSON from agent: {}", e);
            return;
        },
    };

    let (Some(request_id), Some(data)) = (frame.request_id, frame.data) else {
        tracing::warn!("Agent frame without request_id or data dropped");
        return;
    };

    let fragment = Fragment::from_data(data);
    if matches!(fragment, Fragment::Error(_)) {
        tracing::debug!("[{}] Agent reported an error", short_id(&request_id));
    }
    registry.dispatch(&request_id, fragment);
}

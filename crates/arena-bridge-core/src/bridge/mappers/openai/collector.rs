//! Stream events → single OpenAI chat completion.

use arena_bridge_types::protocol::openai::{AssistantMessage, ChatChoice, ChatCompletion, Usage};
use arena_bridge_types::BridgeError;
use chrono::Utc;
use futures::StreamExt;
use serde_json::{json, Value};

use super::streaming::{CONTENT_FILTER_NOTICE, CONTENT_FILTER_REASON, ERROR_PREFIX};
use crate::bridge::common::short_id;
use crate::bridge::decoder::{EventStream, StreamEvent, DEFAULT_FINISH_REASON};

/// Collected content of a finished stream.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Collected {
    pub content: String,
    pub finish_reason: String,
}

/// Drain the event stream. The first error aborts collection.
pub async fn collect_events(mut events: EventStream, request_id: &str) -> Result<Collected, BridgeError> {
    let mut content = String::new();
    let mut finish_reason = DEFAULT_FINISH_REASON.to_string();

    while let Some(event) = events.next().await {
        match event {
            StreamEvent::Content(text) => content.push_str(&text),
            StreamEvent::Finish(reason) => {
                if reason == CONTENT_FILTER_REASON {
                    content.push_str(CONTENT_FILTER_NOTICE);
                }
                finish_reason = reason;
            },
            StreamEvent::Error(err) => {
                tracing::error!("[{}] Aggregation failed: {}", short_id(request_id), err);
                return Err(err);
            },
        }
    }

    tracing::info!("[{}] Aggregated {} chars", short_id(request_id), content.chars().count());
    Ok(Collected { content, finish_reason })
}

/// Build the `chat.completion` body.
///
/// Token counts are not reported by the arena, so completion tokens are
/// approximated as characters / 4 and prompt tokens are 0.
pub fn build_completion(collected: Collected, model: &str) -> ChatCompletion {
    let completion_tokens = u64::try_from(collected.content.chars().count() / 4).unwrap_or(u64::MAX);
    ChatCompletion {
        id: format!("chatcmpl-{}", uuid::Uuid::new_v4()),
        object: "chat.completion".to_string(),
        created: Utc::now().timestamp(),
        model: model.to_string(),
        choices: vec![ChatChoice {
            index: 0,
            message: AssistantMessage { role: "assistant".to_string(), content: collected.content },
            finish_reason: collected.finish_reason,
        }],
        usage: Usage { prompt_tokens: 0, completion_tokens, total_tokens: completion_tokens },
    }
}

/// OpenAI-style error body for a failed request.
pub fn error_body(err: &BridgeError) -> Value {
    json!({
        "error": {
            "message": format!("{ERROR_PREFIX}: {err}"),
            "type": err.error_type(),
            "code": err.error_code()
        }
    })
}

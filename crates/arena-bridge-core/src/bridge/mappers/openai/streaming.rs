//! Stream events → OpenAI SSE chunks.

use std::pin::Pin;

use bytes::Bytes;
use chrono::Utc;
use futures::{Stream, StreamExt};
use serde_json::{json, Value};

use crate::bridge::common::short_id;
use crate::bridge::decoder::{EventStream, StreamEvent, DEFAULT_FINISH_REASON};

/// Prefix of error text surfaced to clients.
pub const ERROR_PREFIX: &str = "[Arena Bridge Error]";

/// Finish reason the arena uses for moderated or truncated answers.
pub const CONTENT_FILTER_REASON: &str = "content-filter";

/// Notice appended when a response is cut off by the content filter.
pub const CONTENT_FILTER_NOTICE: &str =
    "\n\nThe response was terminated, most likely by context length limits or model-side moderation.";

pub const DONE_LINE: &str = "data: [DONE]\n\n";

pub type SseStream = Pin<Box<dyn Stream<Item = Result<Bytes, String>> + Send>>;

/// Format an SSE data line
#[inline]
pub fn sse_line(data: &Value) -> String {
    format!("data: {}\n\n", serde_json::to_string(data).unwrap_or_default())
}

/// Create a content delta chunk
pub fn content_chunk(stream_id: &str, created_ts: i64, model: &str, content: &str) -> Value {
    json!({
        "id": stream_id,
        "object": "chat.completion.chunk",
        "created": created_ts,
        "model": model,
        "choices": [{
            "index": 0,
            "delta": { "content": content },
            "finish_reason": Value::Null
        }]
    })
}

/// Create the closing chunk (empty delta, finish reason set)
pub fn finish_chunk(stream_id: &str, created_ts: i64, model: &str, reason: &str) -> Value {
    json!({
        "id": stream_id,
        "object": "chat.completion.chunk",
        "created": created_ts,
        "model": model,
        "choices": [{
            "index": 0,
            "delta": {},
            "finish_reason": reason
        }]
    })
}

/// Error text as embedded in a content chunk.
pub fn error_content(message: &str) -> String {
    format!("\n\n{ERROR_PREFIX}: {message}")
}

/// Render decoded events as an OpenAI SSE byte stream.
///
/// The finish reason is remembered and only emitted after the decoder ends
/// normally; an error ends the stream right away with a `stop` chunk.
pub fn create_openai_sse_stream(mut events: EventStream, model: String, request_id: String) -> SseStream {
    let stream_id = format!("chatcmpl-{}", uuid::Uuid::new_v4());

    let stream = async_stream::stream! {
        let mut finish_reason = DEFAULT_FINISH_REASON.to_string();
        tracing::info!("[{}] SSE stream started", short_id(&request_id));

        while let Some(event) = events.next().await {
            match event {
                StreamEvent::Content(text) => {
                    let chunk = content_chunk(&stream_id, Utc::now().timestamp(), &model, &text);
                    yield Ok::<Bytes, String>(Bytes::from(sse_line(&chunk)));
                },
                StreamEvent::Finish(reason) => {
                    if reason == CONTENT_FILTER_REASON {
                        let chunk = content_chunk(&stream_id, Utc::now().timestamp(), &model, CONTENT_FILTER_NOTICE);
                        yield Ok(Bytes::from(sse_line(&chunk)));
                    }
                    finish_reason = reason;
                },
                StreamEvent::Error(err) => {
                    tracing::error!("[{}] Stream error: {}", short_id(&request_id), err);
                    let now = Utc::now().timestamp();
                    let chunk = content_chunk(&stream_id, now, &model, &error_content(&err.to_string()));
                    yield Ok(Bytes::from(sse_line(&chunk)));
                    let closing = finish_chunk(&stream_id, now, &model, DEFAULT_FINISH_REASON);
                    yield Ok(Bytes::from(format!("{}{}", sse_line(&closing), DONE_LINE)));
                    return;
                },
            }
        }

        let closing = finish_chunk(&stream_id, Utc::now().timestamp(), &model, &finish_reason);
        yield Ok(Bytes::from(format!("{}{}", sse_line(&closing), DONE_LINE)));
        tracing::info!("[{}] SSE stream finished ({})", short_id(&request_id), finish_reason);
    };

    Box::pin(stream)
}

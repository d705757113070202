//! Inbound fragments routed to a pending request.

use arena_bridge_types::BridgeError;
use serde_json::Value;

/// Terminal sentinel sent by the agent after the last fragment of a request.
pub const DONE_SENTINEL: &str = "[DONE]";

/// One unit of data delivered to a request inbox.
#[derive(Debug, Clone, PartialEq)]
pub enum Fragment {
    /// Raw protocol text to be appended to the decode buffer
    Text(String),
    /// Structured value with no `error` key; not part of the stream grammar
    Object(Value),
    /// Error reported by the agent or the upstream service
    Error(String),
    /// Terminal sentinel
    Done,
    /// Synthesized by the registry when the link carrying the request is lost
    Aborted(BridgeError),
}

impl Fragment {
    /// Classify the `data` value of an inbound frame.
    pub fn from_data(data: Value) -> Self {
        match data {
            Value::String(s) if s == DONE_SENTINEL => Self::Done,
            Value::String(s) => Self::Text(s),
            Value::Array(items) => Self::Text(items.iter().map(value_as_text).collect()),
            Value::Object(map) => match map.get("error") {
                Some(err) => Self::Error(value_as_text(err)),
                None => Self::Object(Value::Object(map)),
            },
            other => Self::Text(other.to_string()),
        }
    }
}

/// Strings contribute their contents, everything else its JSON text.
fn value_as_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

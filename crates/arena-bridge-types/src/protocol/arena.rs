//! Frames exchanged with the remote browser agent over the WebSocket link.
//!
//! ```text
//! bridge ──► agent   {"request_id": "...", "payload": ConversationPayload}
//! bridge ──► agent   {"command": "refresh"}
//! agent  ──► bridge  {"request_id": "...", "data": <string | array | object>}
//! ```

use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;

use crate::models::Participant;

/// Role of an outbound message template.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
}

impl Role {
    /// Normalize an OpenAI role. `developer` is a system prompt; tool output
    /// and unknown roles are presented as user turns.
    pub fn normalize(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "system" | "developer" => Self::System,
            "assistant" => Self::Assistant,
            _ => Self::User,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match *self {
            Self::System => write!(f, "system"),
            Self::User => write!(f, "user"),
            Self::Assistant => write!(f, "assistant"),
        }
    }
}

/// File attached to a template. `url` is a data URI or an uploaded reference.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Attachment {
    pub name: String,
    #[serde(rename = "contentType")]
    pub content_type: String,
    pub url: String,
}

impl Attachment {
    pub fn is_image(&self) -> bool {
        self.content_type.starts_with("image/")
    }
}

/// One conversation turn in the arena message format.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct MessageTemplate {
    pub role: Role,
    pub content: String,
    #[serde(default)]
    pub attachments: Vec<Attachment>,
    #[serde(rename = "participantPosition", default)]
    pub participant: Participant,
}

impl MessageTemplate {
    pub fn new(role: Role, content: impl Into<String>) -> Self {
        Self { role, content: content.into(), attachments: Vec::new(), participant: Participant::A }
    }
}

/// Complete conversation sent to the agent for one request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ConversationPayload {
    pub message_templates: Vec<MessageTemplate>,
    pub target_model_id: Option<String>,
    pub session_id: String,
    pub message_id: String,
    #[serde(default)]
    pub is_image_request: bool,
}

/// Control command for the agent.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum Command {
    /// Reload the page and reconnect the socket
    Reconnect,
    /// Reload the page, typically to pass a verification challenge
    Refresh,
    /// Post the current page HTML to `/internal/update_available_models`
    SendPageSource,
    /// Capture the session/message ids of the next arena request
    ActivateIdCapture,
}

impl fmt::Display for Command {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match *self {
            Self::Reconnect => "reconnect",
            Self::Refresh => "refresh",
            Self::SendPageSource => "send_page_source",
            Self::ActivateIdCapture => "activate_id_capture",
        };
        f.write_str(s)
    }
}

/// Frame sent from the bridge to the agent.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum OutboundFrame {
    Payload { request_id: String, payload: ConversationPayload },
    Command { command: Command },
}

/// Frame received from the agent.
///
/// Both fields are optional on the wire; frames missing either are
/// logged and dropped by the receive loop.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InboundFrame {
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub data: Option<Value>,
}

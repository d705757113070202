//! OpenAI ChatCompletions API types.
//!
//! Only the fields the bridge acts on are modelled; everything else a client
//! sends (temperature, tools, ...) is accepted and ignored because the arena
//! session has no equivalent knobs.

use serde::{Deserialize, Serialize};

/// OpenAI chat completion request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ChatCompletionRequest {
    /// Model name as listed by `/v1/models`.
    pub model: String,
    /// Conversation messages.
    #[serde(default)]
    pub messages: Vec<ChatMessage>,
    /// Enable streaming response.
    #[serde(default)]
    pub stream: bool,
}

impl ChatCompletionRequest {
    pub fn new(model: impl Into<String>, messages: Vec<ChatMessage>, stream: bool) -> Self {
        Self { model: model.into(), messages, stream }
    }
}

/// OpenAI chat message.
///
/// The role is kept as a plain string: clients send `developer`, `tool` and
/// vendor specific roles that are normalized later.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[non_exhaustive]
pub struct ChatMessage {
    pub role: String,
    #[serde(default)]
    pub content: Option<MessageContent>,
}

impl ChatMessage {
    pub fn text(role: impl Into<String>, text: impl Into<String>) -> Self {
        Self { role: role.into(), content: Some(MessageContent::Text(text.into())) }
    }

    pub fn parts(role: impl Into<String>, parts: Vec<ContentPart>) -> Self {
        Self { role: role.into(), content: Some(MessageContent::Parts(parts)) }
    }
}

/// Content in an OpenAI message (string or array of parts).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(untagged)]
#[non_exhaustive]
pub enum MessageContent {
    Text(String),
    Parts(Vec<ContentPart>),
}

/// Content part in a multipart message.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type")]
#[non_exhaustive]
pub enum ContentPart {
    #[serde(rename = "text")]
    Text { text: String },
    #[serde(rename = "image_url")]
    ImageUrl { image_url: ImageUrl },
    /// Audio, video and future part types; dropped by the translator.
    #[serde(other)]
    Unsupported,
}

impl ContentPart {
    pub fn text(text: impl Into<String>) -> Self {
        Self::Text { text: text.into() }
    }

    pub fn image(url: impl Into<String>) -> Self {
        Self::ImageUrl { image_url: ImageUrl { url: url.into(), detail: None } }
    }
}

/// Image reference: a data URI or a remote URL.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ImageUrl {
    pub url: String,
    /// Some clients put the original file name here.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
}

/// OpenAI usage statistics.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u64,
    pub completion_tokens: u64,
    pub total_tokens: u64,
}

/// Non-streaming completion response.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatCompletion {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub model: String,
    pub choices: Vec<ChatChoice>,
    pub usage: Usage,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ChatChoice {
    pub index: u32,
    pub message: AssistantMessage,
    pub finish_reason: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct AssistantMessage {
    pub role: String,
    pub content: String,
}

/// Entry of the `/v1/models` listing.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ModelCard {
    pub id: String,
    pub object: String,
    pub created: i64,
    pub owned_by: String,
}

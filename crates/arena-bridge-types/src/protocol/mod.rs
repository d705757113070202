//! Protocol definitions.
//!
//! - `openai` - the ChatCompletions API exposed to clients
//! - `arena` - the frames exchanged with the remote browser agent

pub mod arena;
pub mod openai;

pub use arena::{Attachment, Command, ConversationPayload, InboundFrame, MessageTemplate, OutboundFrame, Role};
pub use openai::{ChatCompletionRequest, ChatMessage, ContentPart, ImageUrl, MessageContent};

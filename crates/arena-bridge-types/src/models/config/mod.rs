//! Bridge configuration models.

mod bridge;
mod enums;

pub use bridge::{default_idle_timeout, default_stream_timeout, is_usable_id, BridgeConfig};
pub use enums::{ConversationMode, Modality, Participant};

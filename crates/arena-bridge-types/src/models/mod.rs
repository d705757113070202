//! Domain models shared between the bridge core and the server binary.

pub mod config;
mod model_table;

pub use config::{BridgeConfig, ConversationMode, Modality, Participant};
pub use model_table::{EndpointEntry, EndpointMapping, EndpointTable, ModelEntry, ModelTable};

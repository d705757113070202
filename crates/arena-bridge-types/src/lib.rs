//! # Arena Bridge Types
//!
//! Core types, models, and error definitions for Arena Bridge.
//!
//! - **`error`** - Typed errors for bridged requests and configuration
//! - **`models`** - Bridge config, model table, endpoint table
//! - **`protocol`** - OpenAI API types and agent wire frames
//!
//! ## Architecture Role
//!
//! ```text
//!        arena-bridge-types (this crate)
//!                  │
//!                  ▼
//!          arena-bridge-core
//!                  │
//!                  ▼
//!         arena-bridge-server
//! ```

pub mod error;
pub mod models;
pub mod protocol;

pub use error::{BridgeError, ConfigError, Result};

pub use models::{
    BridgeConfig, ConversationMode, EndpointEntry, EndpointMapping, EndpointTable, Modality,
    ModelEntry, ModelTable, Participant,
};

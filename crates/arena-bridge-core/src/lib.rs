//! # Arena Bridge Core
//!
//! Serves an OpenAI-compatible chat API by relaying every request to a remote
//! browser agent over a single WebSocket link.
//!
//! ```text
//! arena-bridge-core/src/
//! ├── bridge/
//! │   ├── link/       # LinkRegistry: active link, pending requests, verification flag
//! │   ├── decoder/    # incremental stream-protocol decoder
//! │   ├── mappers/    # OpenAI request → arena payload, events → SSE / JSON
//! │   ├── upload/     # file bed uploads for inline images
//! │   ├── handlers/   # /v1/*, /ws, /internal/*
//! │   ├── idle.rs     # idle link recycling
//! │   └── server.rs   # AppState + router
//! └── modules/        # config files, model discovery
//! ```

#![allow(
    clippy::significant_drop_tightening,
    reason = "Mutex guards in the link registry are held for short, explicit scopes"
)]
#![allow(
    clippy::wildcard_enum_match_arm,
    reason = "Protocol enums are matched with wildcards for forward compatibility"
)]
#![allow(clippy::map_err_ignore, reason = "Error context is provided in the replacement message")]
#![allow(clippy::needless_continue, reason = "Explicit continue improves loop readability")]
// Test-only lints: allow panic!, println!, etc. in test code
#![cfg_attr(
    test,
    allow(
        clippy::panic,
        clippy::print_stdout,
        clippy::unnecessary_join,
        clippy::needless_collect,
        clippy::assertions_on_result_states
    )
)]

pub mod bridge;
pub mod error;
pub mod modules;

pub use error::{AppError, AppResult};

// Bridge module - agent link, stream decoding and the OpenAI surface

pub mod common;
pub mod decoder;
pub mod handlers;
pub mod idle;
pub mod link;
pub mod mappers;
pub mod middleware;
pub mod server;
pub mod upload;

pub use idle::{ActivityTracker, IdleSupervisor};
pub use link::LinkRegistry;
pub use server::{build_bridge_router, AppState};

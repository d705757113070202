//! OpenAI ⇄ arena mapping.

pub mod collector;
pub mod request;
pub mod session;
pub mod streaming;

#[cfg(test)]
mod tests;

pub use collector::{build_completion, collect_events, error_body, Collected};
pub use request::{translate_request, TranslationPolicy};
pub use session::{resolve_session, ResolvedSession};
pub use streaming::{create_openai_sse_stream, SseStream};

//! Agent link ownership and request correlation.

mod fragment;
mod inbox;
mod registry;


pub use fragment::{Fragment, DONE_SENTINEL};
pub use inbox::Inbox;
pub use registry::{LinkHandle, LinkId, LinkRegistry, VerificationGate, VerificationStart};

//! RAII inbox for one pending request.

use std::sync::Arc;

use tokio::sync::mpsc;

use super::fragment::Fragment;
use super::registry::LinkRegistry;

/// Receiving side of a pending request.
///
/// Dropping the inbox releases the registry entry, so a caller that goes away
/// mid-stream (client disconnect, task abort) never leaks a slot.
pub struct Inbox {
    request_id: String,
    serial: u64,
    receiver: mpsc::UnboundedReceiver<Fragment>,
    registry: Arc<LinkRegistry>,
}

impl Inbox {
    pub(super) fn new(
        request_id: String,
        serial: u64,
        receiver: mpsc::UnboundedReceiver<Fragment>,
        registry: Arc<LinkRegistry>,
    ) -> Self {
        Self { request_id, serial, receiver, registry }
    }

    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Next fragment, or `None` once the registry dropped the sending side.
    pub async fn recv(&mut self) -> Option<Fragment> {
        self.receiver.recv().await
    }
}

impl Drop for Inbox {
    fn drop(&mut self) {
        self.registry.release_if_current(&self.request_id, self.serial);
    }
}

impl std::fmt::Debug for Inbox {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Inbox").field("request_id", &self.request_id).finish_non_exhaustive()
    }
}

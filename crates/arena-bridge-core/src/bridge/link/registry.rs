//! Single-link registry and request correlator.
//!
//! Exactly one agent link is active at a time. Every in-flight API request
//! owns an inbox keyed by its request id; the WebSocket receive loop pushes
//! fragments into those inboxes via [`LinkRegistry::dispatch`].

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Instant;

use arena_bridge_types::protocol::{Command, ConversationPayload, OutboundFrame};
use arena_bridge_types::BridgeError;
use dashmap::DashMap;
use parking_lot::Mutex;
use tokio::sync::mpsc;

use super::fragment::Fragment;
use super::inbox::Inbox;
use crate::bridge::common::short_id;

/// Generation number of an attached link.
pub type LinkId = u64;

/// Outcome of [`VerificationGate::begin_verification`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum VerificationStart {
    /// This caller flipped the flag and a `refresh` was sent
    Initiated,
    /// A verification refresh is already in progress
    AlreadyAwaiting,
}

/// Reaction to a human-verification page, shared by all decoders.
pub trait VerificationGate: Send + Sync {
    fn begin_verification(&self) -> VerificationStart;
}

/// Sending half of the active link.
#[derive(Debug, Clone)]
pub struct LinkHandle {
    id: LinkId,
    sender: mpsc::UnboundedSender<OutboundFrame>,
}

impl LinkHandle {
    pub fn id(&self) -> LinkId {
        self.id
    }

    /// Queue a frame for the link writer.
    pub fn send(&self, frame: OutboundFrame) -> Result<(), BridgeError> {
        self.sender.send(frame).map_err(|_| BridgeError::LinkDisconnected)
    }
}

struct PendingRequest {
    serial: u64,
    sender: mpsc::UnboundedSender<Fragment>,
    created_at: Instant,
}

/// Owner of the agent link and of all pending request inboxes.
pub struct LinkRegistry {
    link: Mutex<Option<LinkHandle>>,
    next_link_id: AtomicU64,
    next_serial: AtomicU64,
    pending: DashMap<String, PendingRequest>,
    awaiting_verification: AtomicBool,
}

impl Default for LinkRegistry {
    fn default() -> Self {
        Self::new()
    }
}

impl LinkRegistry {
    pub fn new() -> Self {
        Self {
            link: Mutex::new(None),
            next_link_id: AtomicU64::new(1),
            next_serial: AtomicU64::new(1),
            pending: DashMap::new(),
            awaiting_verification: AtomicBool::new(false),
        }
    }

    /// Install a new link, superseding any previous one.
    ///
    /// Requests bound to the old link fail with [`BridgeError::LinkSuperseded`].
    /// A fresh connection also ends any verification wait.
    pub fn attach(&self, sender: mpsc::UnboundedSender<OutboundFrame>) -> LinkId {
        let id = self.next_link_id.fetch_add(1, Ordering::SeqCst);
        let mut slot = self.link.lock();

        if let Some(old) = slot.replace(LinkHandle { id, sender }) {
            tracing::warn!("New agent connection (link {}) supersedes link {}", id, old.id);
            let failed = self.fail_all_pending(&BridgeError::LinkSuperseded);
            if failed > 0 {
                tracing::warn!("Failed {} pending requests of superseded link {}", failed, old.id);
            }
        }

        if self.awaiting_verification.swap(false, Ordering::SeqCst) {
            tracing::info!("Agent reconnected, verification wait cleared");
        }
        tracing::info!("Agent link {} attached", id);
        id
    }

    /// Remove the link if it is still the active one. Stale ids are ignored so
    /// a late disconnect of a superseded socket cannot tear down its successor.
    pub fn detach(&self, link_id: LinkId) -> bool {
        let mut slot = self.link.lock();
        if slot.as_ref().map(LinkHandle::id) != Some(link_id) {
            tracing::debug!("Ignoring detach of stale link {}", link_id);
            return false;
        }
        *slot = None;

        let failed = self.fail_all_pending(&BridgeError::LinkDisconnected);
        tracing::warn!("Agent link {} detached, {} pending requests failed", link_id, failed);
        true
    }

    /// Create the inbox for a new request.
    pub fn register(self: &Arc<Self>, request_id: &str) -> Result<Inbox, BridgeError> {
        use dashmap::mapref::entry::Entry;

        let (sender, receiver) = mpsc::unbounded_channel();
        let serial = self.next_serial.fetch_add(1, Ordering::Relaxed);

        match self.pending.entry(request_id.to_string()) {
            Entry::Occupied(_) => {
                return Err(BridgeError::DuplicateRequestId { request_id: request_id.to_string() })
            },
            Entry::Vacant(slot) => {
                slot.insert(PendingRequest { serial, sender, created_at: Instant::now() });
            },
        }

        tracing::debug!("[{}] Inbox registered", short_id(request_id));
        Ok(Inbox::new(request_id.to_string(), serial, receiver, Arc::clone(self)))
    }

    /// Route a fragment to its request. Returns `false` for orphaned fragments.
    pub fn dispatch(&self, request_id: &str, fragment: Fragment) -> bool {
        let Some(pending) = self.pending.get(request_id) else {
            tracing::warn!("[{}] Orphaned fragment for unknown or closed request", short_id(request_id));
            return false;
        };
        pending.sender.send(fragment).is_ok()
    }

    /// Remove a request. Idempotent.
    pub fn release(&self, request_id: &str) -> bool {
        match self.pending.remove(request_id) {
            Some((_, pending)) => {
                tracing::debug!(
                    "[{}] Inbox released after {:?}",
                    short_id(request_id),
                    pending.created_at.elapsed()
                );
                true
            },
            None => false,
        }
    }

    /// Release on inbox drop, unless the id was already reused by a newer inbox.
    pub(super) fn release_if_current(&self, request_id: &str, serial: u64) {
        if self.pending.remove_if(request_id, |_, p| p.serial == serial).is_some() {
            tracing::debug!("[{}] Inbox dropped by caller", short_id(request_id));
        }
    }

    /// The active link, or `TransportUnavailable` when none is attached.
    pub fn current_link(&self) -> Result<LinkHandle, BridgeError> {
        self.link.lock().clone().ok_or_else(|| BridgeError::TransportUnavailable {
            awaiting_verification: self.is_awaiting_verification(),
        })
    }

    pub fn is_connected(&self) -> bool {
        self.link.lock().is_some()
    }

    pub fn send_payload(&self, request_id: &str, payload: ConversationPayload) -> Result<(), BridgeError> {
        let link = self.current_link()?;
        link.send(OutboundFrame::Payload { request_id: request_id.to_string(), payload })?;
        tracing::info!("[{}] Payload sent on link {}", short_id(request_id), link.id());
        Ok(())
    }

    pub fn send_command(&self, command: Command) -> Result<(), BridgeError> {
        let link = self.current_link()?;
        link.send(OutboundFrame::Command { command })?;
        tracing::info!("Command '{}' sent on link {}", command, link.id());
        Ok(())
    }

    pub fn is_awaiting_verification(&self) -> bool {
        self.awaiting_verification.load(Ordering::SeqCst)
    }

    pub fn pending_count(&self) -> usize {
        self.pending.len()
    }

    fn fail_all_pending(&self, error: &BridgeError) -> usize {
        let mut failed = 0;
        self.pending.retain(|_, pending| {
            if pending.sender.send(Fragment::Aborted(error.clone())).is_ok() {
                failed += 1;
            }
            false
        });
        failed
    }
}

impl VerificationGate for LinkRegistry {
    fn begin_verification(&self) -> VerificationStart {
        if self
            .awaiting_verification
            .compare_exchange(false, true, Ordering::SeqCst, Ordering::SeqCst)
            .is_err()
        {
            return VerificationStart::AlreadyAwaiting;
        }

        tracing::warn!("Human verification detected, asking the agent to refresh");
        if let Err(e) = self.send_command(Command::Refresh) {
            tracing::warn!("Could not send refresh command: {}", e);
        }
        VerificationStart::Initiated
    }
}

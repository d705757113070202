//! Incremental decoder turning inbox fragments into stream events.
//!
//! ```text
//!   Inbox ──Fragment──► StreamDecoder ──StreamEvent──► formatter
//!                          │
//!                          └─ challenge page ──► VerificationGate (refresh once)
//! ```
//!
//! The decoder has a single collecting state; any terminal condition
//! (sentinel, structured error, challenge, link loss, silence) ends it.

mod grammar;


use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use arena_bridge_types::BridgeError;
use futures::Stream;

pub use grammar::{is_challenge, Interrupt, Scanner, Token, DEFAULT_FINISH_REASON};

use crate::bridge::common::short_id;
use crate::bridge::link::{Fragment, Inbox, VerificationGate, VerificationStart};

/// Typed event produced by the decoder.
#[derive(Debug, Clone, PartialEq)]
pub enum StreamEvent {
    Content(String),
    /// Advisory; the stream continues until the sentinel
    Finish(String),
    /// Terminal
    Error(BridgeError),
}

pub type EventStream = Pin<Box<dyn Stream<Item = StreamEvent> + Send>>;

/// Synchronous decoding state for one request.
pub struct StreamDecoder {
    request_id: String,
    scanner: Scanner,
    gate: Arc<dyn VerificationGate>,
    finished: bool,
}

impl StreamDecoder {
    pub fn new(request_id: impl Into<String>, gate: Arc<dyn VerificationGate>) -> Self {
        Self { request_id: request_id.into(), scanner: Scanner::new(), gate, finished: false }
    }

    /// True once a terminal fragment or condition has been seen.
    pub fn is_finished(&self) -> bool {
        self.finished
    }

    /// Process one fragment and return the events it completes.
    pub fn feed(&mut self, fragment: Fragment) -> Vec<StreamEvent> {
        if self.finished {
            return Vec::new();
        }

        match fragment {
            Fragment::Error(message) => self.terminate(self.classify_error(&message)),
            Fragment::Aborted(error) => self.terminate(error),
            Fragment::Done => {
                self.finished = true;
                if !self.scanner.unconsumed().trim().is_empty() {
                    tracing::debug!(
                        "[{}] Discarding {} residual bytes at sentinel",
                        short_id(&self.request_id),
                        self.scanner.unconsumed().len()
                    );
                }
                Vec::new()
            },
            Fragment::Object(value) => {
                let err = BridgeError::MalformedUpstreamFragment { message: value.to_string() };
                tracing::warn!("[{}] {}", short_id(&self.request_id), err);
                Vec::new()
            },
            Fragment::Text(text) => self.feed_text(&text),
        }
    }

    fn feed_text(&mut self, text: &str) -> Vec<StreamEvent> {
        self.scanner.push(text);

        match self.scanner.detect_interrupt() {
            Some(Interrupt::Challenge) => return self.terminate(self.verification_error()),
            Some(Interrupt::ErrorObject(message)) => {
                return self.terminate(self.classify_error(&message))
            },
            None => {},
        }

        let mut events = Vec::new();
        while let Some(token) = self.scanner.next_token() {
            events.push(match token {
                Token::Content(text) => StreamEvent::Content(text),
                Token::Finish(reason) => StreamEvent::Finish(reason),
            });
        }
        events
    }

    /// Map an error message reported by the agent or upstream to a typed error.
    fn classify_error(&self, message: &str) -> BridgeError {
        if message.contains("413") || message.to_lowercase().contains("too large") {
            tracing::warn!("[{}] Upstream rejected an oversized attachment", short_id(&self.request_id));
            return BridgeError::OversizedAttachment;
        }
        if is_challenge(message) {
            return self.verification_error();
        }
        BridgeError::Upstream { message: message.to_string() }
    }

    fn verification_error(&self) -> BridgeError {
        let start = self.gate.begin_verification();
        if start == VerificationStart::AlreadyAwaiting {
            tracing::info!("[{}] Verification page seen, refresh already pending", short_id(&self.request_id));
        }
        BridgeError::VerificationRequired { already_awaiting: start == VerificationStart::AlreadyAwaiting }
    }

    fn terminate(&mut self, error: BridgeError) -> Vec<StreamEvent> {
        self.finished = true;
        tracing::warn!("[{}] Stream ended with error: {}", short_id(&self.request_id), error);
        vec![StreamEvent::Error(error)]
    }
}

/// Drain an inbox into a stream of events.
///
/// Silence longer than `timeout` ends the stream with a single
/// [`BridgeError::RequestTimeout`]. Dropping the stream drops the inbox and
/// releases the pending request.
pub fn decode_inbox(mut inbox: Inbox, gate: Arc<dyn VerificationGate>, timeout: Duration) -> EventStream {
    let stream = async_stream::stream! {
        let request_id = inbox.request_id().to_string();
        let mut decoder = StreamDecoder::new(request_id.clone(), gate);

        loop {
            let fragment = match tokio::time::timeout(timeout, inbox.recv()).await {
                Ok(Some(fragment)) => fragment,
                Ok(None) => {
                    tracing::warn!("[{}] Inbox closed without sentinel", short_id(&request_id));
                    yield StreamEvent::Error(BridgeError::LinkDisconnected);
                    break;
                },
                Err(_) => {
                    tracing::warn!("[{}] No data from agent for {:?}", short_id(&request_id), timeout);
                    yield StreamEvent::Error(BridgeError::RequestTimeout { duration_secs: timeout.as_secs() });
                    break;
                },
            };

            for event in decoder.feed(fragment) {
                yield event;
            }
            if decoder.is_finished() {
                break;
            }
        }
        tracing::debug!("[{}] Decoder finished", short_id(&request_id));
    };
    Box::pin(stream)
}

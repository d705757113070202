//! Token grammar of the arena stream.
//!
//! The agent forwards the raw response body in arbitrary slices. Tokens look
//! like `a0:"text"`, `b2:[{"type":"image","image":"..."}]` or
//! `ad:{"finishReason":"stop"}`, where the leading `a`/`b` is the
//! participant marker. Slices may cut tokens anywhere, so matching is retried
//! on the unconsumed tail after every append.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Consumed prefix length that triggers buffer compaction.
const COMPACT_THRESHOLD: usize = 4096;

#[allow(clippy::expect_used, reason = "Static regex patterns are known to be valid")]
static TEXT_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[ab]0:"((?:\\.|[^"\\])*)""#).expect("text regex is valid"));

#[allow(clippy::expect_used, reason = "Static regex patterns are known to be valid")]
static TEXT_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[ab]0:""#).expect("text start regex is valid"));

#[allow(clippy::expect_used, reason = "Static regex patterns are known to be valid")]
static IMAGE_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"[ab]2:\[").expect("image regex is valid"));

#[allow(clippy::expect_used, reason = "Static regex patterns are known to be valid")]
static FINISH_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"[ab]d:\{"#).expect("finish regex is valid"));

#[allow(clippy::expect_used, reason = "Static regex patterns are known to be valid")]
static ERROR_START_RE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r#"\{\s*"error""#).expect("error regex is valid"));

#[allow(clippy::expect_used, reason = "Static regex patterns are known to be valid")]
static CHALLENGE_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)<title>Just a moment\.\.\.</title>|Enable JavaScript and cookies to continue")
        .expect("challenge regex is valid")
});

/// Default finish reason when a finish token carries none.
pub const DEFAULT_FINISH_REASON: &str = "stop";

/// A decoded token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Token {
    Content(String),
    Finish(String),
}

/// Condition that ends the stream before the sentinel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Interrupt {
    /// Human-verification interstitial
    Challenge,
    /// Inline `{"error": ...}` object; carries the error text
    ErrorObject(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum TokenKind {
    Text,
    Image,
    Finish,
}

/// Earliest token candidate in the unconsumed region.
enum Candidate {
    /// Complete token spanning `..end` of the region
    Complete { kind: TokenKind, end: usize, body: Body },
    /// Token start is present but its body has not fully arrived
    Incomplete,
}

enum Body {
    Text(String),
    Json(Value),
    Malformed(String),
}

/// Append-only text buffer with a read cursor.
#[derive(Debug, Default)]
pub struct Scanner {
    buffer: String,
    cursor: usize,
}

impl Scanner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, text: &str) {
        self.buffer.push_str(text);
    }

    /// Text not yet consumed by a token.
    pub fn unconsumed(&self) -> &str {
        &self.buffer[self.cursor..]
    }

    /// Check the unconsumed region for a challenge page or an inline error.
    ///
    /// An error object that is still incomplete is not reported; it will be
    /// seen again once more text arrives.
    pub fn detect_interrupt(&self) -> Option<Interrupt> {
        let region = self.unconsumed();
        if CHALLENGE_RE.is_match(region) {
            return Some(Interrupt::Challenge);
        }

        for start in ERROR_START_RE.find_iter(region).map(|m| m.start()) {
            let mut values = serde_json::Deserializer::from_str(&region[start..]).into_iter::<Value>();
            if let Some(Ok(value)) = values.next() {
                let message = match value.get("error") {
                    Some(Value::String(s)) => s.clone(),
                    Some(other) => other.to_string(),
                    None => continue,
                };
                return Some(Interrupt::ErrorObject(message));
            }
        }
        None
    }

    /// Next complete token in buffer order.
    ///
    /// Malformed tokens and empty text are consumed and skipped. Returns
    /// `None` when no complete token is left.
    pub fn next_token(&mut self) -> Option<Token> {
        loop {
            let (kind, end, body) = match self.earliest_candidate()? {
                Candidate::Complete { kind, end, body } => (kind, end, body),
                Candidate::Incomplete => return None,
            };
            self.cursor += end;
            let token = decode_token(kind, body);
            self.compact();
            if token.is_some() {
                return token;
            }
        }
    }

    /// Leftmost token start over all token classes.
    ///
    /// A text token that has started but not closed blocks everything after
    /// it, so markers quoted inside its body are never taken as tokens.
    fn earliest_candidate(&self) -> Option<Candidate> {
        let region = self.unconsumed();

        let text = TEXT_START_RE.find(region).map(|m| (m.start(), TokenKind::Text));
        let image = IMAGE_START_RE.find(region).map(|m| (m.start(), TokenKind::Image));
        let finish = FINISH_START_RE.find(region).map(|m| (m.start(), TokenKind::Finish));

        let (start, kind) = [text, image, finish].into_iter().flatten().min_by_key(|(start, _)| *start)?;

        if kind == TokenKind::Text {
            let Some(caps) = TEXT_RE.captures(&region[start..]) else {
                return Some(Candidate::Incomplete);
            };
            let (Some(whole), Some(body)) = (caps.get(0), caps.get(1)) else {
                return Some(Candidate::Incomplete);
            };
            if whole.start() != 0 {
                return Some(Candidate::Incomplete);
            }
            return Some(Candidate::Complete {
                kind,
                end: start + whole.end(),
                body: Body::Text(body.as_str().to_string()),
            });
        }

        // Marker is two bytes plus ':'; the JSON value starts right after it.
        let json_start = start + 3;
        let mut values = serde_json::Deserializer::from_str(&region[json_start..]).into_iter::<Value>();
        Some(match values.next() {
            Some(Ok(value)) => Candidate::Complete {
                kind,
                end: json_start + values.byte_offset(),
                body: Body::Json(value),
            },
            Some(Err(e)) if e.is_eof() => Candidate::Incomplete,
            Some(Err(e)) => Candidate::Complete { kind, end: json_start, body: Body::Malformed(e.to_string()) },
            None => Candidate::Incomplete,
        })
    }

    fn compact(&mut self) {
        if self.cursor >= COMPACT_THRESHOLD && self.cursor * 2 >= self.buffer.len() {
            self.buffer.drain(..self.cursor);
            self.cursor = 0;
        }
    }
}

fn decode_token(kind: TokenKind, body: Body) -> Option<Token> {
    let value = match body {
        Body::Text(escaped) => {
            return match serde_json::from_str::<String>(&format!("\"{escaped}\"")) {
                Ok(text) if !text.is_empty() => Some(Token::Content(text)),
                Ok(_) => None,
                Err(e) => {
                    tracing::warn!("Skipping text token with bad escape: {}", e);
                    None
                },
            };
        },
        Body::Malformed(reason) => {
            tracing::warn!("Skipping malformed {:?} token: {}", kind, reason);
            return None;
        },
        Body::Json(value) => value,
    };

    match kind {
        TokenKind::Image => {
            let first = value.as_array()?.first()?;
            if first.get("type").and_then(Value::as_str) != Some("image") {
                return None;
            }
            let url = first.get("image").and_then(Value::as_str)?;
            Some(Token::Content(format!("![Image]({url})")))
        },
        TokenKind::Finish => {
            let Some(reason) = value.get("finishReason") else {
                tracing::debug!("Ignoring d-token without finishReason");
                return None;
            };
            let reason = reason.as_str().unwrap_or(DEFAULT_FINISH_REASON);
            Some(Token::Finish(reason.to_string()))
        },
        TokenKind::Text => None,
    }
}

/// True if `text` contains a human-verification page marker.
pub fn is_challenge(text: &str) -> bool {
    CHALLENGE_RE.is_match(text)
}

//! Bridge request errors.

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors that can terminate a bridged chat request.
///
/// Every variant maps to an HTTP status and an OpenAI-style error code so the
/// HTTP layer can always answer with a well-shaped error body.
#[derive(Debug, Clone, Error, Serialize, Deserialize, PartialEq, Eq)]
#[serde(tag = "type", content = "details")]
pub enum BridgeError {
    /// No remote agent is connected (retryable by the caller)
    #[error("{}", if *awaiting_verification {
        "Waiting for the browser to finish human verification, please retry in a few seconds."
    } else {
        "Browser client is not connected. Make sure the arena page is open and the script is active."
    })]
    TransportUnavailable { awaiting_verification: bool },

    /// A request id was registered twice (programmer error)
    #[error("Request id already registered: {request_id}")]
    DuplicateRequestId { request_id: String },

    /// Upstream rejected an attachment as too large
    #[error("Upload failed: the attachment exceeds the arena server size limit (usually about 5MB). Try compressing it or sending a smaller file.")]
    OversizedAttachment,

    /// Upstream answered with a human-verification page
    #[error("{}", if *already_awaiting {
        "Waiting for human verification to complete..."
    } else {
        "Human verification detected, a refresh command was sent to the browser. Please retry shortly."
    })]
    VerificationRequired { already_awaiting: bool },

    /// A fragment could not be interpreted
    #[error("Malformed upstream fragment: {message}")]
    MalformedUpstreamFragment { message: String },

    /// Inbox stayed silent longer than the configured timeout
    #[error("Response timed out after {duration_secs} seconds.")]
    RequestTimeout { duration_secs: u64 },

    /// A newer agent connection replaced the one this request was bound to
    #[error("Browser link superseded by a new connection")]
    LinkSuperseded,

    /// The agent connection dropped while the request was in flight
    #[error("Browser disconnected during operation")]
    LinkDisconnected,

    /// Error reported by the upstream service, passed through verbatim
    #[error("{message}")]
    Upstream { message: String },

    /// Attachment upload to the file bed failed
    #[error("Attachment processing failed: {message}")]
    AttachmentUpload { message: String },

    /// Request validation failed
    #[error("Invalid request: {message}")]
    InvalidRequest { message: String },

    /// Neither an endpoint mapping nor usable default ids exist for the model
    #[error("{message}")]
    SessionNotConfigured { message: String },

    /// Internal bridge error (bugs, unexpected states)
    #[error("Internal bridge error: {message}")]
    Internal { message: String },
}

impl BridgeError {
    /// Get HTTP status code for this error.
    pub fn http_status_code(&self) -> u16 {
        match self {
            Self::TransportUnavailable { .. } => 503,
            Self::OversizedAttachment => 413,
            Self::InvalidRequest { .. } | Self::SessionNotConfigured { .. } => 400,
            Self::DuplicateRequestId { .. }
            | Self::VerificationRequired { .. }
            | Self::MalformedUpstreamFragment { .. }
            | Self::RequestTimeout { .. }
            | Self::LinkSuperseded
            | Self::LinkDisconnected
            | Self::Upstream { .. }
            | Self::AttachmentUpload { .. }
            | Self::Internal { .. } => 500,
        }
    }

    /// OpenAI-style `error.code` for response bodies.
    pub fn error_code(&self) -> &'static str {
        match self {
            Self::OversizedAttachment => "attachment_too_large",
            Self::TransportUnavailable { .. } => "service_unavailable",
            Self::InvalidRequest { .. } | Self::SessionNotConfigured { .. } => "invalid_request",
            Self::AttachmentUpload { .. } => "attachment_error",
            _ => "processing_error",
        }
    }

    /// OpenAI-style `error.type` for response bodies.
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::AttachmentUpload { .. } => "attachment_error",
            Self::InvalidRequest { .. } | Self::SessionNotConfigured { .. } => {
                "invalid_request_error"
            },
            Self::Internal { .. } | Self::DuplicateRequestId { .. } => "internal_server_error",
            _ => "bridge_error",
        }
    }

    /// True when the request ended because the remote agent link went away.
    pub fn is_link_loss(&self) -> bool {
        matches!(self, Self::LinkSuperseded | Self::LinkDisconnected)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_http_status_codes() {
        assert_eq!(BridgeError::OversizedAttachment.http_status_code(), 413);
        assert_eq!(
            BridgeError::TransportUnavailable { awaiting_verification: false }.http_status_code(),
            503
        );
        assert_eq!(BridgeError::RequestTimeout { duration_secs: 5 }.http_status_code(), 500);
        assert_eq!(
            BridgeError::InvalidRequest { message: "bad".to_string() }.http_status_code(),
            400
        );
    }

    #[test]
    fn test_oversized_attachment_has_distinguished_code() {
        assert_eq!(BridgeError::OversizedAttachment.error_code(), "attachment_too_large");
        assert_eq!(
            BridgeError::Upstream { message: "boom".to_string() }.error_code(),
            "processing_error"
        );
    }

    #[test]
    fn test_timeout_message_mentions_duration() {
        let msg = BridgeError::RequestTimeout { duration_secs: 360 }.to_string();
        assert_eq!(msg, "Response timed out after 360 seconds.");
    }

    #[test]
    fn test_verification_messages_differ() {
        let first = BridgeError::VerificationRequired { already_awaiting: false }.to_string();
        let again = BridgeError::VerificationRequired { already_awaiting: true }.to_string();
        assert!(first.contains("refresh"));
        assert!(again.contains("Waiting"));
    }

    #[test]
    fn test_link_loss() {
        assert!(BridgeError::LinkSuperseded.is_link_loss());
        assert!(BridgeError::LinkDisconnected.is_link_loss());
        assert!(!BridgeError::OversizedAttachment.is_link_loss());
    }
}

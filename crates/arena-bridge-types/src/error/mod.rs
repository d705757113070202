//! Typed error definitions for Arena Bridge.
//!
//! - **`BridgeError`** - everything that can end a bridged chat request
//! - **`ConfigError`** - config and lookup table loading failures

mod bridge;
mod config;

pub use bridge::BridgeError;
pub use config::ConfigError;

/// Standard Result type using BridgeError.
pub type Result<T> = std::result::Result<T, BridgeError>;

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_error_serialization() {
        let err = BridgeError::DuplicateRequestId { request_id: "req-123".to_string() };

        let json = serde_json::to_string(&err).unwrap();
        assert!(json.contains("DuplicateRequestId"));
        assert!(json.contains("req-123"));

        let deserialized: BridgeError = serde_json::from_str(&json).unwrap();
        assert_eq!(err, deserialized);
    }

    #[test]
    fn test_config_error_display() {
        let err = ConfigError::ParseError {
            path: "config.jsonc".to_string(),
            message: "expected value".to_string(),
        };

        let msg = format!("{}", err);
        assert!(msg.contains("config.jsonc"));
        assert!(msg.contains("expected value"));
    }
}

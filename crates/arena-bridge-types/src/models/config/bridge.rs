//! Bridge configuration (`config.jsonc`).

use serde::{Deserialize, Serialize};
use validator::Validate;

use super::enums::{ConversationMode, Participant};

/// Marker left in template configs for ids that were never captured.
const PLACEHOLDER_MARKER: &str = "YOUR_";

/// Full bridge configuration.
///
/// Unknown keys in the file are ignored so that configs written for newer or
/// older versions still load.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Validate)]
#[allow(
    clippy::struct_excessive_bools,
    reason = "Configuration struct - bools are intentional feature flags"
)]
pub struct BridgeConfig {
    /// Default arena session id
    #[serde(default)]
    pub session_id: Option<String>,
    /// Default arena message id
    #[serde(default)]
    pub message_id: Option<String>,
    /// Conversation mode used when no endpoint mapping overrides it
    #[serde(default, rename = "id_updater_last_mode")]
    pub mode: ConversationMode,
    /// Battle mode target used when no endpoint mapping overrides it
    #[serde(default, rename = "id_updater_battle_target")]
    pub battle_target: Participant,
    /// Merge all system prompts into a single leading system turn
    #[serde(default)]
    pub tavern_mode_enabled: bool,
    /// Append an empty user turn for text models
    #[serde(default)]
    pub bypass_enabled: bool,
    /// Fall back to the default ids when a model has no endpoint mapping
    #[serde(default = "default_true")]
    pub use_default_ids_if_mapping_not_found: bool,
    /// Inbound silence allowed before a request fails, in seconds
    #[validate(range(min = 1_u64, max = 86_400_u64))]
    #[serde(default = "default_stream_timeout")]
    pub stream_response_timeout_seconds: u64,
    /// Force a reconnect after a period without API traffic
    #[serde(default)]
    pub enable_idle_restart: bool,
    /// Idle period in seconds; `-1` disables the check
    #[validate(range(min = -1_i64))]
    #[serde(default = "default_idle_timeout")]
    pub idle_restart_timeout_seconds: i64,
    /// Bearer key required on `/v1/*` when non-empty
    #[serde(default)]
    pub api_key: Option<String>,
    /// Upload image attachments to the file bed before sending
    #[serde(default)]
    pub file_bed_enabled: bool,
    /// File bed `/upload` endpoint
    #[serde(default)]
    pub file_bed_upload_url: Option<String>,
    /// Optional file bed key
    #[serde(default)]
    pub file_bed_api_key: Option<String>,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            session_id: None,
            message_id: None,
            mode: ConversationMode::default(),
            battle_target: Participant::default(),
            tavern_mode_enabled: false,
            bypass_enabled: false,
            use_default_ids_if_mapping_not_found: true,
            stream_response_timeout_seconds: default_stream_timeout(),
            enable_idle_restart: false,
            idle_restart_timeout_seconds: default_idle_timeout(),
            api_key: None,
            file_bed_enabled: false,
            file_bed_upload_url: None,
            file_bed_api_key: None,
        }
    }
}

impl BridgeConfig {
    /// The configured API key, if one is set and non-empty.
    pub fn effective_api_key(&self) -> Option<&str> {
        self.api_key.as_deref().filter(|k| !k.is_empty())
    }

    /// Idle timeout in seconds, or `None` when idle restarts are off.
    pub fn idle_timeout_secs(&self) -> Option<u64> {
        if !self.enable_idle_restart || self.idle_restart_timeout_seconds < 0 {
            return None;
        }
        u64::try_from(self.idle_restart_timeout_seconds).ok()
    }

    /// File bed upload URL with escaped slashes (`\/`) normalized.
    pub fn file_bed_url(&self) -> Option<String> {
        self.file_bed_upload_url
            .as_deref()
            .filter(|u| !u.is_empty())
            .map(|u| u.replace("\\/", "/"))
    }
}

/// True if an id is present and not an unfilled template placeholder.
pub fn is_usable_id(id: Option<&str>) -> bool {
    id.is_some_and(|s| !s.is_empty() && !s.contains(PLACEHOLDER_MARKER))
}

const fn default_true() -> bool {
    true
}

pub const fn default_stream_timeout() -> u64 {
    360
}

pub const fn default_idle_timeout() -> i64 {
    300
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_from_empty_object() {
        let config: BridgeConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, BridgeConfig::default());
        assert!(config.use_default_ids_if_mapping_not_found);
        assert_eq!(config.stream_response_timeout_seconds, 360);
        assert_eq!(config.mode, ConversationMode::DirectChat);
    }

    #[test]
    fn test_original_field_names() {
        let config: BridgeConfig = serde_json::from_str(
            r#"{
                "version": "2.0.0",
                "session_id": "abc",
                "message_id": "def",
                "id_updater_last_mode": "battle",
                "id_updater_battle_target": "B",
                "tavern_mode_enabled": true
            }"#,
        )
        .unwrap();
        assert_eq!(config.mode, ConversationMode::Battle);
        assert_eq!(config.battle_target, Participant::B);
        assert!(config.tavern_mode_enabled);
        assert_eq!(config.session_id.as_deref(), Some("abc"));
    }

    #[test]
    fn test_idle_timeout_disabled_by_minus_one() {
        let mut config = BridgeConfig { enable_idle_restart: true, ..Default::default() };
        assert_eq!(config.idle_timeout_secs(), Some(300));
        config.idle_restart_timeout_seconds = -1;
        assert_eq!(config.idle_timeout_secs(), None);
        config.enable_idle_restart = false;
        config.idle_restart_timeout_seconds = 10;
        assert_eq!(config.idle_timeout_secs(), None);
    }

    #[test]
    fn test_validation_rejects_zero_timeout() {
        let config = BridgeConfig { stream_response_timeout_seconds: 0, ..Default::default() };
        assert!(config.validate().is_err());
        assert!(BridgeConfig::default().validate().is_ok());
    }

    #[test]
    fn test_placeholder_ids_are_unusable() {
        assert!(is_usable_id(Some("d6a1-4c")));
        assert!(!is_usable_id(Some("YOUR_SESSION_ID")));
        assert!(!is_usable_id(Some("")));
        assert!(!is_usable_id(None));
    }

    #[test]
    fn test_file_bed_url_unescapes_slashes() {
        let config = BridgeConfig {
            file_bed_upload_url: Some("http:\\/\\/127.0.0.1:5180\\/upload".to_string()),
            ..Default::default()
        };
        assert_eq!(config.file_bed_url().as_deref(), Some("http://127.0.0.1:5180/upload"));
    }
}

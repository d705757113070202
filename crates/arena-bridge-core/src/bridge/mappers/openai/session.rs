//! Model → arena session resolution.

use arena_bridge_types::models::config::is_usable_id;
use arena_bridge_types::{BridgeConfig, BridgeError, ConversationMode, EndpointTable, Participant};
use rand::seq::SliceRandom;

use crate::bridge::common::id_tail;

/// Session ids (and optional mode override) chosen for one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedSession {
    pub session_id: String,
    pub message_id: String,
    pub mode_override: Option<ConversationMode>,
    pub battle_target_override: Option<Participant>,
}

/// Pick the session for `model`.
///
/// A mapped model uses one of its bindings (chosen at random when there are
/// several). Unmapped models use the default ids when the config allows it;
/// the per-model mode override never applies to the defaults.
pub fn resolve_session(
    model: &str,
    config: &BridgeConfig,
    endpoints: &EndpointTable,
) -> Result<ResolvedSession, BridgeError> {
    let mapped = endpoints
        .candidates(model)
        .choose(&mut rand::thread_rng())
        .filter(|m| m.session_id.as_deref().is_some_and(|s| !s.is_empty()));

    let resolved = match mapped {
        Some(mapping) => {
            tracing::info!(
                "Model '{}' mapped to session ...{} (mode: {})",
                model,
                mapping.session_id.as_deref().map(id_tail).unwrap_or("N/A"),
                mapping.mode.map_or_else(|| "default".to_string(), |m| m.to_string())
            );
            ResolvedSession {
                session_id: mapping.session_id.clone().unwrap_or_default(),
                message_id: mapping.message_id.clone().unwrap_or_default(),
                mode_override: mapping.mode,
                battle_target_override: mapping.battle_target,
            }
        },
        None if config.use_default_ids_if_mapping_not_found => {
            tracing::info!(
                "Model '{}' has no endpoint mapping, using default session ...{}",
                model,
                config.session_id.as_deref().map(id_tail).unwrap_or("N/A")
            );
            ResolvedSession {
                session_id: config.session_id.clone().unwrap_or_default(),
                message_id: config.message_id.clone().unwrap_or_default(),
                mode_override: None,
                battle_target_override: None,
            }
        },
        None => {
            tracing::error!("Model '{}' has no endpoint mapping and default ids are disabled", model);
            return Err(BridgeError::SessionNotConfigured {
                message: format!(
                    "Model '{model}' has no dedicated session. Add a mapping to model_endpoint_map.json or enable 'use_default_ids_if_mapping_not_found' in config.jsonc."
                ),
            });
        },
    };

    if !is_usable_id(Some(&resolved.session_id)) || !is_usable_id(Some(&resolved.message_id)) {
        return Err(BridgeError::SessionNotConfigured {
            message: "The resolved session id or message id is invalid. Check model_endpoint_map.json and config.jsonc, or capture fresh ids.".to_string(),
        });
    }
    Ok(resolved)
}

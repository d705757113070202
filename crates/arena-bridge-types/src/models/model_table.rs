//! Model and endpoint lookup tables.
//!
//! Both tables are supplied by collaborators (`models.json` and
//! `model_endpoint_map.json`) and are read-only to the bridge core.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use super::config::{ConversationMode, Modality, Participant};

/// Resolved entry of the model table.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
pub struct ModelEntry {
    /// Arena model id; `None` when the table lists the model without one
    pub id: Option<String>,
    /// Output modality
    #[serde(rename = "type", default)]
    pub modality: Modality,
}

impl ModelEntry {
    /// Parse a raw `models.json` value: `"<id>"` or `"<id>:<type>"`, where an
    /// id of `null` means "no id".
    pub fn parse(raw: &str) -> Self {
        match raw.split_once(':') {
            Some((id, kind)) => {
                let id = (!id.eq_ignore_ascii_case("null") && !id.is_empty())
                    .then(|| id.to_string());
                Self { id, modality: Modality::from_string(kind) }
            },
            None => Self { id: Some(raw.to_string()), modality: Modality::Text },
        }
    }
}

/// Model name → entry. Ordered so `/v1/models` output is stable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct ModelTable {
    entries: BTreeMap<String, ModelEntry>,
}

impl ModelTable {
    /// Build the table from the raw `name → "id[:type]"` map.
    pub fn from_raw(raw: BTreeMap<String, String>) -> Self {
        let entries = raw.into_iter().map(|(name, value)| (name, ModelEntry::parse(&value))).collect();
        Self { entries }
    }

    pub fn get(&self, name: &str) -> Option<&ModelEntry> {
        self.entries.get(name)
    }

    /// Modality of a model; unknown models are treated as text.
    pub fn modality(&self, name: &str) -> Modality {
        self.get(name).map(|e| e.modality).unwrap_or_default()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Session binding for one model.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct EndpointMapping {
    pub session_id: Option<String>,
    pub message_id: Option<String>,
    /// Per-model conversation mode override
    #[serde(default)]
    pub mode: Option<ConversationMode>,
    /// Per-model battle target override
    #[serde(default)]
    pub battle_target: Option<Participant>,
}

/// A model maps either to one binding (legacy format) or to a pool of them.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(untagged)]
pub enum EndpointEntry {
    Many(Vec<EndpointMapping>),
    Single(EndpointMapping),
}

impl EndpointEntry {
    /// All bindings this entry offers.
    pub fn candidates(&self) -> &[EndpointMapping] {
        match self {
            Self::Many(list) => list,
            Self::Single(one) => std::slice::from_ref(one),
        }
    }
}

/// Model name → session bindings.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(transparent)]
pub struct EndpointTable {
    entries: BTreeMap<String, EndpointEntry>,
}

impl EndpointTable {
    pub fn new(entries: BTreeMap<String, EndpointEntry>) -> Self {
        Self { entries }
    }

    /// Bindings for a model; empty when the model is not mapped.
    pub fn candidates(&self, model: &str) -> &[EndpointMapping] {
        self.entries.get(model).map(EndpointEntry::candidates).unwrap_or_default()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

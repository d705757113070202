//! Loading of `config.jsonc`, `models.json` and `model_endpoint_map.json`.
//!
//! Every loader is forgiving: a missing or broken file is logged and replaced
//! by an empty/default value so the bridge can always start.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use arena_bridge_types::{BridgeConfig, ConfigError, EndpointTable, ModelTable};
use validator::Validate;

use crate::error::AppResult;

pub const CONFIG_FILE: &str = "config.jsonc";
pub const MODELS_FILE: &str = "models.json";
pub const ENDPOINT_MAP_FILE: &str = "model_endpoint_map.json";
pub const AVAILABLE_MODELS_FILE: &str = "available_models.json";

/// Remove `//` line comments and `/* */` block comments from JSONC text.
///
/// Comment markers inside string literals are kept.
pub fn strip_jsonc_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            match c {
                '\\' => {
                    if let Some(escaped) = chars.next() {
                        out.push(escaped);
                    }
                },
                '"' => in_string = false,
                _ => {},
            }
            continue;
        }

        match (c, chars.peek()) {
            ('"', _) => {
                in_string = true;
                out.push(c);
            },
            ('/', Some('/')) => {
                for next in chars.by_ref() {
                    if next == '\n' {
                        out.push('\n');
                        break;
                    }
                }
            },
            ('/', Some('*')) => {
                chars.next();
                let mut prev = '\0';
                for next in chars.by_ref() {
                    if prev == '*' && next == '/' {
                        break;
                    }
                    if next == '\n' {
                        out.push('\n');
                    }
                    prev = next;
                }
            },
            _ => out.push(c),
        }
    }
    out
}

/// Parse and validate a `config.jsonc` document.
pub fn parse_config(path: &Path, content: &str) -> Result<BridgeConfig, ConfigError> {
    let display = path.display().to_string();
    let config: BridgeConfig = serde_json::from_str(&strip_jsonc_comments(content))
        .map_err(|e| ConfigError::from_json_error(&display, &e))?;
    config.validate().map_err(|e| ConfigError::ValidationError {
        field: display,
        message: e.to_string(),
    })?;
    Ok(config)
}

/// Load `config.jsonc` from `data_dir`.
pub fn load_config(data_dir: &Path) -> Result<BridgeConfig, ConfigError> {
    let path = data_dir.join(CONFIG_FILE);
    let content = std::fs::read_to_string(&path)
        .map_err(|_| ConfigError::NotFound { path: path.display().to_string() })?;
    parse_config(&path, &content)
}

/// Load `config.jsonc`, falling back to defaults on any failure.
pub fn load_config_or_default(data_dir: &Path) -> BridgeConfig {
    match load_config(data_dir) {
        Ok(config) => config,
        Err(e) => {
            tracing::error!("Failed to load {}: {}. Using defaults.", CONFIG_FILE, e);
            BridgeConfig::default()
        },
    }
}

/// Load `models.json`. Non-string values are skipped.
pub fn load_model_table(data_dir: &Path) -> ModelTable {
    let path = data_dir.join(MODELS_FILE);
    let raw: BTreeMap<String, serde_json::Value> = match read_json(&path) {
        Ok(Some(raw)) => raw,
        Ok(None) => BTreeMap::new(),
        Err(e) => {
            tracing::error!("Failed to load {}: {}. Using an empty model list.", MODELS_FILE, e);
            BTreeMap::new()
        },
    };

    let entries = raw
        .into_iter()
        .filter_map(|(name, value)| match value {
            serde_json::Value::String(s) => Some((name, s)),
            other => {
                tracing::warn!("Ignoring model '{}' with non-string value {}", name, other);
                None
            },
        })
        .collect();

    let table = ModelTable::from_raw(entries);
    tracing::info!("Loaded {} models from {}", table.len(), MODELS_FILE);
    table
}

/// Load `model_endpoint_map.json`. An empty file is an empty table.
pub fn load_endpoint_table(data_dir: &Path) -> EndpointTable {
    let path = data_dir.join(ENDPOINT_MAP_FILE);
    match read_json::<EndpointTable>(&path) {
        Ok(Some(table)) => {
            tracing::info!("Loaded {} endpoint mappings from {}", table.len(), ENDPOINT_MAP_FILE);
            table
        },
        Ok(None) => EndpointTable::default(),
        Err(e) => {
            tracing::error!("Failed to load {}: {}. Using an empty map.", ENDPOINT_MAP_FILE, e);
            EndpointTable::default()
        },
    }
}

/// Read a JSON file. `Ok(None)` when the file is missing or blank.
fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<Option<T>, ConfigError> {
    let content = match std::fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            tracing::warn!("{} not found", path.display());
            return Ok(None);
        },
        Err(e) => {
            return Err(ConfigError::ParseError {
                path: path.display().to_string(),
                message: e.to_string(),
            })
        },
    };
    if content.trim().is_empty() {
        return Ok(None);
    }
    serde_json::from_str(&content)
        .map(Some)
        .map_err(|e| ConfigError::from_json_error(path.display().to_string(), &e))
}

/// Write the discovered model list to `available_models.json` (pretty, atomic).
pub async fn save_available_models(data_dir: &Path, models: &[serde_json::Value]) -> AppResult<PathBuf> {
    let path = data_dir.join(AVAILABLE_MODELS_FILE);
    let temp_path = path.with_extension("json.tmp");
    let json_str = serde_json::to_string_pretty(models)?;

    tokio::fs::write(&temp_path, &json_str).await?;
    tokio::fs::rename(&temp_path, &path).await?;
    Ok(path)
}

/// Source of configuration for the request path.
///
/// The config file is re-read for every chat request so ids captured by the
/// agent tooling take effect without a restart; the lookup tables are loaded
/// once at startup.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    data_dir: Option<PathBuf>,
    fixed: Arc<BridgeConfig>,
    models: Arc<ModelTable>,
    endpoints: Arc<EndpointTable>,
}

impl ConfigStore {
    /// Load everything from `data_dir`.
    pub fn load(data_dir: impl Into<PathBuf>) -> Self {
        let data_dir = data_dir.into();
        let config = load_config_or_default(&data_dir);
        tracing::info!(
            "Config: tavern mode {}, bypass mode {}, mode {}",
            on_off(config.tavern_mode_enabled),
            on_off(config.bypass_enabled),
            config.mode
        );
        Self {
            models: Arc::new(load_model_table(&data_dir)),
            endpoints: Arc::new(load_endpoint_table(&data_dir)),
            fixed: Arc::new(config),
            data_dir: Some(data_dir),
        }
    }

    /// A store that never touches the disk.
    pub fn fixed(config: BridgeConfig, models: ModelTable, endpoints: EndpointTable) -> Self {
        Self {
            data_dir: None,
            fixed: Arc::new(config),
            models: Arc::new(models),
            endpoints: Arc::new(endpoints),
        }
    }

    /// Current config, re-read from disk when backed by a directory.
    pub fn current(&self) -> BridgeConfig {
        match &self.data_dir {
            Some(dir) => load_config_or_default(dir),
            None => (*self.fixed).clone(),
        }
    }

    pub fn models(&self) -> &ModelTable {
        &self.models
    }

    pub fn endpoints(&self) -> &EndpointTable {
        &self.endpoints
    }

    pub fn data_dir(&self) -> Option<&Path> {
        self.data_dir.as_deref()
    }
}

const fn on_off(flag: bool) -> &'static str {
    if flag {
        "on"
    } else {
        "off"
    }
}

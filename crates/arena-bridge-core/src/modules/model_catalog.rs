//! Model discovery from the arena page source.
//!
//! The page embeds its model list as escaped JSON inside a script tag
//! (`{\"id\":\"<uuid>\", ... \"publicName\":\"...\"}`). Objects are located by
//! their id prefix and cut out with brace matching.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

/// Upper bound on the size of one embedded model object.
const MAX_OBJECT_LEN: usize = 10_000;

static MODEL_START_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[allow(clippy::expect_used, reason = "Static regex pattern is known to be valid")]
    Regex::new(r#"\{\\"id\\":\\"[a-f0-9-]+\\""#).expect("model start regex is valid")
});

/// Extract model objects from page HTML, deduplicated by `publicName`.
///
/// Objects that do not parse, or that have no `publicName`, are skipped.
pub fn extract_models_from_html(html: &str) -> Vec<Value> {
    let bytes = html.as_bytes();
    let mut models = Vec::new();
    let mut seen = HashSet::new();

    for start in MODEL_START_RE.find_iter(html).map(|m| m.start()) {
        let Some(end) = matching_brace(bytes, start) else {
            continue;
        };

        let unescaped = html[start..end].replace("\\\"", "\"").replace("\\\\", "\\");
        let model: Value = match serde_json::from_str(&unescaped) {
            Ok(v) => v,
            Err(e) => {
                let preview: String = unescaped.chars().take(150).collect();
                tracing::warn!("Skipping unparsable model object: {} ({}...)", e, preview);
                continue;
            },
        };

        let Some(name) = model.get("publicName").and_then(Value::as_str) else {
            continue;
        };
        if seen.insert(name.to_string()) {
            models.push(model);
        }
    }

    if models.is_empty() {
        tracing::error!("No model objects found in page source");
    } else {
        tracing::info!("Extracted {} models from page source", models.len());
    }
    models
}

/// Byte index one past the brace closing the object that opens at `start`.
fn matching_brace(bytes: &[u8], start: usize) -> Option<usize> {
    let limit = bytes.len().min(start + MAX_OBJECT_LEN);
    let mut depth = 0_usize;
    for (i, b) in bytes.iter().enumerate().take(limit).skip(start) {
        match b {
            b'{' => depth += 1,
            b'}' => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    return Some(i + 1);
                }
            },
            _ => {},
        }
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;

    fn embed(json: &str) -> String {
        json.replace('"', "\\\"")
    }

    #[test]
    fn test_extracts_and_dedups() {
        let a = embed(r#"{"id":"0a1b-2c","publicName":"model-a","capabilities":{"outputCapabilities":{"text":true}}}"#);
        let dup = embed(r#"{"id":"ffff-00","publicName":"model-a"}"#);
        let b = embed(r#"{"id":"3d4e","publicName":"model-b"}"#);
        let html = format!("<script>self.__next_f.push([1,\"{a},{dup},{b}\"])</script>");

        let models = extract_models_from_html(&html);
        assert_eq!(models.len(), 2);
        assert_eq!(models[0]["publicName"], "model-a");
        assert_eq!(models[0]["capabilities"]["outputCapabilities"]["text"], true);
        assert_eq!(models[1]["id"], "3d4e");
    }

    #[test]
    fn test_unterminated_object_is_skipped() {
        let html = embed(r#"{"id":"abc","publicName":"x""#);
        assert!(extract_models_from_html(&html).is_empty());
    }

    #[test]
    fn test_no_models() {
        assert!(extract_models_from_html("<html><body>nothing</body></html>").is_empty());
    }
}

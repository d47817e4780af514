//! Language and session preferences, stored beside the ledger.
//!
//! `pending_request` holds the serialized reconnect context of a request
//! that was still in flight when the session ended, so a later session can
//! re-open its channel without resubmitting.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::storage::Storage;

const STORAGE_KEY: &str = "wordgen.preferences";

#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct Preferences {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ui_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_language: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pending_request: Option<Value>,
}

/// Best-effort load; any failure yields defaults.
pub fn load_preferences(storage: &dyn Storage) -> Preferences {
    match storage.get(STORAGE_KEY) {
        Ok(Some(raw)) => serde_json::from_str(&raw).unwrap_or_else(|err| {
            tracing::warn!(%err, "corrupt preferences; using defaults");
            Preferences::default()
        }),
        Ok(None) => Preferences::default(),
        Err(err) => {
            tracing::warn!(%err, "failed to read preferences; using defaults");
            Preferences::default()
        }
    }
}

/// Best-effort save; failures are logged and swallowed.
pub fn save_preferences(storage: &dyn Storage, prefs: &Preferences) {
    let raw = match serde_json::to_string(prefs) {
        Ok(raw) => raw,
        Err(err) => {
            tracing::warn!(%err, "failed to serialize preferences");
            return;
        }
    };
    if let Err(err) = storage.set(STORAGE_KEY, &raw) {
        tracing::warn!(%err, "failed to persist preferences");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::MemoryStorage;
    use serde_json::json;

    #[test]
    fn preferences_roundtrip() {
        let storage = MemoryStorage::new();
        let prefs = Preferences {
            ui_language: Some("de".to_string()),
            target_language: Some("en".to_string()),
            pending_request: Some(json!({"source_word": "Haus", "target_language": "en"})),
        };
        save_preferences(&storage, &prefs);
        assert_eq!(load_preferences(&storage), prefs);
    }

    #[test]
    fn corrupt_preferences_fall_back_to_defaults() {
        let storage = MemoryStorage::new();
        storage.set(STORAGE_KEY, "{broken").expect("seed");
        assert_eq!(load_preferences(&storage), Preferences::default());
    }
}

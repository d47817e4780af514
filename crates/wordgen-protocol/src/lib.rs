use serde::{Deserialize, Serialize};

pub mod event;
pub mod tags;

pub use event::{decode_frame, InboundEvent, ProtocolError, RawFrame};

/// A user-initiated ask to generate a not-yet-existing vocabulary entry.
/// Immutable once submitted; identifies exactly one pipeline run.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct WordRequest {
    pub source_word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl WordRequest {
    pub fn new(source_word: impl Into<String>, target_language: impl Into<String>) -> Self {
        Self {
            source_word: source_word.into(),
            source_language: None,
            target_language: target_language.into(),
            request_id: None,
        }
    }

    pub fn with_source_language(mut self, lang: impl Into<String>) -> Self {
        self.source_language = Some(lang.into());
        self
    }
}

/// Synchronous acknowledgment from the submission endpoint.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubmitAck {
    pub request_id: String,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}

/// Opaque tokens identifying a persisted word result. Treated as
/// unstructured identifiers; never parsed beyond routing needs.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct StorageAddress {
    pub pk: String,
    pub sk: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

impl StorageAddress {
    pub fn new(pk: impl Into<String>, sk: impl Into<String>) -> Self {
        Self {
            pk: pk.into(),
            sk: sk.into(),
            media_ref: None,
        }
    }

    pub fn with_media_ref(mut self, media_ref: impl Into<String>) -> Self {
        self.media_ref = Some(media_ref.into());
        self
    }
}

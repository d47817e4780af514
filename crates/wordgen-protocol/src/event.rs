//! Inbound frame decoding for the generation channel.
//!
//! Frames arrive as JSON shaped `{type, data?, request_id?, step?,
//! source_word?}`. Interpretation is presence-driven: variants keep the raw
//! `data` payload and expose only the fields a consumer may rely on having
//! been extracted already. Unrecognized tags decode to [`InboundEvent::Unknown`]
//! and are forwarded, never silently dropped.

use serde::Deserialize;
use serde_json::Value;

use crate::tags;

#[derive(thiserror::Error, Debug)]
pub enum ProtocolError {
    #[error("undecodable frame: {0}")]
    Undecodable(String),
}

/// Wire shape of a single channel frame, decoded leniently.
#[derive(Debug, Clone, Deserialize)]
pub struct RawFrame {
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default)]
    pub data: Option<Value>,
    #[serde(default)]
    pub request_id: Option<String>,
    #[serde(default)]
    pub step: Option<String>,
    #[serde(default)]
    pub source_word: Option<String>,
}

/// Closed set of channel events. Every variant that may carry partial
/// result fields keeps its raw payload; absence of a field is normal.
#[derive(Debug, Clone)]
pub enum InboundEvent {
    SubscriptionConfirmed {
        request_id: Option<String>,
    },
    ProcessingStarted {
        request_id: Option<String>,
        data: Value,
    },
    ChunkUpdate {
        request_id: Option<String>,
        data: Value,
    },
    StepUpdate {
        step: String,
        request_id: Option<String>,
        data: Value,
    },
    ProcessingCompleted {
        request_id: Option<String>,
        data: Value,
    },
    ProcessingFailed {
        reason: Option<String>,
        request_id: Option<String>,
        data: Value,
    },
    ValidationFailed {
        issue: Option<String>,
        detected_language: Option<String>,
        suggestions: Vec<String>,
        data: Value,
    },
    WordExistsRedirect {
        request_id: Option<String>,
        source_word: Option<String>,
        data: Value,
    },
    ConnectionClose {
        message: Option<String>,
    },
    Unknown {
        tag: String,
        data: Value,
    },
}

impl InboundEvent {
    /// The wire tag this event decoded from.
    pub fn tag(&self) -> &str {
        match self {
            InboundEvent::SubscriptionConfirmed { .. } => tags::TAG_SUBSCRIPTION_CONFIRMED,
            InboundEvent::ProcessingStarted { .. } => tags::TAG_PROCESSING_STARTED,
            InboundEvent::ChunkUpdate { .. } => tags::TAG_CHUNK_UPDATE,
            InboundEvent::StepUpdate { .. } => tags::TAG_STEP_UPDATE,
            InboundEvent::ProcessingCompleted { .. } => tags::TAG_PROCESSING_COMPLETED,
            InboundEvent::ProcessingFailed { .. } => tags::TAG_PROCESSING_FAILED,
            InboundEvent::ValidationFailed { .. } => tags::TAG_VALIDATION_FAILED,
            InboundEvent::WordExistsRedirect { .. } => tags::TAG_WORD_EXISTS_REDIRECT,
            InboundEvent::ConnectionClose { .. } => tags::TAG_CONNECTION_CLOSE,
            InboundEvent::Unknown { tag, .. } => tag.as_str(),
        }
    }

    /// True for events that end the pipeline run one way or another.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            InboundEvent::ProcessingCompleted { .. }
                | InboundEvent::ProcessingFailed { .. }
                | InboundEvent::ValidationFailed { .. }
                | InboundEvent::WordExistsRedirect { .. }
        )
    }

    pub fn from_frame(frame: RawFrame) -> Self {
        let RawFrame {
            kind,
            data,
            request_id,
            step,
            source_word,
        } = frame;
        let data = data.unwrap_or(Value::Null);
        match kind.as_str() {
            tags::TAG_SUBSCRIPTION_CONFIRMED => InboundEvent::SubscriptionConfirmed { request_id },
            tags::TAG_PROCESSING_STARTED => InboundEvent::ProcessingStarted { request_id, data },
            tags::TAG_CHUNK_UPDATE => InboundEvent::ChunkUpdate { request_id, data },
            tags::TAG_STEP_UPDATE => InboundEvent::StepUpdate {
                // Some producers put the step name inside the payload instead.
                step: step
                    .or_else(|| {
                        data.get("step")
                            .and_then(|v| v.as_str())
                            .map(|s| s.to_string())
                    })
                    .unwrap_or_default(),
                request_id,
                data,
            },
            tags::TAG_PROCESSING_COMPLETED => InboundEvent::ProcessingCompleted { request_id, data },
            tags::TAG_PROCESSING_FAILED => InboundEvent::ProcessingFailed {
                reason: str_field(&data, "reason")
                    .or_else(|| str_field(&data, "error"))
                    .or_else(|| str_field(&data, "message")),
                request_id,
                data,
            },
            tags::TAG_VALIDATION_FAILED => InboundEvent::ValidationFailed {
                issue: str_field(&data, "issue").or_else(|| str_field(&data, "message")),
                detected_language: str_field(&data, "detected_language")
                    .or_else(|| str_field(&data, "detected_source_language")),
                suggestions: string_array(&data, "suggestions"),
                data,
            },
            tags::TAG_WORD_EXISTS_REDIRECT => InboundEvent::WordExistsRedirect {
                request_id,
                source_word,
                data,
            },
            tags::TAG_CONNECTION_CLOSE => InboundEvent::ConnectionClose {
                message: str_field(&data, "message"),
            },
            _ => InboundEvent::Unknown { tag: kind, data },
        }
    }
}

/// Decode one raw frame string. A parse failure is a [`ProtocolError`];
/// an unrecognized tag is not.
pub fn decode_frame(raw: &str) -> Result<InboundEvent, ProtocolError> {
    let frame: RawFrame =
        serde_json::from_str(raw).map_err(|e| ProtocolError::Undecodable(e.to_string()))?;
    Ok(InboundEvent::from_frame(frame))
}

fn str_field(data: &Value, key: &str) -> Option<String> {
    data.get(key)
        .and_then(|v| v.as_str())
        .filter(|s| !s.is_empty())
        .map(|s| s.to_string())
}

fn string_array(data: &Value, key: &str) -> Vec<String> {
    data.get(key)
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

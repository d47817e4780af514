//! Connection management for the word-generation channel.
//!
//! One [`ConnectionManager`] owns at most one live push channel at a time:
//! [`ConnectionManager::submit`] validates and posts a new request, then
//! opens the channel; [`ConnectionManager::reconnect`] re-opens it for an
//! already-submitted request from an explicit, serializable
//! [`ReconnectContext`]. Decoded events fan out on a broadcast bus;
//! liveness is a plain boolean flag.

use serde::{Deserialize, Serialize};

pub mod manager;
pub mod sse;

pub use manager::ConnectionManager;
pub use sse::{SseMessage, SseParser};

#[derive(thiserror::Error, Debug)]
pub enum ClientError {
    #[error("missing required field: {0}")]
    MissingField(&'static str),
    #[error("rate limited by the submission endpoint")]
    RateLimited,
    #[error("submission failed: {0}")]
    Submission(String),
    #[error("http client setup failed: {0}")]
    Http(String),
}

/// Where the backend lives and who is asking.
#[derive(Debug, Clone)]
pub struct ClientConfig {
    pub base_url: String,
    pub user_id: Option<String>,
}

impl ClientConfig {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into().trim_end_matches('/').to_string(),
            user_id: None,
        }
    }

    pub fn with_user_id(mut self, user_id: impl Into<String>) -> Self {
        self.user_id = Some(user_id.into());
        self
    }
}

/// Everything needed to re-open the channel of a still-pending request
/// after a reload, with no hidden captured state.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ReconnectContext {
    pub source_word: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub source_language: Option<String>,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
}

impl ReconnectContext {
    pub fn from_request(request: &wordgen_protocol::WordRequest) -> Self {
        Self {
            source_word: request.source_word.clone(),
            source_language: request.source_language.clone(),
            target_language: request.target_language.clone(),
            request_id: request.request_id.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wordgen_protocol::WordRequest;

    #[test]
    fn config_strips_trailing_slash() {
        let config = ClientConfig::new("http://127.0.0.1:8091/");
        assert_eq!(config.base_url, "http://127.0.0.1:8091");
    }

    #[test]
    fn reconnect_context_roundtrips_through_json() {
        let ctx = ReconnectContext::from_request(
            &WordRequest::new("Haus", "en").with_source_language("de"),
        );
        let raw = serde_json::to_string(&ctx).expect("serialize");
        let back: ReconnectContext = serde_json::from_str(&raw).expect("deserialize");
        assert_eq!(back, ctx);
    }
}

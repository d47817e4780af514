//! Cross-request notification ledger: bounded, deduplicated, persistent.
//!
//! One [`NotificationItem`] per word request, addressed by a deterministic
//! key derived from the normalized request triple. Competing status updates
//! are arbitrated by the explicit override table in [`policy`]; the ledger
//! itself lives in [`store`], persistence behind the [`storage`] trait.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use wordgen_address::{language_code, normalize_word};

pub mod events;
pub mod policy;
pub mod preferences;
pub mod storage;
pub mod store;

pub use events::apply_event;
pub use policy::{decide, UpsertDecision};
pub use storage::{FileStorage, MemoryStorage, Storage, StorageError};
pub use store::{ClickTarget, NotificationStore};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum NotificationStatus {
    Pending,
    Processing,
    Completed,
    Failed,
    Redirect,
}

impl NotificationStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationStatus::Pending => "pending",
            NotificationStatus::Processing => "processing",
            NotificationStatus::Completed => "completed",
            NotificationStatus::Failed => "failed",
            NotificationStatus::Redirect => "redirect",
        }
    }

    pub fn from_slug(value: &str) -> Self {
        match value.trim().to_ascii_lowercase().as_str() {
            "processing" | "active" => NotificationStatus::Processing,
            "completed" | "complete" | "done" => NotificationStatus::Completed,
            "failed" | "error" => NotificationStatus::Failed,
            "redirect" | "exists" => NotificationStatus::Redirect,
            _ => NotificationStatus::Pending,
        }
    }

    /// Live statuses route clicks into the in-flight request view.
    pub fn is_live(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Pending | NotificationStatus::Processing
        )
    }

    /// Candidates with these statuses always override, sticky or not.
    pub fn forces_override(&self) -> bool {
        matches!(
            self,
            NotificationStatus::Redirect | NotificationStatus::Completed
        )
    }
}

/// One user-facing status record for a word request.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NotificationItem {
    pub id: String,
    pub title: String,
    pub message: String,
    pub status: NotificationStatus,
    pub timestamp: DateTime<Utc>,
    #[serde(default)]
    pub seen: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub link: Option<String>,
    #[serde(default)]
    pub progress: u8,
    pub source_word: String,
    pub target_language: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub request_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sk: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub media_ref: Option<String>,
}

impl NotificationItem {
    pub fn new(
        source_word: impl Into<String>,
        source_language: Option<&str>,
        target_language: impl Into<String>,
        status: NotificationStatus,
    ) -> Self {
        let source_word = source_word.into();
        let target_language = target_language.into();
        Self {
            id: notification_key(&source_word, source_language, &target_language),
            title: String::new(),
            message: String::new(),
            status,
            timestamp: Utc::now(),
            seen: false,
            link: None,
            progress: 0,
            source_word,
            target_language,
            request_id: None,
            pk: None,
            sk: None,
            media_ref: None,
        }
    }

    pub fn with_title(mut self, title: impl Into<String>) -> Self {
        self.title = title.into();
        self
    }

    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = message.into();
        self
    }

    pub fn with_request_id(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    pub fn with_progress(mut self, progress: u8) -> Self {
        self.progress = progress.min(100);
        self
    }

    pub fn with_link(mut self, link: impl Into<String>) -> Self {
        self.link = Some(link.into());
        self
    }

    pub fn with_address(mut self, pk: impl Into<String>, sk: impl Into<String>) -> Self {
        self.pk = Some(pk.into());
        self.sk = Some(sk.into());
        self
    }
}

/// Deterministic ledger key: always the normalized
/// `(source_word, source_language, target_language)` triple. A repeated
/// request for the same word reuses the same entry; `request_id` is stored
/// for routing but never participates in identity.
pub fn notification_key(
    source_word: &str,
    source_language: Option<&str>,
    target_language: &str,
) -> String {
    format!(
        "{}#{}#{}",
        normalize_word(source_word),
        language_code(source_language.unwrap_or("auto")),
        language_code(target_language)
    )
}

//! Canonical frame tag constants for the generation channel.
//!
//! The streaming endpoint labels every JSON frame with a `type` string.
//! Keep this list alphabetized and favor snake_case names; the decoder in
//! `event.rs` is the only consumer that should match on these directly.

pub const TAG_CHUNK_UPDATE: &str = "chunk_update";
pub const TAG_CONNECTION_CLOSE: &str = "connection_close";
pub const TAG_PROCESSING_COMPLETED: &str = "processing_completed";
pub const TAG_PROCESSING_FAILED: &str = "processing_failed";
pub const TAG_PROCESSING_STARTED: &str = "processing_started";
pub const TAG_STEP_UPDATE: &str = "step_update";
pub const TAG_SUBSCRIPTION_CONFIRMED: &str = "subscription_confirmed";
pub const TAG_VALIDATION_FAILED: &str = "validation_failed";
pub const TAG_WORD_EXISTS_REDIRECT: &str = "word_exists_redirect";

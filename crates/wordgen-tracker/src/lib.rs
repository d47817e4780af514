//! Render-ready state for exactly one active word-creation request.
//!
//! [`RequestTracker`] folds the unordered stream of channel events into a
//! result record with per-field reveal flags and the fixed ten-stage
//! pipeline graph, ending in exactly one terminal [`Outcome`]. Effects
//! (navigation, terminal detail) are returned as data, never applied
//! through shared state.

pub mod record;
pub mod stage;
pub mod tracker;

pub use record::{ResultField, WordRecord};
pub use stage::{
    complete_all, complete_stage, stage_graph, ProcessingStage, StageCategory, StageId, StageStatus,
};
pub use tracker::{Navigation, Outcome, RequestTracker, TrackerUpdate};

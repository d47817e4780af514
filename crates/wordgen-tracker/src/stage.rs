//! The fixed ten-node stage graph of one pipeline run.
//!
//! Three sequential stages chain strictly by order; completing translation
//! fans out to every still-pending parallel stage; a final quality stage
//! closes the run. Gating invariants: a parallel stage is never active
//! before translation completes, and sequential stage N+1 is never active
//! before stage N completes.

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageId {
    Validation,
    Classification,
    Translation,
    Media,
    Examples,
    Synonyms,
    Syllables,
    Pronunciation,
    Conjugation,
    FinalQuality,
}

impl StageId {
    pub fn as_str(&self) -> &'static str {
        match self {
            StageId::Validation => "validation",
            StageId::Classification => "classification",
            StageId::Translation => "translation",
            StageId::Media => "media",
            StageId::Examples => "examples",
            StageId::Synonyms => "synonyms",
            StageId::Syllables => "syllables",
            StageId::Pronunciation => "pronunciation",
            StageId::Conjugation => "conjugation",
            StageId::FinalQuality => "final_quality",
        }
    }

    pub fn from_slug(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "validation" => Some(StageId::Validation),
            "classification" => Some(StageId::Classification),
            "translation" => Some(StageId::Translation),
            "media" | "image" => Some(StageId::Media),
            "examples" => Some(StageId::Examples),
            "synonyms" => Some(StageId::Synonyms),
            "syllables" => Some(StageId::Syllables),
            "pronunciation" | "audio" => Some(StageId::Pronunciation),
            "conjugation" => Some(StageId::Conjugation),
            "final_quality" | "quality" => Some(StageId::FinalQuality),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StageCategory {
    Sequential,
    Parallel,
    Final,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "snake_case")]
pub enum StageStatus {
    #[default]
    Pending,
    Active,
    Completed,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct ProcessingStage {
    pub id: StageId,
    pub category: StageCategory,
    pub order: u8,
    pub status: StageStatus,
}

/// The ten fixed stages, in order, with validation already active.
pub fn stage_graph() -> Vec<ProcessingStage> {
    let layout: [(StageId, StageCategory); 10] = [
        (StageId::Validation, StageCategory::Sequential),
        (StageId::Classification, StageCategory::Sequential),
        (StageId::Translation, StageCategory::Sequential),
        (StageId::Media, StageCategory::Parallel),
        (StageId::Examples, StageCategory::Parallel),
        (StageId::Synonyms, StageCategory::Parallel),
        (StageId::Syllables, StageCategory::Parallel),
        (StageId::Pronunciation, StageCategory::Parallel),
        (StageId::Conjugation, StageCategory::Parallel),
        (StageId::FinalQuality, StageCategory::Final),
    ];
    layout.iter()
        .enumerate()
        .map(|(idx, (id, category))| ProcessingStage {
            id: *id,
            category: *category,
            order: idx as u8 + 1,
            status: if idx == 0 {
                StageStatus::Active
            } else {
                StageStatus::Pending
            },
        })
        .collect()
}

/// Mark a stage completed and propagate gating. Returns true if anything
/// changed.
pub fn complete_stage(stages: &mut [ProcessingStage], id: StageId) -> bool {
    let Some(idx) = stages.iter().position(|s| s.id == id) else {
        return false;
    };
    if stages[idx].status == StageStatus::Completed {
        return false;
    }
    stages[idx].status = StageStatus::Completed;
    let order = stages[idx].order;
    match stages[idx].category {
        StageCategory::Sequential => {
            // Chain to the next sequential stage; translation additionally
            // releases the whole parallel tier.
            if let Some(next) = stages
                .iter_mut()
                .find(|s| s.category == StageCategory::Sequential && s.order == order + 1)
            {
                if next.status == StageStatus::Pending {
                    next.status = StageStatus::Active;
                }
            }
            if id == StageId::Translation {
                for stage in stages
                    .iter_mut()
                    .filter(|s| s.category == StageCategory::Parallel)
                {
                    if stage.status == StageStatus::Pending {
                        stage.status = StageStatus::Active;
                    }
                }
            }
        }
        StageCategory::Parallel | StageCategory::Final => {}
    }
    true
}

/// Force every stage to completed (terminal success).
pub fn complete_all(stages: &mut [ProcessingStage]) {
    for stage in stages.iter_mut() {
        stage.status = StageStatus::Completed;
    }
}

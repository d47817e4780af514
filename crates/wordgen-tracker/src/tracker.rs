//! Per-request state machine: one tracker per active word-creation
//! request, single-shot, driven entirely by inbound channel events.

use serde_json::Value;

use crate::record::{ResultField, WordRecord};
use crate::stage::{complete_all, complete_stage, stage_graph, ProcessingStage, StageId};
use wordgen_address::{build_address, redirect_address, route_from_address, word_route};
use wordgen_protocol::{InboundEvent, StorageAddress, WordRequest};

/// Capabilities that report explicit quality approval. Pronunciation has
/// no flag of its own; it completes via the parallel task list.
const QUALITY_CAPABILITIES: [StageId; 8] = [
    StageId::Validation,
    StageId::Classification,
    StageId::Translation,
    StageId::Media,
    StageId::Examples,
    StageId::Synonyms,
    StageId::Syllables,
    StageId::Conjugation,
];

/// How the run ended.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Completed {
        address: StorageAddress,
        route: String,
    },
    Redirected {
        address: StorageAddress,
        route: String,
    },
    Invalid {
        issue: Option<String>,
        detected_language: Option<String>,
        suggestions: Vec<String>,
    },
    Failed {
        reason: Option<String>,
    },
}

/// Where the caller should send the user next.
#[derive(Debug, Clone, PartialEq)]
pub struct Navigation {
    pub route: String,
    pub address: Option<StorageAddress>,
    /// Replace the in-progress view instead of pushing onto history, so
    /// back-navigation cannot land on the dead skeleton.
    pub replace: bool,
}

/// What one event did to the tracker, returned as data for the caller to
/// act on. Default (empty) means the event changed nothing.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TrackerUpdate {
    pub revealed: Vec<ResultField>,
    pub stages_changed: bool,
    pub navigation: Option<Navigation>,
    pub outcome: Option<Outcome>,
}

pub struct RequestTracker {
    request: WordRequest,
    request_id: Option<String>,
    pub record: WordRecord,
    pub stages: Vec<ProcessingStage>,
    outcome: Option<Outcome>,
}

impl RequestTracker {
    /// Seed the skeleton: empty record, every field loading, stage graph
    /// with validation active.
    pub fn new(request: WordRequest) -> Self {
        let request_id = request.request_id.clone();
        Self {
            request,
            request_id,
            record: WordRecord::skeleton(),
            stages: stage_graph(),
            outcome: None,
        }
    }

    pub fn request(&self) -> &WordRequest {
        &self.request
    }

    pub fn request_id(&self) -> Option<&str> {
        self.request_id.as_deref()
    }

    pub fn outcome(&self) -> Option<&Outcome> {
        self.outcome.as_ref()
    }

    pub fn is_terminal(&self) -> bool {
        self.outcome.is_some()
    }

    /// Apply one channel event. After a terminal outcome the tracker is
    /// frozen and every further event yields an empty update.
    pub fn apply_event(&mut self, event: &InboundEvent) -> TrackerUpdate {
        if self.outcome.is_some() {
            return TrackerUpdate::default();
        }
        match event {
            InboundEvent::SubscriptionConfirmed { request_id } => {
                if self.request_id.is_none() {
                    self.request_id = request_id.clone();
                }
                TrackerUpdate::default()
            }
            InboundEvent::ProcessingStarted { data, .. }
            | InboundEvent::ChunkUpdate { data, .. }
            | InboundEvent::StepUpdate { data, .. } => {
                let revealed = self.record.apply_fields(data);
                let stages_changed = self.apply_stage_signals(data);
                TrackerUpdate {
                    revealed,
                    stages_changed,
                    ..TrackerUpdate::default()
                }
            }
            InboundEvent::ProcessingCompleted { data, .. } => self.complete(data),
            InboundEvent::WordExistsRedirect { data, .. } => self.redirect(data),
            InboundEvent::ProcessingFailed { reason, .. } => {
                let outcome = Outcome::Failed {
                    reason: reason.clone(),
                };
                self.outcome = Some(outcome.clone());
                TrackerUpdate {
                    outcome: Some(outcome),
                    ..TrackerUpdate::default()
                }
            }
            InboundEvent::ValidationFailed {
                issue,
                detected_language,
                suggestions,
                ..
            } => {
                let outcome = Outcome::Invalid {
                    issue: issue.clone(),
                    detected_language: detected_language.clone(),
                    suggestions: suggestions.clone(),
                };
                self.outcome = Some(outcome.clone());
                TrackerUpdate {
                    outcome: Some(outcome),
                    ..TrackerUpdate::default()
                }
            }
            InboundEvent::ConnectionClose { .. } | InboundEvent::Unknown { .. } => {
                TrackerUpdate::default()
            }
        }
    }

    fn complete(&mut self, data: &Value) -> TrackerUpdate {
        let revealed = self.record.apply_fields(data);
        complete_all(&mut self.stages);
        self.record.clear_all_loading();

        // The canonical address comes from the result itself, not from the
        // raw request input.
        let word = self
            .record
            .word
            .clone()
            .unwrap_or_else(|| self.request.source_word.clone());
        let source_lang = self
            .record
            .source_language
            .clone()
            .or_else(|| self.request.source_language.clone())
            .unwrap_or_else(|| "auto".to_string());
        let pos = self.record.part_of_speech.clone();
        let route = word_route(
            &source_lang,
            &self.request.target_language,
            pos.as_deref(),
            &word,
        );
        let address = match explicit_address(data) {
            Some(addr) => addr,
            None => build_address(
                &word,
                &source_lang,
                &self.request.target_language,
                pos.as_deref(),
            ),
        };
        let outcome = Outcome::Completed {
            address: address.clone(),
            route: route.clone(),
        };
        self.outcome = Some(outcome.clone());
        TrackerUpdate {
            revealed,
            stages_changed: true,
            navigation: Some(Navigation {
                route,
                address: Some(address),
                replace: false,
            }),
            outcome: Some(outcome),
        }
    }

    fn redirect(&mut self, data: &Value) -> TrackerUpdate {
        let address = redirect_address(
            data,
            &self.request.source_word,
            self.request.source_language.as_deref().unwrap_or("auto"),
            &self.request.target_language,
        );
        let route = data
            .get("route")
            .or_else(|| data.get("link"))
            .and_then(|v| v.as_str())
            .map(|s| s.to_string())
            .or_else(|| route_from_address(&address))
            .unwrap_or_else(|| {
                word_route(
                    self.request.source_language.as_deref().unwrap_or("auto"),
                    &self.request.target_language,
                    None,
                    &self.request.source_word,
                )
            });
        let outcome = Outcome::Redirected {
            address: address.clone(),
            route: route.clone(),
        };
        self.outcome = Some(outcome.clone());
        TrackerUpdate {
            navigation: Some(Navigation {
                route,
                address: Some(address),
                replace: true,
            }),
            outcome: Some(outcome),
            ..TrackerUpdate::default()
        }
    }

    fn apply_stage_signals(&mut self, data: &Value) -> bool {
        let mut changed = false;
        for capability in QUALITY_CAPABILITIES {
            if quality_approved(data, capability.as_str())
                && complete_stage(&mut self.stages, capability)
            {
                tracing::debug!(stage = capability.as_str(), "stage quality approved");
                changed = true;
            }
        }
        for name in completed_task_list(data) {
            if let Some(stage) = StageId::from_slug(&name) {
                changed |= complete_stage(&mut self.stages, stage);
            }
        }
        if final_quality_signal(data) {
            changed |= complete_stage(&mut self.stages, StageId::FinalQuality);
        }
        changed
    }
}

fn quality_approved(data: &Value, capability: &str) -> bool {
    let flat = format!("{}_quality_approved", capability);
    if data.get(&flat).and_then(|v| v.as_bool()) == Some(true) {
        return true;
    }
    data.get("quality_approved")
        .and_then(|v| v.get(capability))
        .and_then(|v| v.as_bool())
        == Some(true)
}

fn completed_task_list(data: &Value) -> Vec<String> {
    data.get("completed_parallel_tasks")
        .or_else(|| data.get("completed_tasks"))
        .and_then(|v| v.as_array())
        .map(|arr| {
            arr.iter()
                .filter_map(|v| v.as_str().map(|s| s.to_string()))
                .collect()
        })
        .unwrap_or_default()
}

fn final_quality_signal(data: &Value) -> bool {
    if data.get("final_quality_approved").and_then(|v| v.as_bool()) == Some(true) {
        return true;
    }
    data.get("overall_quality_score")
        .or_else(|| data.get("quality_score"))
        .map(|v| v.is_number())
        .unwrap_or(false)
}

fn explicit_address(data: &Value) -> Option<StorageAddress> {
    let pk = data.get("pk").and_then(|v| v.as_str())?;
    let sk = data.get("sk").and_then(|v| v.as_str())?;
    let mut addr = StorageAddress::new(pk, sk);
    addr.media_ref = data
        .get("media_ref")
        .and_then(|v| v.as_str())
        .map(|s| s.to_string());
    Some(addr)
}

//! Override arbitration for competing status updates.
//!
//! The ledger's ordering guarantee lives here as a plain decision table:
//! `(existing status, incoming status, force flag)` maps to exactly one of
//! insert, merge or reject. A later, stale `processing` frame must never
//! regress a resolved `redirect` entry.

use crate::NotificationStatus;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpsertDecision {
    /// No entry under this key yet; insert the candidate at the head.
    Insert,
    /// Merge candidate fields into the existing entry, preserving `seen`.
    Merge,
    /// Sticky terminal state wins; drop the candidate.
    Reject,
}

pub fn decide(
    existing: Option<NotificationStatus>,
    incoming: NotificationStatus,
    force: bool,
) -> UpsertDecision {
    let existing = match existing {
        None => return UpsertDecision::Insert,
        Some(status) => status,
    };
    let forced = force || incoming.forces_override();
    if existing == NotificationStatus::Redirect
        && incoming != NotificationStatus::Redirect
        && !forced
    {
        return UpsertDecision::Reject;
    }
    UpsertDecision::Merge
}

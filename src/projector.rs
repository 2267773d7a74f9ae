//! Projection of raw status records onto caller-visible state
//!
//! [`project`] is a pure function: no I/O, no hidden state, total over the
//! status domain. The same record always projects to the same state.

use crate::types::{OrchestrationState, StatusRecord, TrackStatus};

/// Fallback reason when the server reports a failure without a message
pub const UNKNOWN_ERROR: &str = "Unknown error";

/// Map one status record onto the orchestration state machine
///
/// | status | metadata.progress | result |
/// |---|---|---|
/// | queued | — | `Polling { progress: None }` |
/// | downloading | absent | `Polling { progress: None }` |
/// | downloading | present (p) | `Polling { progress: Some(p) }` |
/// | completed | — | `Completed` |
/// | failed | `metadata.error` (else fallback) | `Failed { reason }` |
///
/// Progress on a `queued` record is ignored: the server only reports
/// meaningful percentages while a worker is downloading.
pub fn project(record: &StatusRecord) -> OrchestrationState {
    match record.status {
        TrackStatus::Queued => OrchestrationState::Polling { progress: None },
        TrackStatus::Downloading => OrchestrationState::Polling {
            progress: record.progress(),
        },
        TrackStatus::Completed => OrchestrationState::Completed,
        TrackStatus::Failed => OrchestrationState::Failed {
            reason: record
                .error_message()
                .unwrap_or(UNKNOWN_ERROR)
                .to_string(),
        },
    }
}

//! Core types for track-dl

use crate::error::{Error, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Descriptor of one track to download
///
/// Produced externally (the page layer scrapes it), consumed read-only by the
/// orchestration core. The `url` field is the stable key correlating
/// requests, status records, and caller-visible state.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TrackDescriptor {
    /// Track page URL, the stable unique key for this download unit
    pub url: String,

    /// Store-side track identifier
    pub id: String,

    /// Track title
    pub title: String,

    /// Display string of the track's artists
    pub artists: String,
}

impl TrackDescriptor {
    /// Validate the descriptor's URL against the rules the server enforces
    ///
    /// The server only accepts `https` URLs on `www.beatport.com` whose path
    /// starts with `/track/` or `/release/`. Checking client-side lets a bad
    /// descriptor fail fast instead of round-tripping.
    pub fn validate(&self) -> Result<()> {
        let parsed = url::Url::parse(&self.url).map_err(|e| Error::InvalidTrackUrl {
            url: self.url.clone(),
            reason: e.to_string(),
        })?;

        if parsed.scheme() != "https" {
            return Err(Error::InvalidTrackUrl {
                url: self.url.clone(),
                reason: format!("scheme must be 'https', got '{}'", parsed.scheme()),
            });
        }

        if parsed.host_str() != Some("www.beatport.com") {
            return Err(Error::InvalidTrackUrl {
                url: self.url.clone(),
                reason: "host must be 'www.beatport.com'".to_string(),
            });
        }

        let path = parsed.path();
        if !path.starts_with("/track/") && !path.starts_with("/release/") {
            return Err(Error::InvalidTrackUrl {
                url: self.url.clone(),
                reason: "path must start with '/track/' or '/release/'".to_string(),
            });
        }

        Ok(())
    }
}

/// A non-empty ordered batch of tracks submitted together
///
/// Owned transiently by the retry controller for the duration of one
/// submission attempt. Construction rejects an empty collection.
#[derive(Clone, Debug, Serialize)]
pub struct JobRequest {
    /// The tracks in submission order
    pub tracks: Vec<TrackDescriptor>,
}

impl JobRequest {
    /// Create a request from a non-empty collection of descriptors
    ///
    /// Returns [`Error::EmptyRequest`] for an empty collection and the first
    /// descriptor's [`Error::InvalidTrackUrl`] if any URL is malformed.
    pub fn new(tracks: Vec<TrackDescriptor>) -> Result<Self> {
        if tracks.is_empty() {
            return Err(Error::EmptyRequest);
        }
        for track in &tracks {
            track.validate()?;
        }
        Ok(Self { tracks })
    }

    /// Create a single-track request
    pub fn single(track: TrackDescriptor) -> Result<Self> {
        Self::new(vec![track])
    }

    /// The track keys (URLs) covered by this request, in submission order
    pub fn keys(&self) -> impl Iterator<Item = &str> {
        self.tracks.iter().map(|t| t.url.as_str())
    }
}

/// Server-reported status of one track's download job
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TrackStatus {
    /// Accepted by the server, waiting for a worker
    ///
    /// The server reports freshly accepted jobs as "pending" before a worker
    /// picks them up; both spellings mean the same thing here.
    #[serde(alias = "pending")]
    Queued,
    /// A worker is fetching the track
    Downloading,
    /// Finished successfully
    Completed,
    /// Finished with an error
    Failed,
}

impl TrackStatus {
    /// Whether this status ends polling for the track
    pub fn is_terminal(&self) -> bool {
        matches!(self, TrackStatus::Completed | TrackStatus::Failed)
    }
}

/// One entry of the server's status listing
///
/// Fetched fresh on every poll; the core keeps no history beyond the latest
/// record per key.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct StatusRecord {
    /// Join key back to [`TrackDescriptor::url`]
    pub track_url: String,

    /// Current job status
    pub status: TrackStatus,

    /// Free-form server metadata; recognized keys: `progress` (0–100),
    /// `error` (human-readable string)
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub metadata: Option<serde_json::Map<String, serde_json::Value>>,
}

impl StatusRecord {
    /// The reported progress percentage, if present and numeric
    ///
    /// Values are clamped into 0–100; non-numeric values are ignored.
    pub fn progress(&self) -> Option<u8> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("progress"))
            .and_then(serde_json::Value::as_f64)
            .map(|p| p.clamp(0.0, 100.0).round() as u8)
    }

    /// The reported error message, if present
    pub fn error_message(&self) -> Option<&str> {
        self.metadata
            .as_ref()
            .and_then(|m| m.get("error"))
            .and_then(serde_json::Value::as_str)
    }
}

/// Caller-visible state of one track key
///
/// Exactly one state is active per key at any time. Transitions are
/// monotonic except `Failed → Submitting` via an explicit user retry.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state", rename_all = "snake_case")]
pub enum OrchestrationState {
    /// No download has been requested for this key
    Idle,
    /// A submission (possibly retrying) is in flight
    Submitting,
    /// Submission acknowledged; the status poller is running
    Polling {
        /// Last reported progress percentage, if the server supplied one
        progress: Option<u8>,
    },
    /// The server reported the download finished successfully
    Completed,
    /// The download failed; `retry` is available
    Failed {
        /// Why the download failed (server message or a fixed local reason)
        reason: String,
    },
}

impl OrchestrationState {
    /// Human-readable display text for this state
    pub fn label(&self) -> String {
        match self {
            OrchestrationState::Idle => "Idle".to_string(),
            OrchestrationState::Submitting => "Submitting".to_string(),
            OrchestrationState::Polling { progress: None } => "Downloading".to_string(),
            OrchestrationState::Polling {
                progress: Some(percent),
            } => format!("Downloading ({percent}%)"),
            OrchestrationState::Completed => "Completed".to_string(),
            OrchestrationState::Failed { reason } => format!("Failed: {reason}"),
        }
    }

    /// Whether a user-initiated retry is permitted from this state
    pub fn can_retry(&self) -> bool {
        matches!(self, OrchestrationState::Failed { .. })
    }

    /// Whether this state has no pending asynchronous work
    pub fn is_settled(&self) -> bool {
        matches!(
            self,
            OrchestrationState::Idle
                | OrchestrationState::Completed
                | OrchestrationState::Failed { .. }
        )
    }

    /// Short variant name, used in state-precondition error messages
    pub(crate) fn name(&self) -> &'static str {
        match self {
            OrchestrationState::Idle => "Idle",
            OrchestrationState::Submitting => "Submitting",
            OrchestrationState::Polling { .. } => "Polling",
            OrchestrationState::Completed => "Completed",
            OrchestrationState::Failed { .. } => "Failed",
        }
    }
}

/// Submission acknowledgment
///
/// Confirms the job was accepted, not that it finished. The core does not
/// interpret acknowledgment fields beyond existence; the raw server message
/// is kept for logging.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Ack {
    /// Server-supplied acknowledgment message, if any
    #[serde(default)]
    pub message: Option<String>,
}

/// Event emitted on every per-key state transition
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Event {
    /// A track key moved to a new orchestration state
    StateChanged {
        /// The track key whose state changed
        track_url: String,
        /// The state entered
        state: OrchestrationState,
        /// When the transition happened
        changed_at: DateTime<Utc>,
    },
}

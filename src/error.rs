//! Error types for track-dl
//!
//! This module provides the error taxonomy for the library:
//! - Submission-side errors (`SubmitError`): retried locally, never surfaced individually
//! - Polling-side errors (`PollError`): never retried, terminate the status sequence
//! - Out-of-band client errors (`ClientError`) for the health and config surface
//! - Retry exhaustion (`RetryError`) wrapping the last underlying failure
//! - The top-level `Error` used by orchestration entry points

use thiserror::Error;

/// Result type alias for track-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Main error type for track-dl
///
/// This is the primary error type returned by the orchestration entry points.
/// Each variant includes contextual information to help diagnose issues.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "base_url")
        key: Option<String>,
    },

    /// A job request was constructed from an empty track collection
    #[error("job request must contain at least one track")]
    EmptyRequest,

    /// A track descriptor carries a URL the server would reject
    #[error("invalid track URL '{url}': {reason}")]
    InvalidTrackUrl {
        /// The offending URL
        url: String,
        /// Why the URL was rejected
        reason: String,
    },

    /// Cannot perform operation in the track's current state
    #[error("cannot {operation} track {key} in state {current_state}")]
    InvalidState {
        /// The track key (URL) in an invalid state for the operation
        key: String,
        /// The operation that was attempted (e.g., "retry")
        operation: String,
        /// The current state that prevents the operation
        current_state: String,
    },

    /// Shutdown in progress - not accepting new downloads
    #[error("shutdown in progress: not accepting new downloads")]
    ShuttingDown,

    /// Submission failed
    #[error("submission error: {0}")]
    Submit(#[from] SubmitError),

    /// Status polling failed
    #[error("poll error: {0}")]
    Poll(#[from] PollError),

    /// Out-of-band server interaction failed (health probe, config)
    #[error("client error: {0}")]
    Client(#[from] ClientError),

    /// The server reported a failed download for a track
    #[error("remote failure: {reason}")]
    Remote {
        /// The server-supplied failure message (or the generic fallback)
        reason: String,
    },
}

/// Errors from one submission attempt
///
/// Submission is the only operation the library retries; these errors stay
/// inside the retry loop and only the final outcome reaches the caller.
#[derive(Debug, Error)]
pub enum SubmitError {
    /// The transport could not complete the request
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered outside the success range
    #[error("server rejected submission with status {status}")]
    ServerRejected {
        /// HTTP status code of the rejection
        status: u16,
    },
}

/// Errors that terminate a polling sequence
///
/// Poll requests are not retried: the first failure ends the sequence for
/// that track key. Only submission goes through the retry controller.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PollError {
    /// A status fetch failed (transport error or undecodable body)
    #[error("status endpoint unreachable: {0}")]
    Unreachable(String),

    /// The poll window elapsed without a terminal record for the key
    #[error("polling timed out before a terminal status was observed")]
    Timeout,
}

/// Errors from the out-of-band client surface (health probe, server config)
///
/// These are surfaced directly to the caller and never routed through the
/// retry or poll state machines.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The server did not answer the reachability probe
    #[error("server unavailable: {0}")]
    ServerUnavailable(String),

    /// The transport could not complete the request
    #[error("network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The server answered outside the success range
    #[error("server rejected request with status {status}")]
    ServerRejected {
        /// HTTP status code of the rejection
        status: u16,
    },
}

/// Terminal failure of a bounded retry loop
#[derive(Debug, Error)]
pub enum RetryError<E: std::error::Error + 'static> {
    /// All attempts failed; carries the attempt count and the last error
    #[error("operation failed after {attempts} attempts: {last}")]
    MaxRetriesExceeded {
        /// Total number of attempts made (initial attempt + retries)
        attempts: u32,
        /// The error from the final attempt
        #[source]
        last: E,
    },
}

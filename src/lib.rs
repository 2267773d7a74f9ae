//! # track-dl
//!
//! Library for orchestrating batch track downloads against a local download
//! server.
//!
//! ## Design Philosophy
//!
//! track-dl is designed to be:
//! - **Library-first** - No CLI or UI, purely a Rust crate for embedding
//! - **Event-driven** - Consumers subscribe to state changes, one event per transition
//! - **Sensible defaults** - Works out of the box against a server on the conventional port
//! - **Deterministic** - Per-key state machines with a single active poller per key
//!
//! The crate does not download anything itself. It drives a collaborating
//! server through a request/poll protocol: submit a batch of tracks
//! (`POST /download`, retried with a bounded fixed delay), poll the job
//! listing (`GET /status`) until a terminal status appears, and project each
//! record onto the caller-visible state machine
//! `Idle → Submitting → Polling → Completed | Failed`.
//!
//! ## Quick Start
//!
//! ```no_run
//! use track_dl::{Config, TrackDescriptor, TrackOrchestrator};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let orchestrator = TrackOrchestrator::new(Config::default())?;
//!
//!     // Subscribe to state changes
//!     let mut events = orchestrator.subscribe();
//!     tokio::spawn(async move {
//!         while let Ok(event) = events.recv().await {
//!             println!("Event: {:?}", event);
//!         }
//!     });
//!
//!     orchestrator
//!         .start_download(TrackDescriptor {
//!             url: "https://www.beatport.com/track/example/12345".to_string(),
//!             id: "12345".to_string(),
//!             title: "Example Track".to_string(),
//!             artists: "Example Artist".to_string(),
//!         })
//!         .await?;
//!
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::unwrap_used)]
#![warn(clippy::expect_used)]

/// HTTP client for the download server
pub mod client;
/// Configuration types
pub mod config;
/// Error types
pub mod error;
/// Caller-facing orchestration (decomposed into focused submodules)
pub mod orchestrator;
/// Bounded status polling per track key
pub mod poller;
/// Pure projection of status records onto caller-visible state
pub mod projector;
/// Bounded fixed-delay submission retry
pub mod retry;
/// Core types and events
pub mod types;

// Re-export commonly used types
pub use client::{ServerClient, ServerSettings};
pub use config::{Config, PollConfig, ServerEndpointConfig, SubmitRetryConfig};
pub use error::{ClientError, Error, PollError, Result, RetryError, SubmitError};
pub use orchestrator::TrackOrchestrator;
pub use poller::{PollHandle, StatusPoller};
pub use projector::project;
pub use types::{
    Ack, Event, JobRequest, OrchestrationState, StatusRecord, TrackDescriptor, TrackStatus,
};

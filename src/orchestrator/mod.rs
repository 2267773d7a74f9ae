//! Caller-facing orchestration split into focused submodules.
//!
//! The `TrackOrchestrator` struct and its methods are organized by domain:
//! - [`control`] - download lifecycle control (start/retry/state queries)
//!
//! Per track key the orchestrator runs the state machine
//! `Idle → Submitting → Polling → Completed | Failed`, with
//! `Failed → Submitting` reachable only through an explicit user retry.
//! Exactly one polling sequence is active per key at any time; starting a
//! new submission for a key cancels the previous sequence first so two
//! projections can never race on the same key.

mod control;

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
pub(crate) mod test_helpers;
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests;

use crate::client::ServerClient;
use crate::config::Config;
use crate::error::Result;
use crate::types::{Event, OrchestrationState};

/// Buffer size of the event broadcast channel
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// A poller registered for a track key
///
/// The generation counter distinguishes the currently-active sequence from
/// stale ones: a retry replaces the entry with a higher generation, and a
/// finishing consumer only cleans up (or publishes state for) its own
/// generation.
pub(crate) struct ActivePoller {
    pub(crate) generation: u64,
    pub(crate) token: tokio_util::sync::CancellationToken,
}

/// Per-key orchestration state shared across tasks
#[derive(Clone)]
pub(crate) struct KeyState {
    /// Latest caller-visible state per track key
    pub(crate) states: std::sync::Arc<
        tokio::sync::Mutex<std::collections::HashMap<String, OrchestrationState>>,
    >,
    /// Active polling sequence per track key
    pub(crate) active_pollers:
        std::sync::Arc<tokio::sync::Mutex<std::collections::HashMap<String, ActivePoller>>>,
    /// Monotonic generation source for poller registrations
    pub(crate) next_generation: std::sync::Arc<std::sync::atomic::AtomicU64>,
    /// Flag cleared during shutdown so no new downloads start
    pub(crate) accepting_new: std::sync::Arc<std::sync::atomic::AtomicBool>,
}

/// Main orchestrator instance (cloneable - all fields are Arc-wrapped)
///
/// Drives batch track downloads against the local download server: submits
/// with bounded retry, polls job status, projects per-track state, and
/// notifies subscribers once per transition.
#[derive(Clone)]
pub struct TrackOrchestrator {
    /// HTTP client for the download server
    pub(crate) client: ServerClient,
    /// Event broadcast channel sender (multiple subscribers supported)
    pub(crate) event_tx: tokio::sync::broadcast::Sender<Event>,
    /// Configuration (wrapped in Arc for sharing across tasks)
    pub(crate) config: std::sync::Arc<Config>,
    /// Per-key orchestration state
    pub(crate) key_state: KeyState,
}

impl TrackOrchestrator {
    /// Create a new orchestrator from a validated configuration
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use track_dl::{Config, TrackOrchestrator};
    ///
    /// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
    /// let orchestrator = TrackOrchestrator::new(Config::default())?;
    ///
    /// let mut events = orchestrator.subscribe();
    /// tokio::spawn(async move {
    ///     while let Ok(event) = events.recv().await {
    ///         println!("Event: {:?}", event);
    ///     }
    /// });
    /// # Ok(())
    /// # }
    /// ```
    pub fn new(config: Config) -> Result<Self> {
        config.validate()?;

        let client = ServerClient::new(&config)?;
        let (event_tx, _rx) = tokio::sync::broadcast::channel(EVENT_CHANNEL_CAPACITY);

        let key_state = KeyState {
            states: std::sync::Arc::new(tokio::sync::Mutex::new(std::collections::HashMap::new())),
            active_pollers: std::sync::Arc::new(tokio::sync::Mutex::new(
                std::collections::HashMap::new(),
            )),
            next_generation: std::sync::Arc::new(std::sync::atomic::AtomicU64::new(0)),
            accepting_new: std::sync::Arc::new(std::sync::atomic::AtomicBool::new(true)),
        };

        Ok(Self {
            client,
            event_tx,
            config: std::sync::Arc::new(config),
            key_state,
        })
    }

    /// Subscribe to state-change events
    ///
    /// Multiple subscribers are supported; each receives every transition
    /// independently. Exactly one event is emitted per transition; a poll
    /// tick that projects the same state again does not produce an event.
    pub fn subscribe(&self) -> tokio::sync::broadcast::Receiver<Event> {
        self.event_tx.subscribe()
    }

    /// Get the current configuration
    pub fn get_config(&self) -> std::sync::Arc<Config> {
        std::sync::Arc::clone(&self.config)
    }

    /// Probe whether the download server is reachable
    ///
    /// Distinct from the retry/poll machinery: a failure here is surfaced
    /// directly as [`ClientError::ServerUnavailable`](crate::error::ClientError)
    /// and changes no per-key state.
    pub async fn health(&self) -> Result<()> {
        self.client.health().await?;
        Ok(())
    }

    /// Read the server's own configuration (worker-pool size)
    pub async fn server_settings(&self) -> Result<crate::client::ServerSettings> {
        Ok(self.client.server_config().await?)
    }

    /// Update the server's own configuration
    pub async fn update_server_settings(
        &self,
        settings: crate::client::ServerSettings,
    ) -> Result<()> {
        self.client.update_server_config(&settings).await?;
        Ok(())
    }

    /// Stop all active pollers and refuse new downloads
    ///
    /// Per-key states are left in place so a UI can still render the last
    /// known state; `start_download`/`retry_download` return
    /// [`Error::ShuttingDown`](crate::error::Error) afterwards.
    pub async fn shutdown(&self) {
        self.key_state
            .accepting_new
            .store(false, std::sync::atomic::Ordering::SeqCst);

        let mut pollers = self.key_state.active_pollers.lock().await;
        for (key, poller) in pollers.drain() {
            tracing::debug!(track_url = %key, "cancelling poller for shutdown");
            poller.token.cancel();
        }

        tracing::info!("orchestrator shut down");
    }

    /// Record a state transition and notify subscribers
    ///
    /// Inserting the state a key already holds is a no-op: no event is
    /// emitted, keeping the one-notification-per-transition contract.
    pub(crate) async fn transition(&self, key: &str, state: OrchestrationState) {
        let mut states = self.key_state.states.lock().await;
        if states.get(key) == Some(&state) {
            return;
        }
        tracing::info!(track_url = %key, state = %state.label(), "state transition");
        states.insert(key.to_string(), state.clone());
        drop(states);

        self.emit_event(Event::StateChanged {
            track_url: key.to_string(),
            state,
            changed_at: chrono::Utc::now(),
        });
    }

    /// Emit an event to all subscribers
    ///
    /// If there are no active subscribers the event is silently dropped;
    /// orchestration continues even when no one is listening.
    pub(crate) fn emit_event(&self, event: Event) {
        self.event_tx.send(event).ok();
    }
}

//! Download lifecycle control — start, retry, state queries.

use crate::error::{Error, Result, RetryError};
use crate::poller::{PollHandle, StatusPoller};
use crate::projector;
use crate::retry::submit_with_retry;
use crate::types::{JobRequest, OrchestrationState, TrackDescriptor};
use futures::StreamExt;
use std::sync::atomic::Ordering;

use super::{ActivePoller, TrackOrchestrator};

/// Fixed failure text when the status endpoint stops answering
const UNREACHABLE_REASON: &str = "server not responding";

/// Fixed failure text when the poll window closes without a terminal record
const TIMEOUT_REASON: &str = "timed out";

impl TrackOrchestrator {
    /// Start downloading a single track
    ///
    /// Validates the descriptor, cancels any polling sequence still active
    /// for the key, moves the key to `Submitting`, and drives
    /// submit-with-retry → poll → project in a background task. Returns as
    /// soon as the orchestration task is started; progress is observed
    /// through [`subscribe`](TrackOrchestrator::subscribe) and
    /// [`state_of`](TrackOrchestrator::state_of).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// # use track_dl::{TrackOrchestrator, TrackDescriptor};
    /// # async fn example(orchestrator: TrackOrchestrator, track: TrackDescriptor) -> track_dl::Result<()> {
    /// orchestrator.start_download(track).await?;
    /// # Ok(())
    /// # }
    /// ```
    pub async fn start_download(&self, descriptor: TrackDescriptor) -> Result<()> {
        self.start_batch(JobRequest::single(descriptor)?).await
    }

    /// Start downloading a batch of tracks with one submission
    ///
    /// The whole batch goes to the server in a single request; each track
    /// then gets its own polling sequence and its own state machine.
    pub async fn start_batch(&self, request: JobRequest) -> Result<()> {
        if !self.key_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        for key in request.keys() {
            self.cancel_poller(key).await;
            self.transition(key, OrchestrationState::Submitting).await;
        }

        let this = self.clone();
        tokio::spawn(async move { this.drive(request).await });
        Ok(())
    }

    /// Retry a failed download
    ///
    /// Permitted only while the key is in `Failed`; any other state returns
    /// [`Error::InvalidState`]. On success the key resets to `Submitting`
    /// and a fresh submission begins. This is the one and only retry path.
    pub async fn retry_download(&self, descriptor: TrackDescriptor) -> Result<()> {
        if !self.key_state.accepting_new.load(Ordering::SeqCst) {
            return Err(Error::ShuttingDown);
        }

        let current = self.state_of(&descriptor.url).await;
        if !current.can_retry() {
            return Err(Error::InvalidState {
                key: descriptor.url.clone(),
                operation: "retry".to_string(),
                current_state: current.name().to_string(),
            });
        }

        tracing::info!(track_url = %descriptor.url, "user retry requested");
        self.start_batch(JobRequest::single(descriptor)?).await
    }

    /// Current state of a track key (`Idle` for unknown keys)
    pub async fn state_of(&self, key: &str) -> OrchestrationState {
        self.key_state
            .states
            .lock()
            .await
            .get(key)
            .cloned()
            .unwrap_or(OrchestrationState::Idle)
    }

    /// Snapshot of all known keys and their states
    pub async fn states(&self) -> std::collections::HashMap<String, OrchestrationState> {
        self.key_state.states.lock().await.clone()
    }

    /// Drive one submitted batch: submission with retry, then per-key polling
    async fn drive(&self, request: JobRequest) {
        let result = submit_with_retry(&self.config.submit, || {
            let client = self.client.clone();
            let request = request.clone();
            async move { client.submit(&request).await }
        })
        .await;

        match result {
            Err(RetryError::MaxRetriesExceeded { attempts, last }) => {
                tracing::error!(
                    error = %last,
                    attempts = attempts,
                    "batch submission exhausted its retries"
                );
                let reason = format!("submission failed after {attempts} attempts");
                for key in request.keys() {
                    self.transition(
                        key,
                        OrchestrationState::Failed {
                            reason: reason.clone(),
                        },
                    )
                    .await;
                }
            }
            Ok(ack) => {
                tracing::info!(
                    tracks = request.tracks.len(),
                    message = ?ack.message,
                    "batch submission acknowledged"
                );
                let poller = StatusPoller::new(self.client.clone(), self.config.poll.clone());
                for track in &request.tracks {
                    // The poller only starts after the submission succeeded,
                    // so the submission result always precedes the first tick.
                    self.transition(&track.url, OrchestrationState::Polling { progress: None })
                        .await;

                    let handle = poller.poll_until(&track.url);
                    let generation = self.register_poller(&track.url, &handle).await;

                    let this = self.clone();
                    let key = track.url.clone();
                    tokio::spawn(async move {
                        this.consume_poll_sequence(key, generation, handle).await;
                    });
                }
            }
        }
    }

    /// Consume one polling sequence, projecting records into state changes
    ///
    /// Every item is gated on this sequence still being the key's active
    /// generation; a stale sequence (replaced by a retry) stops publishing
    /// immediately even if records were already buffered.
    async fn consume_poll_sequence(&self, key: String, generation: u64, mut handle: PollHandle) {
        while let Some(item) = handle.next().await {
            if !self.is_active_generation(&key, generation).await {
                tracing::debug!(track_url = %key, "stale polling sequence, discarding record");
                break;
            }

            match item {
                Ok(record) => {
                    let state = projector::project(&record);
                    let terminal = state.is_settled();
                    self.transition(&key, state).await;
                    if terminal {
                        break;
                    }
                }
                Err(e) => {
                    let reason = match e {
                        crate::error::PollError::Unreachable(ref detail) => {
                            tracing::warn!(track_url = %key, detail = %detail, "status endpoint unreachable");
                            UNREACHABLE_REASON
                        }
                        crate::error::PollError::Timeout => TIMEOUT_REASON,
                    };
                    self.transition(
                        &key,
                        OrchestrationState::Failed {
                            reason: reason.to_string(),
                        },
                    )
                    .await;
                    break;
                }
            }
        }

        handle.stop();
        self.clear_poller(&key, generation).await;
    }

    /// Register a polling sequence as the key's active one
    async fn register_poller(&self, key: &str, handle: &PollHandle) -> u64 {
        let generation = self
            .key_state
            .next_generation
            .fetch_add(1, Ordering::SeqCst);

        let mut pollers = self.key_state.active_pollers.lock().await;
        if let Some(previous) = pollers.insert(
            key.to_string(),
            ActivePoller {
                generation,
                token: handle.token(),
            },
        ) {
            // A poller this key already had must not keep running
            previous.token.cancel();
        }

        // A shutdown that drained the map before this registration must not
        // leave this sequence running; the check happens under the same lock
        // the drain takes.
        if !self.key_state.accepting_new.load(Ordering::SeqCst) {
            if let Some(poller) = pollers.remove(key) {
                poller.token.cancel();
            }
        }
        generation
    }

    /// Cancel the active polling sequence for a key, if any
    pub(crate) async fn cancel_poller(&self, key: &str) {
        let mut pollers = self.key_state.active_pollers.lock().await;
        if let Some(poller) = pollers.remove(key) {
            tracing::debug!(track_url = %key, "cancelling active poller");
            poller.token.cancel();
        }
    }

    /// Drop this sequence's registration unless a newer one replaced it
    async fn clear_poller(&self, key: &str, generation: u64) {
        let mut pollers = self.key_state.active_pollers.lock().await;
        if pollers
            .get(key)
            .is_some_and(|p| p.generation == generation)
        {
            pollers.remove(key);
        }
    }

    /// Whether `generation` is still the active sequence for `key`
    async fn is_active_generation(&self, key: &str, generation: u64) -> bool {
        self.key_state
            .active_pollers
            .lock()
            .await
            .get(key)
            .is_some_and(|p| p.generation == generation)
    }

    /// Number of polling sequences currently registered (test introspection)
    #[cfg(test)]
    pub(crate) async fn active_poller_count(&self) -> usize {
        self.key_state.active_pollers.lock().await.len()
    }
}

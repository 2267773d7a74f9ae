//! Bounded status polling for a single track key
//!
//! A [`StatusPoller`] turns the server's pull-only `/status` listing into a
//! finite, lazy sequence of [`StatusRecord`]s for one key. The sequence is
//! not restartable: it ends on the first terminal record, on timeout, on the
//! first failed poll request, or when the caller stops it.
//!
//! Poll requests are never retried. Submission is the only retried
//! operation; a poll failure means the sequence terminates immediately with
//! [`PollError::Unreachable`].

use crate::client::ServerClient;
use crate::config::PollConfig;
use crate::error::PollError;
use crate::types::StatusRecord;
use std::pin::Pin;
use std::task::{Context, Poll};
use tokio::sync::mpsc;
use tokio_stream::wrappers::ReceiverStream;
use tokio_util::sync::CancellationToken;

/// Capacity of the channel buffering records between poll task and consumer
const SEQUENCE_BUFFER: usize = 16;

/// Factory for per-key polling sequences
#[derive(Clone)]
pub struct StatusPoller {
    client: ServerClient,
    config: PollConfig,
}

/// A running polling sequence plus its stop handle
///
/// Implements [`futures::Stream`] yielding `Result<StatusRecord, PollError>`.
/// An `Err` item is always the final item. Dropping the handle or calling
/// [`stop`](PollHandle::stop) ends the sequence without a further item.
pub struct PollHandle {
    stream: ReceiverStream<Result<StatusRecord, PollError>>,
    token: CancellationToken,
}

impl PollHandle {
    /// Stop the sequence
    ///
    /// The background poll task exits at its next suspension point and no
    /// further items are yielded. Stopping an already-finished sequence is a
    /// no-op.
    pub fn stop(&self) {
        self.token.cancel();
    }

    /// A clone of the cancellation token driving this sequence
    ///
    /// Lets a coordinator stop the sequence without holding the stream half.
    pub fn token(&self) -> CancellationToken {
        self.token.clone()
    }
}

impl futures::Stream for PollHandle {
    type Item = Result<StatusRecord, PollError>;

    fn poll_next(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Option<Self::Item>> {
        Pin::new(&mut self.stream).poll_next(cx)
    }
}

impl StatusPoller {
    /// Create a poller issuing status fetches through `client`
    pub fn new(client: ServerClient, config: PollConfig) -> Self {
        Self { client, config }
    }

    /// Start polling for `key`
    ///
    /// Each tick issues one `/status` fetch covering all active jobs and
    /// filters by `key`. A record absent for the key is not an error (the
    /// server may not have registered the job yet), so the sequence keeps
    /// ticking until the window closes. Termination:
    ///
    /// - a terminal record for `key` is yielded, then the sequence ends
    /// - the configured timeout elapses → final `Err(PollError::Timeout)`
    /// - a poll request fails → final `Err(PollError::Unreachable)`
    /// - [`PollHandle::stop`] is called → the sequence just ends
    pub fn poll_until(&self, key: &str) -> PollHandle {
        let (tx, rx) = mpsc::channel(SEQUENCE_BUFFER);
        let token = CancellationToken::new();

        let client = self.client.clone();
        let key = key.to_string();
        let interval = self.config.interval;
        let timeout = self.config.timeout;
        let task_token = token.clone();

        tokio::spawn(async move {
            let deadline = tokio::time::Instant::now() + timeout;
            let mut ticker = tokio::time::interval(interval);
            ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    _ = task_token.cancelled() => {
                        tracing::debug!(track_url = %key, "polling stopped");
                        return;
                    }
                    _ = tokio::time::sleep_until(deadline) => {
                        tracing::warn!(track_url = %key, "polling timed out");
                        tx.send(Err(PollError::Timeout)).await.ok();
                        return;
                    }
                    _ = ticker.tick() => {
                        let fetched = client.fetch_status().await;
                        // a stop that landed during the fetch wins
                        if task_token.is_cancelled() {
                            tracing::debug!(track_url = %key, "polling stopped");
                            return;
                        }
                        match fetched {
                            Err(e) => {
                                tracing::warn!(track_url = %key, error = %e, "poll request failed");
                                tx.send(Err(e)).await.ok();
                                return;
                            }
                            Ok(records) => {
                                let record = records.into_iter().find(|r| r.track_url == key);
                                let Some(record) = record else {
                                    tracing::debug!(track_url = %key, "no status record yet");
                                    continue;
                                };

                                let terminal = record.status.is_terminal();
                                if tx.send(Ok(record)).await.is_err() {
                                    // consumer dropped the stream
                                    return;
                                }
                                if terminal {
                                    return;
                                }
                            }
                        }
                    }
                }
            }
        });

        PollHandle {
            stream: ReceiverStream::new(rx),
            token,
        }
    }
}

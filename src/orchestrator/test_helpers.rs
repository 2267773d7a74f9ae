//! Shared test helpers for creating TrackOrchestrator instances in tests.

use crate::config::Config;
use crate::orchestrator::TrackOrchestrator;
use crate::types::{Event, OrchestrationState, TrackDescriptor};
use std::time::Duration;
use tokio::sync::broadcast;

/// Track URL used by most orchestrator tests
pub(crate) const TRACK_URL: &str = "https://www.beatport.com/track/example/12345";

/// Create a test orchestrator pointed at `server_uri` with fast timings.
///
/// Retry delay and poll interval are shrunk so scenario tests finish in
/// milliseconds; the poll timeout stays generous unless a test overrides it.
pub(crate) fn create_test_orchestrator(server_uri: &str) -> TrackOrchestrator {
    create_test_orchestrator_with(server_uri, |_| {})
}

/// Like [`create_test_orchestrator`] but lets the test tweak the config
pub(crate) fn create_test_orchestrator_with<F>(server_uri: &str, tweak: F) -> TrackOrchestrator
where
    F: FnOnce(&mut Config),
{
    let mut config = Config::default();
    config.server.base_url = server_uri.to_string();
    config.submit.max_retries = 2;
    config.submit.retry_delay = Duration::from_millis(10);
    config.poll.interval = Duration::from_millis(20);
    config.poll.timeout = Duration::from_millis(2000);
    tweak(&mut config);

    TrackOrchestrator::new(config).unwrap()
}

/// A descriptor for [`TRACK_URL`]
pub(crate) fn sample_track() -> TrackDescriptor {
    TrackDescriptor {
        url: TRACK_URL.to_string(),
        id: "12345".to_string(),
        title: "Example Track".to_string(),
        artists: "Example Artist".to_string(),
    }
}

/// A descriptor for a second, distinct track key
pub(crate) fn other_track() -> TrackDescriptor {
    TrackDescriptor {
        url: "https://www.beatport.com/track/other/67890".to_string(),
        id: "67890".to_string(),
        title: "Other Track".to_string(),
        artists: "Other Artist".to_string(),
    }
}

/// Wait until an event for `key` matching `pred` arrives, returning its state.
///
/// Panics if the window closes first; subscribe before triggering the
/// operation so no transition is missed.
pub(crate) async fn wait_for_state<F>(
    events: &mut broadcast::Receiver<Event>,
    key: &str,
    pred: F,
) -> OrchestrationState
where
    F: Fn(&OrchestrationState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        loop {
            match events.recv().await {
                Ok(Event::StateChanged {
                    track_url, state, ..
                }) if track_url == key && pred(&state) => return state,
                Ok(_) => continue,
                Err(e) => panic!("event channel closed while waiting: {e}"),
            }
        }
    })
    .await
    .expect("timed out waiting for expected state transition")
}

/// Collect every state transition for `key` until `until` matches one.
pub(crate) async fn collect_states_until<F>(
    events: &mut broadcast::Receiver<Event>,
    key: &str,
    until: F,
) -> Vec<OrchestrationState>
where
    F: Fn(&OrchestrationState) -> bool,
{
    tokio::time::timeout(Duration::from_secs(5), async {
        let mut seen = Vec::new();
        loop {
            match events.recv().await {
                Ok(Event::StateChanged {
                    track_url, state, ..
                }) if track_url == key => {
                    let done = until(&state);
                    seen.push(state);
                    if done {
                        return seen;
                    }
                }
                Ok(_) => continue,
                Err(e) => panic!("event channel closed while collecting: {e}"),
            }
        }
    })
    .await
    .expect("timed out collecting state transitions")
}

//! Configuration types for track-dl

use crate::error::Error;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Local download server endpoint settings
///
/// Groups settings describing how to reach the collaborating server.
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ServerEndpointConfig {
    /// Base URL of the download server (default: "http://127.0.0.1:8080")
    ///
    /// A single configured base URL; the scheme is whatever the operator
    /// configures, the library never switches protocols on its own.
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Per-request timeout for all HTTP calls (default: 10 seconds)
    #[serde(default = "default_request_timeout", with = "duration_ms_serde")]
    pub request_timeout: Duration,
}

impl Default for ServerEndpointConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            request_timeout: default_request_timeout(),
        }
    }
}

/// Submission retry settings
///
/// The retry delay is fixed between attempts — there is no backoff
/// multiplier and no jitter. Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SubmitRetryConfig {
    /// Number of retries after the initial submission attempt (default: 2)
    ///
    /// A value of 2 means at most 3 submission calls in total.
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Fixed delay between submission attempts (default: 1000 ms)
    #[serde(default = "default_retry_delay", with = "duration_ms_serde")]
    pub retry_delay: Duration,
}

impl Default for SubmitRetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            retry_delay: default_retry_delay(),
        }
    }
}

/// Status polling settings
///
/// Used as a nested sub-config within [`Config`].
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PollConfig {
    /// Delay between consecutive status fetches (default: 2000 ms)
    #[serde(
        rename = "poll_interval_ms",
        default = "default_poll_interval",
        with = "duration_ms_serde"
    )]
    pub interval: Duration,

    /// Overall window after which polling for a key gives up (default: 120 000 ms)
    #[serde(
        rename = "poll_timeout_ms",
        default = "default_poll_timeout",
        with = "duration_ms_serde"
    )]
    pub timeout: Duration,
}

impl Default for PollConfig {
    fn default() -> Self {
        Self {
            interval: default_poll_interval(),
            timeout: default_poll_timeout(),
        }
    }
}

/// Main configuration for [`TrackOrchestrator`](crate::TrackOrchestrator)
///
/// Fields are organized into logical sub-configs:
/// - [`server`](ServerEndpointConfig): base URL and request timeout
/// - [`submit`](SubmitRetryConfig): bounded fixed-delay submission retry
/// - [`poll`](PollConfig): status poll cadence and window
///
/// All sub-config fields are flattened so the JSON/TOML format stays flat.
/// Every field has a default; `Config::default()` works against a server on
/// the conventional local port.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Server endpoint settings
    #[serde(flatten)]
    pub server: ServerEndpointConfig,

    /// Submission retry settings
    #[serde(flatten)]
    pub submit: SubmitRetryConfig,

    /// Status polling settings
    #[serde(flatten)]
    pub poll: PollConfig,
}

impl Config {
    /// Validate the configuration
    ///
    /// Checks that the base URL parses, the poll interval is non-zero, and
    /// the poll timeout is at least one interval long. Returns
    /// [`Error::Config`] naming the offending key.
    pub fn validate(&self) -> crate::error::Result<()> {
        url::Url::parse(&self.server.base_url).map_err(|e| Error::Config {
            message: format!("invalid base URL '{}': {}", self.server.base_url, e),
            key: Some("base_url".to_string()),
        })?;

        if self.poll.interval.is_zero() {
            return Err(Error::Config {
                message: "poll interval must be greater than zero".to_string(),
                key: Some("poll_interval_ms".to_string()),
            });
        }

        if self.poll.timeout < self.poll.interval {
            return Err(Error::Config {
                message: format!(
                    "poll timeout ({:?}) must be at least one poll interval ({:?})",
                    self.poll.timeout, self.poll.interval
                ),
                key: Some("poll_timeout_ms".to_string()),
            });
        }

        Ok(())
    }

    /// Base URL with any trailing slash removed, for joining endpoint paths
    pub(crate) fn base(&self) -> &str {
        self.server.base_url.trim_end_matches('/')
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_request_timeout() -> Duration {
    Duration::from_secs(10)
}

fn default_max_retries() -> u32 {
    2
}

fn default_retry_delay() -> Duration {
    Duration::from_millis(1000)
}

fn default_poll_interval() -> Duration {
    Duration::from_millis(2000)
}

fn default_poll_timeout() -> Duration {
    Duration::from_millis(120_000)
}

// Duration (de)serialization as integer milliseconds
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_passes_validation() {
        let config = Config::default();
        config.validate().unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.submit.max_retries, 2);
        assert_eq!(config.submit.retry_delay, Duration::from_millis(1000));
        assert_eq!(config.poll.interval, Duration::from_millis(2000));
        assert_eq!(config.poll.timeout, Duration::from_millis(120_000));
    }

    #[test]
    fn empty_json_deserializes_to_defaults() {
        let config: Config = serde_json::from_str("{}").unwrap();
        assert_eq!(config.server.base_url, "http://127.0.0.1:8080");
        assert_eq!(config.poll.timeout, Duration::from_millis(120_000));
    }

    #[test]
    fn durations_round_trip_as_milliseconds() {
        let mut config = Config::default();
        config.submit.retry_delay = Duration::from_millis(250);
        config.poll.interval = Duration::from_millis(500);
        config.poll.timeout = Duration::from_millis(5000);

        let json = serde_json::to_string(&config).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(parsed["retry_delay"], 250);
        assert_eq!(parsed["poll_interval_ms"], 500);
        assert_eq!(parsed["poll_timeout_ms"], 5000);

        let back: Config = serde_json::from_str(&json).unwrap();
        assert_eq!(back.submit.retry_delay, Duration::from_millis(250));
        assert_eq!(back.poll.interval, Duration::from_millis(500));
        assert_eq!(back.poll.timeout, Duration::from_millis(5000));
    }

    #[test]
    fn invalid_base_url_fails_validation_with_key() {
        let mut config = Config::default();
        config.server.base_url = "not a url".to_string();

        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("base_url")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn zero_poll_interval_fails_validation() {
        let mut config = Config::default();
        config.poll.interval = Duration::ZERO;

        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("poll_interval_ms")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn poll_timeout_shorter_than_interval_fails_validation() {
        let mut config = Config::default();
        config.poll.interval = Duration::from_millis(2000);
        config.poll.timeout = Duration::from_millis(500);

        let err = config.validate().unwrap_err();
        match err {
            Error::Config { key, .. } => assert_eq!(key.as_deref(), Some("poll_timeout_ms")),
            other => panic!("expected Config error, got {other:?}"),
        }
    }

    #[test]
    fn base_strips_trailing_slash() {
        let mut config = Config::default();
        config.server.base_url = "http://localhost:8080/".to_string();
        assert_eq!(config.base(), "http://localhost:8080");
    }
}

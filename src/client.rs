//! HTTP client for the local download server
//!
//! Wraps the four collaborator endpoints behind typed methods:
//! `POST /download` (submission), `GET /status` (polling), `GET /health`
//! with a `GET /` fallback (reachability), and `GET|PUT /config` (the
//! server's worker-pool setting). One [`reqwest::Client`] is shared across
//! all calls; it is stateless per call.

use crate::config::Config;
use crate::error::{ClientError, PollError, Result, SubmitError};
use crate::types::{Ack, JobRequest, StatusRecord};
use serde::{Deserialize, Serialize};

/// The download server's own configuration, as exposed on `/config`
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerSettings {
    /// Maximum number of downloads the server runs concurrently
    pub max_concurrent_downloads: u32,
}

/// Typed client for the download server's HTTP API
#[derive(Clone)]
pub struct ServerClient {
    http: reqwest::Client,
    base_url: String,
}

impl ServerClient {
    /// Build a client from the configured endpoint
    ///
    /// The per-request timeout applies to every call made through this
    /// client, including each individual poll tick.
    pub fn new(config: &Config) -> Result<Self> {
        let http = reqwest::Client::builder()
            .timeout(config.server.request_timeout)
            .build()
            .map_err(ClientError::Network)?;

        Ok(Self {
            http,
            base_url: config.base().to_string(),
        })
    }

    /// Submit a batch of tracks for download
    ///
    /// Sends the full descriptor collection as one request and returns as
    /// soon as the server acknowledges it; the download itself is observed
    /// through [`fetch_status`](Self::fetch_status). Safe to retry: the
    /// server is expected to deduplicate resubmissions by track identity
    /// (an assumption about the collaborator, not something this client can
    /// enforce).
    pub async fn submit(&self, request: &JobRequest) -> std::result::Result<Ack, SubmitError> {
        let url = format!("{}/download", self.base_url);
        tracing::debug!(url = %url, tracks = request.tracks.len(), "submitting download request");

        let response = self.http.post(&url).json(request).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(SubmitError::ServerRejected {
                status: status.as_u16(),
            });
        }

        // 2xx is the acknowledgment; the body is informational only
        let ack: Ack = response.json().await.unwrap_or_default();
        tracing::debug!(message = ?ack.message, "submission acknowledged");
        Ok(ack)
    }

    /// Fetch the server's status listing for all active jobs
    ///
    /// The caller filters by track key. Any transport failure, non-success
    /// status, or undecodable body ends the caller's polling sequence with
    /// [`PollError::Unreachable`]; poll requests are never retried.
    pub async fn fetch_status(&self) -> std::result::Result<Vec<StatusRecord>, PollError> {
        let url = format!("{}/status", self.base_url);

        let response = self
            .http
            .get(&url)
            .send()
            .await
            .map_err(|e| PollError::Unreachable(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(PollError::Unreachable(format!(
                "status endpoint returned {status}"
            )));
        }

        response
            .json::<Vec<StatusRecord>>()
            .await
            .map_err(|e| PollError::Unreachable(format!("undecodable status body: {e}")))
    }

    /// Probe whether the server is reachable
    ///
    /// Tries `GET /health`, falling back to `GET /` for servers that don't
    /// expose a dedicated probe. A failure here is the distinct
    /// "server unavailable" condition: it is surfaced directly and never
    /// routed through the retry or poll state machines.
    pub async fn health(&self) -> std::result::Result<(), ClientError> {
        let probe_urls = [
            format!("{}/health", self.base_url),
            format!("{}/", self.base_url),
        ];

        let mut last_failure = String::new();
        for url in &probe_urls {
            match self.http.get(url).send().await {
                Ok(response) if response.status().is_success() => {
                    tracing::debug!(url = %url, "server reachable");
                    return Ok(());
                }
                Ok(response) => {
                    last_failure = format!("{} returned {}", url, response.status());
                }
                Err(e) => {
                    last_failure = e.to_string();
                }
            }
        }

        Err(ClientError::ServerUnavailable(last_failure))
    }

    /// Read the server's current configuration
    pub async fn server_config(&self) -> std::result::Result<ServerSettings, ClientError> {
        let url = format!("{}/config", self.base_url);
        let response = self.http.get(&url).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ServerRejected {
                status: status.as_u16(),
            });
        }

        Ok(response.json().await?)
    }

    /// Update the server's configuration
    ///
    /// The server validates the new settings itself (e.g. it rejects a
    /// non-positive worker count); a validation failure comes back as
    /// [`ClientError::ServerRejected`].
    pub async fn update_server_config(
        &self,
        settings: &ServerSettings,
    ) -> std::result::Result<(), ClientError> {
        let url = format!("{}/config", self.base_url);
        tracing::debug!(
            max_concurrent_downloads = settings.max_concurrent_downloads,
            "updating server configuration"
        );

        let response = self.http.put(&url).json(settings).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::ServerRejected {
                status: status.as_u16(),
            });
        }

        Ok(())
    }
}

// unwrap/expect are acceptable in tests for concise failure-on-error assertions
#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::TrackDescriptor;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn config_for(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.server.base_url = server.uri();
        config
    }

    fn sample_request() -> JobRequest {
        JobRequest::single(TrackDescriptor {
            url: "https://www.beatport.com/track/example/12345".to_string(),
            id: "12345".to_string(),
            title: "Example Track".to_string(),
            artists: "Example Artist".to_string(),
        })
        .unwrap()
    }

    // --- submit ---

    #[tokio::test]
    async fn submit_returns_ack_on_2xx() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(
                ResponseTemplate::new(202)
                    .set_body_json(serde_json::json!({"message": "Download(s) initiated"})),
            )
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let ack = client.submit(&sample_request()).await.unwrap();

        assert_eq!(ack.message.as_deref(), Some("Download(s) initiated"));
    }

    #[tokio::test]
    async fn submit_sends_tracks_as_json_body() {
        let server = MockServer::start().await;
        let request = sample_request();
        Mock::given(method("POST"))
            .and(path("/download"))
            .and(body_json(serde_json::json!({
                "tracks": [{
                    "url": "https://www.beatport.com/track/example/12345",
                    "id": "12345",
                    "title": "Example Track",
                    "artists": "Example Artist",
                }]
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        client.submit(&request).await.unwrap();
    }

    #[tokio::test]
    async fn submit_tolerates_non_json_ack_body() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(200).set_body_string("accepted"))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let ack = client.submit(&sample_request()).await.unwrap();

        assert!(ack.message.is_none(), "2xx without JSON is still an ack");
    }

    #[tokio::test]
    async fn submit_maps_non_2xx_to_server_rejected() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/download"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let err = client.submit(&sample_request()).await.unwrap_err();

        assert!(matches!(
            err,
            SubmitError::ServerRejected { status: 500 }
        ));
    }

    #[tokio::test]
    async fn submit_maps_transport_failure_to_network() {
        let server = MockServer::start().await;
        let config = config_for(&server);
        drop(server); // free the port so the connection is refused

        let client = ServerClient::new(&config).unwrap();
        let err = client.submit(&sample_request()).await.unwrap_err();

        assert!(matches!(err, SubmitError::Network(_)));
    }

    // --- fetch_status ---

    #[tokio::test]
    async fn fetch_status_decodes_record_array() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!([
                {
                    "track_url": "https://www.beatport.com/track/a/1",
                    "status": "downloading",
                    "metadata": {"progress": 40}
                },
                {
                    "track_url": "https://www.beatport.com/track/b/2",
                    "status": "completed"
                }
            ])))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let records = client.fetch_status().await.unwrap();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].progress(), Some(40));
        assert!(records[1].status.is_terminal());
    }

    #[tokio::test]
    async fn fetch_status_maps_non_2xx_to_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_status().await.unwrap_err();

        assert!(matches!(err, PollError::Unreachable(_)));
    }

    #[tokio::test]
    async fn fetch_status_maps_undecodable_body_to_unreachable() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/status"))
            .respond_with(ResponseTemplate::new(200).set_body_string("not json"))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let err = client.fetch_status().await.unwrap_err();

        assert!(matches!(err, PollError::Unreachable(_)));
    }

    // --- health ---

    #[tokio::test]
    async fn health_succeeds_on_health_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        client.health().await.unwrap();
    }

    #[tokio::test]
    async fn health_falls_back_to_root_probe() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/health"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/"))
            .respond_with(ResponseTemplate::new(200))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        client.health().await.unwrap();
    }

    #[tokio::test]
    async fn health_reports_server_unavailable_when_both_probes_fail() {
        let server = MockServer::start().await;
        let config = config_for(&server);
        drop(server);

        let client = ServerClient::new(&config).unwrap();
        let err = client.health().await.unwrap_err();

        assert!(matches!(err, ClientError::ServerUnavailable(_)));
    }

    // --- server config ---

    #[tokio::test]
    async fn server_config_round_trips() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/config"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"max_concurrent_downloads": 5})),
            )
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path("/config"))
            .and(body_json(serde_json::json!({"max_concurrent_downloads": 8})))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(serde_json::json!({"status": "config updated"})),
            )
            .expect(1)
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();

        let settings = client.server_config().await.unwrap();
        assert_eq!(settings.max_concurrent_downloads, 5);

        client
            .update_server_config(&ServerSettings {
                max_concurrent_downloads: 8,
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn update_server_config_surfaces_validation_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .and(path("/config"))
            .respond_with(ResponseTemplate::new(400))
            .mount(&server)
            .await;

        let client = ServerClient::new(&config_for(&server)).unwrap();
        let err = client
            .update_server_config(&ServerSettings {
                max_concurrent_downloads: 0,
            })
            .await
            .unwrap_err();

        assert!(matches!(err, ClientError::ServerRejected { status: 400 }));
    }
}

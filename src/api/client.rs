use crate::api::{ensure_dir, log_file_name, ApiFuture, ClusterApi};
use crate::config::ClusterConfig;
use crate::error::{ApiError, DownloadError};
use crate::topology::{ComponentDetails, TopologyDetails, TopologySummary};
use log::debug;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::io::AsyncWriteExt;

/// Storm UI REST client
///
/// Talks to `{cluster}/stormui/api/v1` with HTTP basic authentication and
/// streams log files straight to disk.
pub struct StormUiClient {
    client: Client,
    cluster_url: String,
    username: String,
    password: String,
}

impl StormUiClient {
    /// Create a new client for the given cluster
    ///
    /// Only the connect phase is bounded by `connect_timeout`, log bodies can
    /// take as long as they need.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use storm_logs::api::StormUiClient;
    /// use storm_logs::config::ClusterConfig;
    ///
    /// let cluster = ClusterConfig::new("https://storm.example.net", "admin", "secret").unwrap();
    /// let client = StormUiClient::new(&cluster, Duration::from_secs(30)).unwrap();
    /// ```
    pub fn new(cluster: &ClusterConfig, connect_timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder().connect_timeout(connect_timeout).build()?;

        Ok(Self {
            client,
            cluster_url: cluster.url.clone(),
            username: cluster.username.clone(),
            password: cluster.password.clone(),
        })
    }

    /// Format a Storm UI API endpoint URL
    fn api_url(&self, path: &str) -> String {
        format!("{}/stormui/api/v1/{}", self.cluster_url, path)
    }

    fn get(&self, url: &str) -> RequestBuilder {
        self.client
            .get(url)
            .basic_auth(&self.username, Some(&self.password))
    }

    async fn get_json<T: DeserializeOwned>(&self, url: String) -> Result<T, ApiError> {
        debug!("GET {}", url);
        let response = self.get(&url).send().await?;

        let status = response.status();
        if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
            return Err(ApiError::Authentication {
                url,
                status: status.as_u16(),
            });
        }
        if !status.is_success() {
            return Err(ApiError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let body = response.text().await?;
        debug!("Response from {}: {}", url, body);
        serde_json::from_str(&body).map_err(|e| ApiError::InvalidResponse {
            url,
            reason: e.to_string(),
        })
    }

    async fn save(&self, url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        let file_name = log_file_name(url)?;
        let transport = |source| DownloadError::Transport {
            url: url.to_string(),
            source,
        };

        let mut response = self.get(url).send().await.map_err(transport)?;
        if !response.status().is_success() {
            return Err(DownloadError::Status {
                url: url.to_string(),
                status: response.status().as_u16(),
            });
        }

        ensure_dir(dir).await?;
        let path = dir.join(file_name);
        let io = |source| DownloadError::Io {
            path: path.clone(),
            source,
        };

        let mut file = tokio::fs::File::create(&path).await.map_err(io)?;
        let written: Result<u64, DownloadError> = async {
            let mut total = 0u64;
            while let Some(chunk) = response.chunk().await.map_err(transport)? {
                file.write_all(&chunk).await.map_err(io)?;
                total += chunk.len() as u64;
            }
            file.flush().await.map_err(io)?;
            Ok(total)
        }
        .await;

        match written {
            Ok(total) => {
                debug!("Wrote {} bytes to {}", total, path.display());
                tokio::fs::canonicalize(&path).await.map_err(io)
            }
            Err(e) => {
                drop(file);
                // A truncated log is worse than none
                let _ = tokio::fs::remove_file(&path).await;
                Err(e)
            }
        }
    }
}

impl ClusterApi for StormUiClient {
    fn cluster_url(&self) -> &str {
        &self.cluster_url
    }

    fn topology_summary(&self) -> ApiFuture<'_, Result<TopologySummary, ApiError>> {
        Box::pin(self.get_json(self.api_url("topology/summary")))
    }

    fn topology<'a>(
        &'a self,
        topology_id: &'a str,
    ) -> ApiFuture<'a, Result<TopologyDetails, ApiError>> {
        Box::pin(self.get_json(self.api_url(&format!("topology/{}", topology_id))))
    }

    fn component<'a>(
        &'a self,
        topology_id: &'a str,
        component_id: &'a str,
    ) -> ApiFuture<'a, Result<ComponentDetails, ApiError>> {
        Box::pin(self.get_json(self.api_url(&format!(
            "topology/{}/component/{}",
            topology_id, component_id
        ))))
    }

    fn fetch_and_save<'a>(
        &'a self,
        url: &'a str,
        dir: &'a Path,
    ) -> ApiFuture<'a, Result<PathBuf, DownloadError>> {
        Box::pin(self.save(url, dir))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use wiremock::matchers::{basic_auth, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer) -> StormUiClient {
        let cluster = ClusterConfig::new(&server.uri(), "admin", "secret").unwrap();
        StormUiClient::new(&cluster, Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_api_url_formatting() {
        let cluster = ClusterConfig::new("https://storm.example.net/", "admin", "pw").unwrap();
        let client = StormUiClient::new(&cluster, Duration::from_secs(5)).unwrap();

        assert_eq!(client.cluster_url(), "https://storm.example.net");
        assert_eq!(
            client.api_url("topology/summary"),
            "https://storm.example.net/stormui/api/v1/topology/summary"
        );
    }

    #[tokio::test]
    async fn test_topology_summary_uses_basic_auth() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stormui/api/v1/topology/summary"))
            .and(basic_auth("admin", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "topologies": [{"name": "wordcount", "id": "wordcount-1-1680000000"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let summary = client_for(&server).topology_summary().await.unwrap();
        assert_eq!(summary.names(), vec!["wordcount"]);
    }

    #[tokio::test]
    async fn test_unauthorized_is_authentication_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client_for(&server).topology_summary().await;
        assert!(matches!(
            result,
            Err(ApiError::Authentication { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_server_error_is_status_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;

        let result = client_for(&server).topology("wordcount-1").await;
        assert!(matches!(result, Err(ApiError::Status { status: 503, .. })));
    }

    #[tokio::test]
    async fn test_malformed_json_is_invalid_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_body_string("<html>login</html>"))
            .mount(&server)
            .await;

        let result = client_for(&server).topology_summary().await;
        assert!(matches!(result, Err(ApiError::InvalidResponse { .. })));
    }

    #[tokio::test]
    async fn test_component_endpoint() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/stormui/api/v1/topology/wordcount-1/component/split"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "executorStats": [{"host": "wn0", "workerLogLink": "/log?file=worker.log"}]
            })))
            .expect(1)
            .mount(&server)
            .await;

        let details = client_for(&server)
            .component("wordcount-1", "split")
            .await
            .unwrap();
        assert_eq!(details.executor_stats[0].host, "wn0");
    }

    #[tokio::test]
    async fn test_fetch_and_save_streams_body_verbatim() {
        let server = MockServer::start().await;
        let body: Vec<u8> = (0..4 * 1024 * 1024u32).map(|i| (i % 251) as u8).collect();
        Mock::given(method("GET"))
            .and(path("/download/logs/worker-6700/worker.log"))
            .and(basic_auth("admin", "secret"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(body.clone()))
            .mount(&server)
            .await;

        let dest = tempfile::tempdir().unwrap();
        let dir = dest.path().join("wordcount-1").join("wn0");
        let url = format!("{}/download/logs/worker-6700/worker.log", server.uri());

        let saved = client_for(&server).fetch_and_save(&url, &dir).await.unwrap();
        assert!(saved.is_absolute());
        assert!(saved.ends_with("wordcount-1/wn0/worker.log"));
        assert_eq!(std::fs::read(&saved).unwrap(), body);
    }

    #[tokio::test]
    async fn test_fetch_and_save_missing_file_writes_nothing() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&server)
            .await;

        let dest = tempfile::tempdir().unwrap();
        let dir = dest.path().join("wn0");
        let url = format!("{}/download/worker.log.1", server.uri());

        let result = client_for(&server).fetch_and_save(&url, &dir).await;
        assert!(matches!(
            result,
            Err(DownloadError::Status { status: 404, .. })
        ));
        assert!(!dir.exists());
    }
}

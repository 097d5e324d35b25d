use crate::api::{ensure_dir, log_file_name, ApiFuture, ClusterApi};
use crate::error::{ApiError, DownloadError};
use crate::topology::{
    BoltEntry, ComponentDetails, ExecutorStat, SpoutEntry, TopologyDetails, TopologyEntry,
    TopologySummary,
};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// In-memory cluster for testing
///
/// Serves a fixed topology layout and a set of downloadable files, and records
/// every URL requested so tests can assert on request counts and ordering.
/// Unknown log URLs answer like a missing file (HTTP 404).
#[derive(Clone, Default)]
pub struct MockCluster {
    cluster_url: String,
    summary: TopologySummary,
    topologies: HashMap<String, TopologyDetails>,
    components: HashMap<(String, String), ComponentDetails>,
    files: HashMap<String, Vec<u8>>,
    api_status: Option<u16>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockCluster {
    pub fn new(cluster_url: &str) -> Self {
        Self {
            cluster_url: cluster_url.to_string(),
            ..Self::default()
        }
    }

    /// Add a running topology with its spouts and bolts
    pub fn with_topology(mut self, name: &str, id: &str, spouts: &[&str], bolts: &[&str]) -> Self {
        self.summary.topologies.push(TopologyEntry {
            name: name.to_string(),
            id: id.to_string(),
        });
        self.topologies.insert(
            id.to_string(),
            TopologyDetails {
                spouts: spouts
                    .iter()
                    .map(|s| SpoutEntry {
                        spout_id: s.to_string(),
                    })
                    .collect(),
                bolts: bolts
                    .iter()
                    .map(|b| BoltEntry {
                        bolt_id: b.to_string(),
                    })
                    .collect(),
            },
        );
        self
    }

    /// Set the executors of a component as `(host, workerLogLink)` pairs
    pub fn with_executors(
        mut self,
        topology_id: &str,
        component_id: &str,
        executors: &[(&str, &str)],
    ) -> Self {
        let executor_stats = executors
            .iter()
            .map(|(host, link)| ExecutorStat {
                host: host.to_string(),
                worker_log_link: link.to_string(),
            })
            .collect();
        self.components.insert(
            (topology_id.to_string(), component_id.to_string()),
            ComponentDetails { executor_stats },
        );
        self
    }

    /// Make `url` downloadable with the given body
    pub fn with_file(mut self, url: &str, body: impl Into<Vec<u8>>) -> Self {
        self.files.insert(url.to_string(), body.into());
        self
    }

    /// Answer every API call with the given HTTP status
    pub fn with_api_status(mut self, status: u16) -> Self {
        self.api_status = Some(status);
        self
    }

    /// Every URL requested so far, in request order
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().unwrap().clone()
    }

    /// Requested URLs that were log downloads rather than API calls
    pub fn download_requests(&self) -> Vec<String> {
        self.requests()
            .into_iter()
            .filter(|url| !url.contains("/stormui/api/"))
            .collect()
    }

    fn record(&self, url: String) {
        self.requests.lock().unwrap().push(url);
    }

    fn api_call<T: Clone>(&self, path: &str, value: Option<&T>) -> Result<T, ApiError> {
        let url = format!("{}/stormui/api/v1/{}", self.cluster_url, path);
        self.record(url.clone());

        match self.api_status {
            Some(status @ (401 | 403)) => Err(ApiError::Authentication { url, status }),
            Some(status) => Err(ApiError::Status { url, status }),
            None => value.cloned().ok_or(ApiError::Status { url, status: 404 }),
        }
    }

    async fn save(&self, url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        self.record(url.to_string());
        let file_name = log_file_name(url)?;

        let body = self.files.get(url).ok_or_else(|| DownloadError::Status {
            url: url.to_string(),
            status: 404,
        })?;

        ensure_dir(dir).await?;
        let path = dir.join(file_name);
        tokio::fs::write(&path, body)
            .await
            .map_err(|source| DownloadError::Io {
                path: path.clone(),
                source,
            })?;
        Ok(path)
    }
}

impl ClusterApi for MockCluster {
    fn cluster_url(&self) -> &str {
        &self.cluster_url
    }

    fn topology_summary(&self) -> ApiFuture<'_, Result<TopologySummary, ApiError>> {
        let result = self.api_call("topology/summary", Some(&self.summary));
        Box::pin(async move { result })
    }

    fn topology<'a>(
        &'a self,
        topology_id: &'a str,
    ) -> ApiFuture<'a, Result<TopologyDetails, ApiError>> {
        let result = self.api_call(
            &format!("topology/{}", topology_id),
            self.topologies.get(topology_id),
        );
        Box::pin(async move { result })
    }

    fn component<'a>(
        &'a self,
        topology_id: &'a str,
        component_id: &'a str,
    ) -> ApiFuture<'a, Result<ComponentDetails, ApiError>> {
        let key = (topology_id.to_string(), component_id.to_string());
        let result = self.api_call(
            &format!("topology/{}/component/{}", topology_id, component_id),
            self.components.get(&key),
        );
        Box::pin(async move { result })
    }

    fn fetch_and_save<'a>(
        &'a self,
        url: &'a str,
        dir: &'a Path,
    ) -> ApiFuture<'a, Result<PathBuf, DownloadError>> {
        Box::pin(self.save(url, dir))
    }
}

/// Cluster management REST API access
pub mod client;
pub mod mock;

pub use client::StormUiClient;
pub use mock::MockCluster;

use crate::error::{ApiError, DownloadError};
use crate::topology::{ComponentDetails, TopologyDetails, TopologySummary};
use std::future::Future;
use std::path::{Path, PathBuf};
use std::pin::Pin;

/// Boxed future returned by [`ClusterApi`] methods
pub type ApiFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Trait for access to a cluster's topology metadata and log files
pub trait ClusterApi: Send + Sync {
    /// Base URL that worker log links are resolved against
    fn cluster_url(&self) -> &str;

    fn topology_summary(&self) -> ApiFuture<'_, Result<TopologySummary, ApiError>>;

    fn topology<'a>(
        &'a self,
        topology_id: &'a str,
    ) -> ApiFuture<'a, Result<TopologyDetails, ApiError>>;

    fn component<'a>(
        &'a self,
        topology_id: &'a str,
        component_id: &'a str,
    ) -> ApiFuture<'a, Result<ComponentDetails, ApiError>>;

    /// Stream `url` into `dir/<last path segment of url>`
    ///
    /// The directory is created if absent. Nothing is written unless the server
    /// answers with a success status.
    fn fetch_and_save<'a>(
        &'a self,
        url: &'a str,
        dir: &'a Path,
    ) -> ApiFuture<'a, Result<PathBuf, DownloadError>>;
}

/// File name a log URL is saved under
///
/// # Errors
///
/// Returns `DownloadError::NoFileName` if the URL ends in `/`.
pub fn log_file_name(url: &str) -> Result<&str, DownloadError> {
    match url.rsplit('/').next() {
        Some(name) if !name.is_empty() => Ok(name),
        _ => Err(DownloadError::NoFileName(url.to_string())),
    }
}

/// Create `dir` and all its parents, tolerating a concurrent creator
pub(crate) async fn ensure_dir(dir: &Path) -> Result<(), DownloadError> {
    tokio::fs::create_dir_all(dir)
        .await
        .map_err(|source| DownloadError::Io {
            path: dir.to_path_buf(),
            source,
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_log_file_name() {
        assert_eq!(
            log_file_name("http://c/download/logs/worker-6700/worker.log").unwrap(),
            "worker.log"
        );
        assert_eq!(
            log_file_name("http://c/download/worker.log.3").unwrap(),
            "worker.log.3"
        );
        assert!(log_file_name("http://c/download/").is_err());
    }

    #[tokio::test]
    async fn test_ensure_dir_is_idempotent() {
        let root = tempfile::tempdir().unwrap();
        let dir = root.path().join("topology").join("wn0");

        let (a, b) = tokio::join!(ensure_dir(&dir), ensure_dir(&dir));
        assert!(a.is_ok());
        assert!(b.is_ok());
        assert!(ensure_dir(&dir).await.is_ok());
        assert!(dir.is_dir());
    }
}

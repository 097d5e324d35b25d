use crate::api::{log_file_name, ClusterApi};
use crate::config::Config;
use crate::error::{CollectorError, DownloadError};
use crate::topology::{Component, LogLinks};
use log::{debug, error, info, warn};
use std::collections::{BTreeMap, BTreeSet};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;

/// Download behaviour of a [`LogCollector`]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CollectorOptions {
    /// Rotated predecessors tried per log link (`.1` .. `.N`)
    pub max_rotations: u32,
    /// Log links downloaded concurrently
    pub parallel_downloads: usize,
}

impl Default for CollectorOptions {
    fn default() -> Self {
        Self {
            max_rotations: 9,
            parallel_downloads: 1,
        }
    }
}

impl From<&Config> for CollectorOptions {
    fn from(config: &Config) -> Self {
        Self {
            max_rotations: config.max_rotations,
            parallel_downloads: config.parallel_downloads,
        }
    }
}

/// Outcome of downloading every log link of a topology
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DownloadReport {
    pub topology_id: String,
    /// `{baseDir}/{topologyId}`, parent of all host directories
    pub topology_dir: PathBuf,
    /// Host directories that received at least one file
    pub directories: BTreeSet<PathBuf>,
    /// Every file written, primary and rotated
    pub files: BTreeSet<PathBuf>,
    /// Primary log URLs that could not be downloaded
    pub failed: Vec<String>,
    /// Number of rotated logs written
    pub rotated: usize,
}

impl DownloadReport {
    fn new(topology_id: &str, base_dir: &Path) -> Self {
        Self {
            topology_id: topology_id.to_string(),
            topology_dir: base_dir.join(topology_id),
            ..Self::default()
        }
    }

    fn record_all(&mut self, outcomes: Vec<LinkOutcome>) {
        for outcome in outcomes {
            self.record(outcome);
        }
    }

    fn record(&mut self, outcome: LinkOutcome) {
        if !outcome.saved.is_empty() {
            self.directories.insert(outcome.dir);
        }
        for path in outcome.saved {
            if !self.files.insert(path.clone()) {
                warn!("{} overwritten by {}", path.display(), outcome.url);
            }
        }
        self.rotated += outcome.rotated;
        if outcome.primary_failed {
            self.failed.push(outcome.url);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    pub fn log_summary(&self) {
        info!(
            "Topology {}: {} files ({} rotated) in {} host directories",
            self.topology_id,
            self.files.len(),
            self.rotated,
            self.directories.len()
        );
        for url in &self.failed {
            error!("Not downloaded: {}", url);
        }
    }
}

/// Result of one log link and its rotations
#[derive(Debug)]
struct LinkOutcome {
    url: String,
    dir: PathBuf,
    saved: Vec<PathBuf>,
    rotated: usize,
    primary_failed: bool,
}

/// Log collector for a cluster's running topologies
///
/// Resolves a topology by name, walks its components and executors to find
/// every worker and supervisor log, and downloads them into
/// `{baseDir}/{topologyId}/{host}`.
pub struct LogCollector {
    api: Arc<dyn ClusterApi>,
    options: CollectorOptions,
}

impl LogCollector {
    /// Create a new LogCollector on top of a cluster API
    ///
    /// # Example
    ///
    /// ```rust,no_run
    /// use std::sync::Arc;
    /// use storm_logs::api::MockCluster;
    /// use storm_logs::collectors::{CollectorOptions, LogCollector};
    ///
    /// let cluster = MockCluster::new("http://cluster");
    /// let collector = LogCollector::new(Arc::new(cluster), CollectorOptions::default());
    /// ```
    pub fn new(api: Arc<dyn ClusterApi>, options: CollectorOptions) -> Self {
        Self { api, options }
    }

    /// Run resolve, enumerate, derive and download for one topology
    pub async fn collect(
        &self,
        topology_name: &str,
        download_older_logs: bool,
        base_dir: &Path,
    ) -> Result<DownloadReport, CollectorError> {
        let topology_id = self.resolve_topology_id(topology_name).await?;
        let components = self.list_components(&topology_id).await?;
        let links = self.derive_log_links(&topology_id, &components).await?;
        self.download_all(&topology_id, &links, download_older_logs, base_dir)
            .await
    }

    /// Find the id of the running topology called `topology_name`
    ///
    /// # Errors
    ///
    /// Returns `CollectorError::TopologyNotFound` if no running topology has
    /// that name; the names of all running topologies are logged first.
    pub async fn resolve_topology_id(&self, topology_name: &str) -> Result<String, CollectorError> {
        let summary = self.api.topology_summary().await?;
        debug!("Topology summary: {:?}", summary);

        let matches: Vec<_> = summary.matching(topology_name).collect();
        let Some(first) = matches.first() else {
            error!("Topology not found. Name: {}", topology_name);
            info!("Currently running topologies: ");
            let available = summary.names();
            for name in &available {
                info!("{}", name);
            }
            return Err(CollectorError::TopologyNotFound {
                name: topology_name.to_string(),
                available,
            });
        };

        if matches.len() > 1 {
            let ids: Vec<&str> = matches.iter().map(|t| t.id.as_str()).collect();
            warn!(
                "{} running topologies are named '{}' ({}), using the first",
                matches.len(),
                topology_name,
                ids.join(", ")
            );
        }

        info!("Topology found with id: {}", first.id);
        Ok(first.id.clone())
    }

    /// Spouts followed by bolts of a topology, in API order
    pub async fn list_components(&self, topology_id: &str) -> Result<Vec<Component>, CollectorError> {
        let details = self.api.topology(topology_id).await?;
        debug!("Topology {} details: {:?}", topology_id, details);

        let components = details.components();
        let ids: Vec<&str> = components.iter().map(|c| c.id.as_str()).collect();
        info!("Topology: {} - Component list: {:?}", topology_id, ids);
        Ok(components)
    }

    /// Derive the deduplicated worker and supervisor log links of all executors
    pub async fn derive_log_links(
        &self,
        topology_id: &str,
        components: &[Component],
    ) -> Result<LogLinks, CollectorError> {
        let mut links = LogLinks::new();
        for component in components {
            let details = self.api.component(topology_id, &component.id).await?;
            debug!("Component '{}' summary: {:?}", component.id, details);

            for executor in &details.executor_stats {
                links.add_executor(self.api.cluster_url(), executor);
            }
        }

        info!("Log links ({}):\n{}", links.len(), links);
        Ok(links)
    }

    /// Download every log link, plus its rotations when `download_older_logs` is set
    ///
    /// A primary log that cannot be fetched is reported and skipped. Rotations
    /// stop at the first one that cannot be fetched. Links on one host that
    /// share a file name are downloaded one after the other, so the last link
    /// in order owns the file even with parallel downloads.
    ///
    /// # Errors
    ///
    /// Filesystem failures abort the run with `CollectorError::Download`.
    pub async fn download_all(
        &self,
        topology_id: &str,
        links: &LogLinks,
        download_older_logs: bool,
        base_dir: &Path,
    ) -> Result<DownloadReport, CollectorError> {
        let mut report = DownloadReport::new(topology_id, base_dir);
        let rotations = if download_older_logs {
            self.options.max_rotations
        } else {
            info!("Older logs disabled, skipping rotated log downloads");
            0
        };

        let semaphore = Arc::new(Semaphore::new(self.options.parallel_downloads.max(1)));
        let mut tasks = JoinSet::new();

        for group in destination_groups(&report.topology_dir, links) {
            let permit = Arc::clone(&semaphore)
                .acquire_owned()
                .await
                .map_err(|e| CollectorError::Task(e.to_string()))?;

            // Surface fatal failures before starting more downloads
            while let Some(joined) = tasks.try_join_next() {
                report.record_all(Self::joined(joined)?);
            }

            let api = Arc::clone(&self.api);
            tasks.spawn(async move {
                // Links sharing a destination run in link order, the last one wins
                let mut outcomes = Vec::with_capacity(group.len());
                for (url, dir) in group {
                    outcomes.push(download_link(api.as_ref(), url, dir, rotations).await?);
                }
                drop(permit);
                Ok::<_, DownloadError>(outcomes)
            });
        }

        while let Some(joined) = tasks.join_next().await {
            report.record_all(Self::joined(joined)?);
        }

        report.failed.sort();
        Ok(report)
    }

    /// Stream a single log into `dir`
    pub async fn fetch_and_save(&self, url: &str, dir: &Path) -> Result<PathBuf, DownloadError> {
        self.api.fetch_and_save(url, dir).await
    }

    fn joined(
        joined: Result<Result<Vec<LinkOutcome>, DownloadError>, tokio::task::JoinError>,
    ) -> Result<Vec<LinkOutcome>, CollectorError> {
        let outcomes = joined.map_err(|e| CollectorError::Task(e.to_string()))??;
        Ok(outcomes)
    }
}

/// Split log links into groups that write to the same file
///
/// Two links on one host with the same file name (every port's
/// `supervisor.log`, or `worker.log` of several ports) save to one path and
/// must not be downloaded concurrently. Groups keep link order.
fn destination_groups(topology_dir: &Path, links: &LogLinks) -> Vec<Vec<(String, PathBuf)>> {
    let mut groups: BTreeMap<(PathBuf, String), Vec<(String, PathBuf)>> = BTreeMap::new();
    for (url, host) in links.iter() {
        let dir = topology_dir.join(host);
        // A link without a file name fails on its own
        let name = log_file_name(url).unwrap_or(url).to_string();
        groups
            .entry((dir.clone(), name))
            .or_default()
            .push((url.to_string(), dir));
    }
    groups.into_values().collect()
}

/// Download one log link, then up to `rotations` predecessors in order
async fn download_link(
    api: &dyn ClusterApi,
    url: String,
    dir: PathBuf,
    rotations: u32,
) -> Result<LinkOutcome, DownloadError> {
    info!("Downloading {} to {}", url, dir.display());
    let mut outcome = LinkOutcome {
        url,
        dir,
        saved: Vec::new(),
        rotated: 0,
        primary_failed: false,
    };

    match api.fetch_and_save(&outcome.url, &outcome.dir).await {
        Ok(path) => {
            info!("Download complete - {}", path.display());
            outcome.saved.push(path);
        }
        Err(e) if e.is_fatal() => return Err(e),
        Err(e) => {
            error!("Unable to download {}: {}", outcome.url, e);
            outcome.primary_failed = true;
            return Ok(outcome);
        }
    }

    if rotations == 0 {
        return Ok(outcome);
    }

    info!(
        "Attempting to download older logs using {} to {}",
        outcome.url,
        outcome.dir.display()
    );
    for num in 1..=rotations {
        let rotated_url = format!("{}.{}", outcome.url, num);
        match api.fetch_and_save(&rotated_url, &outcome.dir).await {
            Ok(path) => {
                info!("Download complete - {}", path.display());
                outcome.saved.push(path);
                outcome.rotated += 1;
            }
            Err(e) => {
                info!("No more older logs after {}: {}", rotated_url, e);
                break;
            }
        }
    }

    Ok(outcome)
}

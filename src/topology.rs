//! Topology metadata and derived log links
//!
//! This module defines the payloads returned by the cluster's REST API and the
//! log link set derived from them. Everything here lives for a single run.

use serde::{Deserialize, Serialize};
use std::collections::btree_map::{self, BTreeMap};
use std::fmt;

/// Literal fragment of the live-tail log view URL
const TAIL_FRAGMENT: &str = "log?file=";

/// Literal path segment of the direct download endpoint
const DOWNLOAD_FRAGMENT: &str = "download/";

/// Per-host log written by the supervisor next to every worker log
pub const SUPERVISOR_LOG: &str = "supervisor.log";

/// Response of `GET /stormui/api/v1/topology/summary`
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
pub struct TopologySummary {
    #[serde(default)]
    pub topologies: Vec<TopologyEntry>,
}

/// One running topology as listed in the summary
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct TopologyEntry {
    /// User-chosen name, not guaranteed unique
    pub name: String,
    /// Cluster-assigned identifier
    pub id: String,
}

impl TopologySummary {
    /// Names of all running topologies in listing order
    pub fn names(&self) -> Vec<String> {
        self.topologies.iter().map(|t| t.name.clone()).collect()
    }

    /// All entries whose name matches exactly, in listing order
    pub fn matching<'a>(&'a self, name: &'a str) -> impl Iterator<Item = &'a TopologyEntry> + 'a {
        self.topologies.iter().filter(move |t| t.name == name)
    }
}

/// Response of `GET /stormui/api/v1/topology/{id}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct TopologyDetails {
    #[serde(default)]
    pub spouts: Vec<SpoutEntry>,
    #[serde(default)]
    pub bolts: Vec<BoltEntry>,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct SpoutEntry {
    pub spout_id: String,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BoltEntry {
    pub bolt_id: String,
}

/// Kind of a topology component
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ComponentKind {
    /// Stream source
    Spout,
    /// Stream processor
    Bolt,
}

/// A spout or bolt of a topology
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Component {
    pub id: String,
    pub kind: ComponentKind,
}

impl TopologyDetails {
    /// Spouts followed by bolts, each in API order
    pub fn components(&self) -> Vec<Component> {
        let spouts = self.spouts.iter().map(|s| Component {
            id: s.spout_id.clone(),
            kind: ComponentKind::Spout,
        });
        let bolts = self.bolts.iter().map(|b| Component {
            id: b.bolt_id.clone(),
            kind: ComponentKind::Bolt,
        });
        spouts.chain(bolts).collect()
    }
}

/// Response of `GET /stormui/api/v1/topology/{id}/component/{componentId}`
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct ComponentDetails {
    #[serde(default)]
    pub executor_stats: Vec<ExecutorStat>,
}

/// A running executor of a component
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct ExecutorStat {
    /// Host the executor's worker runs on
    pub host: String,
    /// Live-tail view of the worker log, e.g. `/log?file=worker-6700.log`
    pub worker_log_link: String,
}

/// Turn a live-tail log view link into a direct download link
///
/// This is a literal substitution of `log?file=` with `download/`, nothing else
/// about the URL is interpreted.
pub fn rewrite_to_download(link: &str) -> String {
    link.replace(TAIL_FRAGMENT, DOWNLOAD_FRAGMENT)
}

/// Supervisor log URL living next to the given worker log URL
pub fn supervisor_log_url(worker_log_url: &str) -> String {
    match worker_log_url.rsplit_once('/') {
        Some((parent, _)) => format!("{}/{}", parent, SUPERVISOR_LOG),
        None => SUPERVISOR_LOG.to_string(),
    }
}

/// Download URLs mapped to the host that produced them
///
/// Keys are unique: the first host recorded for a URL is kept.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LogLinks {
    links: BTreeMap<String, String>,
}

impl LogLinks {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `url` for `host` unless the URL is already known
    ///
    /// Returns `true` if the link was new.
    pub fn insert(&mut self, url: String, host: &str) -> bool {
        match self.links.entry(url) {
            btree_map::Entry::Vacant(entry) => {
                entry.insert(host.to_string());
                true
            }
            btree_map::Entry::Occupied(_) => false,
        }
    }

    /// Derive and record the worker and supervisor links of one executor
    pub fn add_executor(&mut self, cluster_url: &str, executor: &ExecutorStat) {
        let worker = format!("{}{}", cluster_url, rewrite_to_download(&executor.worker_log_link));
        let supervisor = supervisor_log_url(&worker);
        self.insert(worker, &executor.host);
        self.insert(supervisor, &executor.host);
    }

    pub fn host(&self, url: &str) -> Option<&str> {
        self.links.get(url).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.links.len()
    }

    pub fn is_empty(&self) -> bool {
        self.links.is_empty()
    }

    /// Iterate `(url, host)` pairs in URL order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.links.iter().map(|(u, h)| (u.as_str(), h.as_str()))
    }
}

impl fmt::Display for LogLinks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (url, host) in self.iter() {
            writeln!(f, "  {} -> {}", host, url)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_rewrite_to_download() {
        assert_eq!(
            rewrite_to_download("host:8000/log?file=worker.log"),
            "host:8000/download/worker.log"
        );
        // Links without the tail fragment pass through untouched
        assert_eq!(
            rewrite_to_download("host:8000/download/worker.log"),
            "host:8000/download/worker.log"
        );
    }

    #[test]
    fn test_supervisor_log_url() {
        assert_eq!(
            supervisor_log_url("http://c:8000/download/logs/worker-6700/worker.log"),
            "http://c:8000/download/logs/worker-6700/supervisor.log"
        );
        assert_eq!(supervisor_log_url("worker.log"), "supervisor.log");
    }

    #[test]
    fn test_summary_deserialization() {
        let json = r#"{
            "topologies": [
                {"name": "wordcount", "id": "wordcount-1-1680000000", "status": "ACTIVE"},
                {"name": "sessions", "id": "sessions-4-1680000100"}
            ]
        }"#;
        let summary: TopologySummary = serde_json::from_str(json).unwrap();
        assert_eq!(summary.names(), vec!["wordcount", "sessions"]);
        assert_eq!(
            summary.matching("wordcount").next().unwrap().id,
            "wordcount-1-1680000000"
        );
        assert!(summary.matching("missing").next().is_none());
    }

    #[test]
    fn test_components_are_spouts_then_bolts() {
        let json = r#"{
            "spouts": [{"spoutId": "sentences"}],
            "bolts": [{"boltId": "split"}, {"boltId": "count"}]
        }"#;
        let details: TopologyDetails = serde_json::from_str(json).unwrap();
        let ids: Vec<_> = details.components().into_iter().map(|c| c.id).collect();
        assert_eq!(ids, vec!["sentences", "split", "count"]);
        assert_eq!(details.components()[0].kind, ComponentKind::Spout);
        assert_eq!(details.components()[2].kind, ComponentKind::Bolt);
    }

    #[test]
    fn test_component_details_deserialization() {
        let json = r#"{
            "executorStats": [
                {"host": "wn0", "port": 6700, "workerLogLink": "/log?file=wordcount-1-1680000000/6700/worker.log"}
            ]
        }"#;
        let details: ComponentDetails = serde_json::from_str(json).unwrap();
        assert_eq!(details.executor_stats.len(), 1);
        assert_eq!(details.executor_stats[0].host, "wn0");
    }

    #[test]
    fn test_first_host_wins() {
        let mut links = LogLinks::new();
        assert!(links.insert("http://c/download/w.log".to_string(), "wn0"));
        assert!(!links.insert("http://c/download/w.log".to_string(), "wn1"));
        assert_eq!(links.len(), 1);
        assert_eq!(links.host("http://c/download/w.log"), Some("wn0"));
    }

    #[test]
    fn test_add_executor_derives_both_links() {
        let mut links = LogLinks::new();
        let executor = ExecutorStat {
            host: "wn0".to_string(),
            worker_log_link: "/log?file=logs/worker-6700/worker.log".to_string(),
        };
        links.add_executor("http://cluster:8000", &executor);
        links.add_executor("http://cluster:8000", &executor);

        let urls: Vec<_> = links.iter().map(|(u, _)| u.to_string()).collect();
        assert_eq!(
            urls,
            vec![
                "http://cluster:8000/download/logs/worker-6700/supervisor.log",
                "http://cluster:8000/download/logs/worker-6700/worker.log",
            ]
        );
    }
}

/// Cluster address and credentials
pub mod cluster;

/// Run tunables loaded from TOML
pub mod settings;

pub use cluster::{parse_download_older_logs, ClusterConfig};
pub use settings::Config;

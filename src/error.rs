use std::path::PathBuf;
use thiserror::Error;

/// Errors returned by the cluster management REST API
///
/// Any of these aborts the run: the topology metadata is mandatory.
#[derive(Error, Debug)]
pub enum ApiError {
    #[error("Authentication rejected by cluster ({status}) for {url}")]
    Authentication { url: String, status: u16 },

    #[error("Cluster API returned HTTP {status} for {url}")]
    Status { url: String, status: u16 },

    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("Invalid response from {url}: {reason}")]
    InvalidResponse { url: String, reason: String },
}

/// Errors that can occur while fetching a single log file
#[derive(Error, Debug)]
pub enum DownloadError {
    #[error("Download of {url} failed with HTTP {status}")]
    Status { url: String, status: u16 },

    #[error("Download of {url} failed: {source}")]
    Transport {
        url: String,
        #[source]
        source: reqwest::Error,
    },

    #[error("URL has no file name: {0}")]
    NoFileName(String),

    #[error("Failed to write {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

impl DownloadError {
    /// Filesystem failures are not a property of the remote log and abort the run
    pub fn is_fatal(&self) -> bool {
        matches!(self, DownloadError::Io { .. })
    }
}

/// Errors that can occur while collecting logs for a topology
#[derive(Error, Debug)]
pub enum CollectorError {
    #[error("Topology not found: {name}")]
    TopologyNotFound { name: String, available: Vec<String> },

    #[error(transparent)]
    Api(#[from] ApiError),

    #[error(transparent)]
    Download(#[from] DownloadError),

    #[error("Archive error: {0}")]
    Archive(#[from] zip::result::ZipError),

    #[error("Download task failed: {0}")]
    Task(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),
}

/// Errors that can occur during configuration loading
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    ReadError(String),

    #[error("Invalid configuration value: {0}")]
    ValidationError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parse error: {0}")]
    TomlError(#[from] toml::de::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_download_error_fatality() {
        let io = DownloadError::Io {
            path: PathBuf::from("/tmp/x"),
            source: std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        };
        assert!(io.is_fatal());

        let status = DownloadError::Status {
            url: "http://c/download/worker.log.3".to_string(),
            status: 404,
        };
        assert!(!status.is_fatal());
        assert!(!DownloadError::NoFileName("http://c/".to_string()).is_fatal());
    }

    #[test]
    fn test_topology_not_found_message() {
        let err = CollectorError::TopologyNotFound {
            name: "missing".to_string(),
            available: vec!["wordcount".to_string()],
        };
        assert_eq!(err.to_string(), "Topology not found: missing");
    }
}

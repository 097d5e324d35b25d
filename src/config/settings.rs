use crate::error::ConfigError;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Highest rotation suffix the cluster's log configuration ever produces
const MAX_ROTATION_LIMIT: u32 = 99;

/// Tunables for a collection run
///
/// Every field has a default, so a TOML file only needs the keys it changes:
///
/// ```toml
/// output_dir = "/var/tmp/storm-logs"
/// parallel_downloads = 4
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct Config {
    /// Directory the `{topologyId}/{host}` tree and the archive are written to
    pub output_dir: PathBuf,
    /// Directory holding the run log files
    pub log_dir: PathBuf,
    /// Connect timeout for every request, in seconds
    pub connect_timeout_seconds: u64,
    /// Number of rotated predecessors (`.1` .. `.N`) tried per log
    pub max_rotations: u32,
    /// Log links downloaded concurrently
    pub parallel_downloads: usize,
    /// Keep the downloaded tree next to the archive
    pub keep_download_dir: bool,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            output_dir: PathBuf::from("."),
            log_dir: PathBuf::from("logs"),
            connect_timeout_seconds: 30,
            max_rotations: 9,
            parallel_downloads: 1,
            keep_download_dir: true,
        }
    }
}

impl Config {
    /// Load and validate a configuration file
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadError` if the file cannot be read, a parse error
    /// for malformed TOML and `ConfigError::ValidationError` for out-of-range values.
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)
            .map_err(|e| ConfigError::ReadError(format!("{}: {}", path.display(), e)))?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Apply command-line overrides on top of file or default values
    pub fn with_overrides(
        mut self,
        output_dir: Option<PathBuf>,
        log_dir: Option<PathBuf>,
        parallel_downloads: Option<usize>,
    ) -> Self {
        if let Some(dir) = output_dir {
            self.output_dir = dir;
        }
        if let Some(dir) = log_dir {
            self.log_dir = dir;
        }
        if let Some(parallel) = parallel_downloads {
            self.parallel_downloads = parallel;
        }
        self
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.parallel_downloads == 0 {
            return Err(ConfigError::ValidationError(
                "parallel_downloads must be at least 1".to_string(),
            ));
        }
        if self.max_rotations == 0 || self.max_rotations > MAX_ROTATION_LIMIT {
            return Err(ConfigError::ValidationError(format!(
                "max_rotations must be between 1 and {}, got {}",
                MAX_ROTATION_LIMIT, self.max_rotations
            )));
        }
        if self.connect_timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "connect_timeout_seconds must be positive".to_string(),
            ));
        }
        Ok(())
    }

    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout_seconds)
    }
}

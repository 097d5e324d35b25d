/// Error types for the log collector
pub mod error;

/// Topology metadata and derived log links
pub mod topology;

/// Cluster REST API client and test double
pub mod api;

/// Topology log collector
pub mod collectors;

/// Zip packaging of downloaded logs
pub mod archive;

/// Configuration management
pub mod config;

/// Run-scoped console and file logging
pub mod logging;

// Re-export commonly used types
pub use error::{ApiError, CollectorError, ConfigError, DownloadError};

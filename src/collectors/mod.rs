/// Topology log collector
pub mod log_collector;

pub use log_collector::{CollectorOptions, DownloadReport, LogCollector};

use anyhow::Context;
use clap::Parser;
use log::{error, info, warn};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Instant;
use storm_logs::api::StormUiClient;
use storm_logs::archive;
use storm_logs::collectors::{CollectorOptions, LogCollector};
use storm_logs::config::{parse_download_older_logs, ClusterConfig, Config};
use storm_logs::error::{CollectorError, ConfigError};
use storm_logs::logging;

/// Exit code for fatal failures
const EXIT_FAILURE: u8 = 1;

/// Exit code for a topology name that is not running
const EXIT_TOPOLOGY_NOT_FOUND: u8 = 3;

// Usage errors exit with clap's code 2

/// Command-line arguments for the topology log downloader
#[derive(Parser)]
#[command(
    name = "storm-logs",
    about = "Download worker and supervisor logs of a Storm topology",
    long_about = "Queries the Storm UI REST API of a cluster for the executors of a topology, \
                  downloads every worker and supervisor log (and their rotated copies) into \
                  <topologyId>/<host>/ and packages the tree as <topologyId>.zip."
)]
struct Cli {
    /// Cluster base URL, e.g. https://mycluster.example.net
    cluster_url: String,

    /// Cluster user name for HTTP basic authentication
    cluster_username: String,

    /// Cluster password for HTTP basic authentication
    cluster_password: String,

    /// Name of the running topology
    topology_name: String,

    /// Pass FALSE to skip rotated older logs
    download_older_logs: Option<String>,

    /// Path to configuration file
    #[arg(short, long, value_name = "FILE", help = "Configuration file path (TOML format)")]
    config: Option<PathBuf>,

    /// Directory the log tree and archive are written to
    #[arg(short, long, value_name = "DIR")]
    output_dir: Option<PathBuf>,

    /// Directory for this run's log file
    #[arg(long, value_name = "DIR")]
    log_dir: Option<PathBuf>,

    /// Number of log links downloaded concurrently
    #[arg(short, long, value_name = "N")]
    parallel: Option<usize>,

    /// Leave the downloaded tree unarchived
    #[arg(long)]
    no_archive: bool,

    /// Enable verbose logging
    #[arg(short, long, help = "Enable verbose logging output (debug level)")]
    verbose: bool,
}

impl Cli {
    /// Validate the CLI arguments
    fn validate(&self) -> Result<(), String> {
        if let Some(ref config_path) = self.config {
            if config_path.exists() && !config_path.is_file() {
                return Err(format!(
                    "Configuration path is not a file: {}",
                    config_path.display()
                ));
            }
        }
        if self.topology_name.trim().is_empty() {
            return Err("Topology name must not be empty".to_string());
        }
        Ok(())
    }

    fn download_older_logs(&self) -> bool {
        parse_download_older_logs(self.download_older_logs.as_deref())
    }
}

/// Load configuration from file or use defaults
///
/// A missing or unreadable file falls back to defaults; the returned message is
/// logged once the logger is up.
fn load_config(config_path: Option<&Path>) -> Result<(Config, Option<String>), ConfigError> {
    match config_path {
        Some(path) => match Config::from_file(path) {
            Ok(config) => Ok((config, None)),
            Err(ConfigError::ReadError(e)) => Ok((
                Config::default(),
                Some(format!("Configuration file not readable ({}), using defaults", e)),
            )),
            Err(e) => Err(e),
        },
        None => Ok((Config::default(), None)),
    }
}

/// Exit code for an error that ended the run
fn exit_code_for(err: &anyhow::Error) -> u8 {
    match err.downcast_ref::<CollectorError>() {
        Some(CollectorError::TopologyNotFound { .. }) => EXIT_TOPOLOGY_NOT_FOUND,
        _ => EXIT_FAILURE,
    }
}

async fn run(cli: &Cli, config: &Config) -> anyhow::Result<()> {
    let start_time = Instant::now();
    let cluster = ClusterConfig::new(&cli.cluster_url, &cli.cluster_username, &cli.cluster_password)?;
    let download_older_logs = cli.download_older_logs();

    info!(
        "Getting topology summary from cluster: {} for topology: {}",
        cluster.url, cli.topology_name
    );

    let client = StormUiClient::new(&cluster, config.connect_timeout())?;
    let collector = LogCollector::new(Arc::new(client), CollectorOptions::from(config));
    let report = collector
        .collect(&cli.topology_name, download_older_logs, &config.output_dir)
        .await?;

    let logs_time = start_time.elapsed();
    info!("Time taken to download logs: {:.3} secs", logs_time.as_secs_f64());
    report.log_summary();

    if cli.no_archive {
        info!("Skipping archive, logs left in {}", report.topology_dir.display());
    } else if report.is_empty() {
        warn!("No log files were downloaded, skipping archive");
    } else {
        let source = report.topology_dir.clone();
        let archive_path = tokio::task::spawn_blocking(move || archive::archive(&source, &source))
            .await
            .context("Archive task failed")??;
        info!(
            "Time taken to zip logs: {:.3} secs",
            (start_time.elapsed() - logs_time).as_secs_f64()
        );

        if !config.keep_download_dir {
            tokio::fs::remove_dir_all(&report.topology_dir)
                .await
                .with_context(|| format!("Failed to remove {}", report.topology_dir.display()))?;
            info!("Removed {}, logs are in {}", report.topology_dir.display(), archive_path.display());
        }
    }

    info!("Total time taken: {:.3} secs", start_time.elapsed().as_secs_f64());
    Ok(())
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    if let Err(e) = cli.validate() {
        eprintln!("Invalid arguments: {}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    let (config, config_warning) = match load_config(cli.config.as_deref()) {
        Ok(loaded) => loaded,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    let config = config.with_overrides(cli.output_dir.clone(), cli.log_dir.clone(), cli.parallel);
    if let Err(e) = config.validate() {
        eprintln!("Invalid configuration: {}", e);
        return ExitCode::from(EXIT_FAILURE);
    }

    let run_log = match logging::init(&config.log_dir, cli.verbose) {
        Ok(run_log) => run_log,
        Err(e) => {
            eprintln!("Failed to initialize logging: {:#}", e);
            return ExitCode::from(EXIT_FAILURE);
        }
    };
    info!("Run log: {}", run_log.path().display());
    if let Some(warning) = config_warning {
        warn!("{}", warning);
    }

    match run(&cli, &config).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("{:#}", e);
            ExitCode::from(exit_code_for(&e))
        }
    }
}

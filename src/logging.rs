//! Run-scoped logging
//!
//! Every run writes the same timestamped lines to stderr and to its own log
//! file under the log directory.

use anyhow::Context;
use chrono::{DateTime, Local};
use env_logger::{Builder, Env, Target};
use std::fs::File;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

/// Handle to the logger installed for this run
#[derive(Debug)]
pub struct RunLog {
    path: PathBuf,
}

impl RunLog {
    /// Path of this run's log file
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Name of the log file for a run started at `started`
pub fn log_file_name(started: DateTime<Local>) -> String {
    format!("storm-logs-{}.log", started.format("%Y%m%d%H%M%S"))
}

/// Format one log line as `<timestamp> [<LEVEL>] - <message>`
pub fn format_line(at: DateTime<Local>, level: log::Level, message: &std::fmt::Arguments) -> String {
    format!(
        "{} [{}] - {}",
        at.format("%Y-%m-%d %H:%M:%S,%3f"),
        level,
        message
    )
}

/// Install the process logger for this run
///
/// Logs at `info` (or `debug` when `verbose`) unless `RUST_LOG` says otherwise.
///
/// # Errors
///
/// Fails if the log directory or file cannot be created, or if a logger is
/// already installed.
pub fn init(log_dir: &Path, verbose: bool) -> anyhow::Result<RunLog> {
    std::fs::create_dir_all(log_dir)
        .with_context(|| format!("Failed to create log directory {}", log_dir.display()))?;

    let path = log_dir.join(log_file_name(Local::now()));
    let file = File::create(&path)
        .with_context(|| format!("Failed to create log file {}", path.display()))?;

    let default_level = if verbose { "debug" } else { "info" };
    Builder::from_env(Env::default().default_filter_or(default_level))
        .format(|buf, record| {
            writeln!(buf, "{}", format_line(Local::now(), record.level(), record.args()))
        })
        .target(Target::Pipe(Box::new(Tee {
            console: io::stderr(),
            file,
        })))
        .try_init()
        .context("Logger already initialized")?;

    Ok(RunLog { path })
}

/// Writer duplicating every line to the console and the run log file
struct Tee {
    console: io::Stderr,
    file: File,
}

impl Write for Tee {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.file.write_all(buf)?;
        // Console errors are dropped, the file is the record
        self.console.write_all(buf).ok();
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        self.console.flush().ok();
        self.file.flush()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_log_file_name() {
        let started = Local.with_ymd_and_hms(2024, 3, 28, 14, 5, 9).unwrap();
        assert_eq!(log_file_name(started), "storm-logs-20240328140509.log");
    }

    #[test]
    fn test_format_line() {
        let at = Local.with_ymd_and_hms(2024, 3, 28, 14, 5, 9).unwrap();
        let line = format_line(at, log::Level::Info, &format_args!("Topology found with id: {}", "wc-1"));
        assert_eq!(line, "2024-03-28 14:05:09,000 [INFO] - Topology found with id: wc-1");
    }

    #[test]
    fn test_tee_writes_file() {
        let temp = tempfile::tempdir().unwrap();
        let path = temp.path().join("run.log");
        let mut tee = Tee {
            console: io::stderr(),
            file: File::create(&path).unwrap(),
        };

        writeln!(tee, "first").unwrap();
        writeln!(tee, "second").unwrap();
        tee.flush().unwrap();

        assert_eq!(std::fs::read_to_string(&path).unwrap(), "first\nsecond\n");
    }
}

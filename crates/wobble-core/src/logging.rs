//! Logging configuration
//!
//! Holds the settings the binary feeds into its `tracing-subscriber` setup and
//! the housekeeping for log files (directory creation, rotation by count).

use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::OnceLock;

use serde::{Deserialize, Serialize};
use tracing::level_filters::LevelFilter;

/// File name prefix for log files
pub const LOG_FILE_PREFIX: &str = "wobble";

static SESSION_STAMP: OnceLock<String> = OnceLock::new();

fn session_stamp() -> &'static str {
    SESSION_STAMP.get_or_init(|| chrono::Local::now().format("%Y%m%d_%H%M%S").to_string())
}

/// Logging settings
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    /// Minimum level (`trace`, `debug`, `info`, `warn`, `error`)
    pub level: String,
    /// Write human-readable logs to stderr
    pub console_output: bool,
    /// Write logs to a file in `log_dir`
    pub file_output: bool,
    /// Directory for log files
    pub log_dir: PathBuf,
    /// Number of log files to keep, oldest removed first
    pub max_log_files: usize,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            console_output: true,
            file_output: false,
            log_dir: PathBuf::from("logs"),
            max_log_files: 10,
        }
    }
}

impl LogConfig {
    /// Parse `level`, falling back to INFO
    pub fn parse_level(&self) -> LevelFilter {
        match self.level.trim().to_ascii_lowercase().as_str() {
            "trace" => LevelFilter::TRACE,
            "debug" => LevelFilter::DEBUG,
            "info" => LevelFilter::INFO,
            "warn" | "warning" => LevelFilter::WARN,
            "error" => LevelFilter::ERROR,
            "off" => LevelFilter::OFF,
            _ => LevelFilter::INFO,
        }
    }

    /// Create `log_dir` if file output is enabled
    pub fn ensure_log_directory(&self) -> io::Result<()> {
        if self.file_output {
            fs::create_dir_all(&self.log_dir)?;
        }
        Ok(())
    }

    /// Log file for this process, stable for the lifetime of the process
    pub fn current_log_path(&self) -> PathBuf {
        self.log_dir
            .join(format!("{}_{}.log", LOG_FILE_PREFIX, session_stamp()))
    }

    /// Remove the oldest log files so that at most `max_log_files - 1` remain,
    /// leaving room for the file about to be created
    ///
    /// Returns the number of files removed.
    pub fn cleanup_old_logs(&self) -> io::Result<usize> {
        if !self.log_dir.exists() {
            return Ok(0);
        }

        let mut logs = list_log_files(&self.log_dir)?;
        let keep = self.max_log_files.saturating_sub(1);
        if logs.len() <= keep {
            return Ok(0);
        }

        // Timestamped names sort chronologically
        logs.sort();
        let excess = logs.len() - keep;
        for path in logs.iter().take(excess) {
            fs::remove_file(path)?;
        }
        Ok(excess)
    }
}

fn list_log_files(dir: &Path) -> io::Result<Vec<PathBuf>> {
    let mut logs = Vec::new();
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_log = path
            .file_name()
            .and_then(|n| n.to_str())
            .map(|n| n.starts_with(LOG_FILE_PREFIX) && n.ends_with(".log"))
            .unwrap_or(false);
        if is_log && path.is_file() {
            logs.push(path);
        }
    }
    Ok(logs)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_parse_level() {
        let mut config = LogConfig::default();
        assert_eq!(config.parse_level(), LevelFilter::INFO);

        config.level = "DEBUG".to_string();
        assert_eq!(config.parse_level(), LevelFilter::DEBUG);

        config.level = "nonsense".to_string();
        assert_eq!(config.parse_level(), LevelFilter::INFO);
    }

    #[test]
    fn test_current_log_path_is_stable() {
        let config = LogConfig::default();
        assert_eq!(config.current_log_path(), config.current_log_path());
        assert!(config.current_log_path().starts_with("logs"));
    }

    #[test]
    fn test_cleanup_old_logs() {
        let dir = tempdir().unwrap();
        for i in 0..5 {
            fs::write(dir.path().join(format!("wobble_2024010{}_000000.log", i)), "x").unwrap();
        }
        fs::write(dir.path().join("unrelated.txt"), "x").unwrap();

        let config = LogConfig {
            log_dir: dir.path().to_path_buf(),
            max_log_files: 3,
            ..Default::default()
        };
        assert_eq!(config.cleanup_old_logs().unwrap(), 3);

        let remaining = list_log_files(dir.path()).unwrap();
        assert_eq!(remaining.len(), 2);
        assert!(dir.path().join("wobble_20240104_000000.log").exists());
        assert!(!dir.path().join("wobble_20240100_000000.log").exists());
        assert!(dir.path().join("unrelated.txt").exists());
    }

    #[test]
    fn test_ensure_log_directory_only_for_file_output() {
        let dir = tempdir().unwrap();
        let log_dir = dir.path().join("nested/logs");

        let mut config = LogConfig {
            log_dir: log_dir.clone(),
            ..Default::default()
        };
        config.ensure_log_directory().unwrap();
        assert!(!log_dir.exists());

        config.file_output = true;
        config.ensure_log_directory().unwrap();
        assert!(log_dir.exists());
    }
}

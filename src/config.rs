use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::error::ConfigError;

// =============================================================================
// Scan-related constants
// =============================================================================

/// Default delay between scheduled sweeps in milliseconds (5 minutes)
pub const DEFAULT_SCAN_INTERVAL_MS: u64 = 5 * 60 * 1000;

/// Default number of components scanned concurrently in one sweep
pub const DEFAULT_SCAN_CONCURRENCY: usize = 4;

const APP_DIR_NAME: &str = "evergreen";

/// Top-level configuration, read from `config.json`
#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct AppConfig {
    pub scan: ScanConfig,
    pub log: LogConfig,
    pub database: DatabaseConfig,
}

/// Scheduler configuration
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct ScanConfig {
    /// Delay between sweeps in milliseconds
    pub interval_ms: u64,
    /// Maximum components scanned at once
    pub concurrency: usize,
    /// Run a sweep immediately instead of waiting one interval
    pub run_on_start: bool,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            interval_ms: DEFAULT_SCAN_INTERVAL_MS,
            concurrency: DEFAULT_SCAN_CONCURRENCY,
            run_on_start: true,
        }
    }
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogFormat {
    #[default]
    Text,
    Json,
}

#[derive(Debug, Clone, Copy, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum LogOutput {
    #[default]
    Stderr,
    File,
}

/// Logging configuration; `RUST_LOG` takes precedence over `level`
#[derive(Debug, Clone, Deserialize, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct LogConfig {
    pub level: String,
    pub format: LogFormat,
    pub output: LogOutput,
}

impl Default for LogConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: LogFormat::default(),
            output: LogOutput::default(),
        }
    }
}

#[derive(Debug, Clone, Deserialize, Default, PartialEq)]
#[serde(default, rename_all = "camelCase")]
pub struct DatabaseConfig {
    /// Database file; defaults to `<data_dir>/evergreen.db`
    pub path: Option<PathBuf>,
}

impl AppConfig {
    /// Load from `path`, or from `<data_dir>/config.json` when no path is given.
    ///
    /// An explicit path must exist. The default location is optional and
    /// falls back to built-in defaults.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = config_path();
                if default_path.exists() {
                    Self::from_file(&default_path)?
                } else {
                    Self::default()
                }
            }
        };

        config.validate()?;
        Ok(config)
    }

    fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        Ok(serde_json::from_str(&content)?)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.scan.interval_ms == 0 {
            return Err(ConfigError::Invalid(
                "scan.intervalMs must be greater than 0".to_string(),
            ));
        }
        if self.scan.concurrency == 0 {
            return Err(ConfigError::Invalid(
                "scan.concurrency must be greater than 0".to_string(),
            ));
        }
        Ok(())
    }

    /// Configured database path, or the default under the data directory
    pub fn db_path(&self) -> PathBuf {
        self.database.path.clone().unwrap_or_else(db_path)
    }
}

/// Returns the path to the data directory for evergreen.
/// Uses $XDG_DATA_HOME/evergreen if XDG_DATA_HOME is set,
/// otherwise falls back to ~/.local/share/evergreen,
/// or ./evergreen if neither is available.
pub fn data_dir() -> PathBuf {
    data_dir_with_env(std::env::var("XDG_DATA_HOME").ok(), dirs::home_dir())
}

/// Returns the default path to the database file.
pub fn db_path() -> PathBuf {
    data_dir().join("evergreen.db")
}

/// Returns the default path to the config file.
pub fn config_path() -> PathBuf {
    data_dir().join("config.json")
}

/// Returns the directory rolled log files are written to.
pub fn log_dir() -> PathBuf {
    data_dir().join("logs")
}

fn data_dir_with_env(xdg_data_home: Option<String>, home_dir: Option<PathBuf>) -> PathBuf {
    let data_dir = xdg_data_home
        .map(PathBuf::from)
        .or_else(|| home_dir.map(|home| home.join(".local/share")))
        .unwrap_or_else(|| PathBuf::from("."));

    data_dir.join(APP_DIR_NAME)
}

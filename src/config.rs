//! Engine configuration
//!
//! The data root and log filter are carried in an explicit value that is
//! handed to the engine at construction time.

use std::env;
use std::path::{Path, PathBuf};

/// Default data directory, relative to the working directory
pub const DEFAULT_DATA_DIR: &str = "data";

/// Default tracing filter used by the CLI
pub const DEFAULT_LOG_FILTER: &str = "csvdb=info";

/// Environment variable overriding the data directory
pub const DATA_DIR_ENV: &str = "CSVDB_DATA_DIR";

/// Engine configuration
#[derive(Debug, Clone)]
pub struct Config {
    /// Directory holding one sub-directory per table
    pub data_dir: PathBuf,
    /// Filter directive for the tracing subscriber
    pub log_filter: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_filter: DEFAULT_LOG_FILTER.to_string(),
        }
    }
}

impl Config {
    /// Create a config with default values
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a config from `CSVDB_DATA_DIR` and `RUST_LOG`, falling back to defaults
    pub fn from_env() -> Self {
        let mut config = Self::default();
        if let Ok(dir) = env::var(DATA_DIR_ENV) {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(filter) = env::var("RUST_LOG") {
            if !filter.trim().is_empty() {
                config.log_filter = filter;
            }
        }
        config
    }

    /// Set the data directory
    pub fn data_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.data_dir = dir.as_ref().to_path_buf();
        self
    }

    /// Set the log filter
    pub fn log_filter(mut self, filter: impl Into<String>) -> Self {
        self.log_filter = filter.into();
        self
    }
}

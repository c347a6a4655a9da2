//! Engine tunables.
//!
//! Every field has a sensible default, so most callers simply use
//! `EngineConfig::default()`. With the `config` feature enabled the values can also be
//! read from a TOML file (by default `<config_dir>/loglens/config.toml`), where every key
//! is optional:
//!
//! ```toml
//! follow = true
//! search_index = true
//! index_batch_size = 10000
//! settle_delay_ms = 50
//! poll_interval_ms = 500
//! ```

use std::path::PathBuf;
use std::time::Duration;

#[cfg(feature = "config")]
use crate::error::{LoglensError, Result};
#[cfg(feature = "config")]
use std::path::Path;

/// Default number of lines inserted into the search index per transaction
pub const DEFAULT_INDEX_BATCH_SIZE: usize = 10_000;

/// Default byte granularity for scan progress reports (10 MiB)
pub const DEFAULT_PROGRESS_GRANULARITY: u64 = 10 * 1024 * 1024;

/// Configuration for [`LogEngine`](crate::engine::LogEngine).
#[derive(Debug, Clone, PartialEq)]
pub struct EngineConfig {
    /// Number of non-blank lines sampled for format detection
    pub sample_lines: usize,

    /// Bytes consumed between two progress reports during the initial scan
    pub progress_granularity: u64,

    /// Lines per batch when bulk-loading the search index
    pub index_batch_size: usize,

    /// Build the auxiliary full-text index at all
    pub search_index: bool,

    /// Directory for the index store; `None` colocates it with the log file
    pub index_dir: Option<PathBuf>,

    /// Start in follow mode
    pub follow: bool,

    /// Delay between a growth signal and re-stating the file
    pub settle_delay: Duration,

    /// Interval of the secondary, poll-based growth signal
    pub poll_interval: Duration,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            sample_lines: 10,
            progress_granularity: DEFAULT_PROGRESS_GRANULARITY,
            index_batch_size: DEFAULT_INDEX_BATCH_SIZE,
            search_index: true,
            index_dir: None,
            follow: false,
            settle_delay: Duration::from_millis(50),
            poll_interval: Duration::from_millis(500),
        }
    }
}

/// On-disk representation; every key is optional and falls back to the default.
#[cfg(feature = "config")]
#[derive(Debug, Default, serde::Deserialize)]
#[serde(default, deny_unknown_fields)]
struct ConfigFile {
    sample_lines: Option<usize>,
    progress_granularity: Option<u64>,
    index_batch_size: Option<usize>,
    search_index: Option<bool>,
    index_dir: Option<PathBuf>,
    follow: Option<bool>,
    settle_delay_ms: Option<u64>,
    poll_interval_ms: Option<u64>,
}

#[cfg(feature = "config")]
impl EngineConfig {
    /// Parse a configuration from TOML text
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let file: ConfigFile =
            toml::from_str(text).map_err(|e| LoglensError::config(e.to_string()))?;
        let defaults = Self::default();

        let config = Self {
            sample_lines: file.sample_lines.unwrap_or(defaults.sample_lines),
            progress_granularity: file
                .progress_granularity
                .unwrap_or(defaults.progress_granularity),
            index_batch_size: file.index_batch_size.unwrap_or(defaults.index_batch_size),
            search_index: file.search_index.unwrap_or(defaults.search_index),
            index_dir: file.index_dir.or(defaults.index_dir),
            follow: file.follow.unwrap_or(defaults.follow),
            settle_delay: file
                .settle_delay_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.settle_delay),
            poll_interval: file
                .poll_interval_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.poll_interval),
        };
        config.validate()?;
        Ok(config)
    }

    /// Load a configuration file from an explicit path
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path).map_err(|e| {
            LoglensError::file_error(format!("Failed to read config: {}", path.display()), e)
        })?;
        Self::from_toml_str(&text)
    }

    /// Load `<config_dir>/loglens/config.toml`, or defaults when it does not exist
    pub fn load_default() -> Result<Self> {
        match dirs::config_dir().map(|dir| dir.join("loglens").join("config.toml")) {
            Some(path) if path.is_file() => Self::load(&path),
            _ => Ok(Self::default()),
        }
    }

    fn validate(&self) -> Result<()> {
        if self.index_batch_size == 0 {
            return Err(LoglensError::config("index_batch_size must be at least 1"));
        }
        if self.poll_interval.is_zero() {
            return Err(LoglensError::config("poll_interval_ms must be at least 1"));
        }
        Ok(())
    }
}

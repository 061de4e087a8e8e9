//! Configuration file parser for `castdrop.toml`.
//!
//! The config file is optional: a missing file yields `Config::default()`.
//! Unknown keys are ignored by serde, though we log a warning for each so
//! typos do not go unnoticed.
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;
use thiserror::Error;

use crate::util::validate_base_url;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Config file too large: {0}")]
    TooLarge(String),

    #[error("Invalid config value for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level application configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Base URL the podcast directory is served from. Feed URLs are built by
    /// joining this with the stored relative locations.
    pub static_content_url: String,

    /// SQLite catalog database file.
    pub database_path: PathBuf,

    /// Directory watched for import task submissions.
    pub pull_dir: PathBuf,

    /// Root of the canonical media layout and the per-podcast feed files.
    pub podcast_dir: PathBuf,

    /// Minutes between scheduled import batches.
    pub import_interval_minutes: u64,

    /// Maximum number of feeds regenerated at once after a batch.
    pub feed_concurrency: usize,

    /// Upper bound for a single file move or directory operation.
    pub io_timeout_secs: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            static_content_url: "http://127.0.0.1:8000".to_string(),
            database_path: PathBuf::from("castdrop.db"),
            pull_dir: PathBuf::from("pull"),
            podcast_dir: PathBuf::from("podcasts"),
            import_interval_minutes: 10,
            feed_concurrency: 4,
            io_timeout_secs: 30,
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    const KNOWN_KEYS: [&'static str; 7] = [
        "static_content_url",
        "database_path",
        "pull_dir",
        "podcast_dir",
        "import_interval_minutes",
        "feed_concurrency",
        "io_timeout_secs",
    ];

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → accepted, logged as warning
    /// - Out-of-range values → `Err(ConfigError::Invalid)`
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        match std::fs::metadata(path) {
            Ok(meta) if meta.len() > Self::MAX_FILE_SIZE => {
                return Err(ConfigError::TooLarge(format!(
                    "Config file is {} bytes (max {} bytes)",
                    meta.len(),
                    Self::MAX_FILE_SIZE
                )));
            }
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::debug!(path = %path.display(), "No config file found, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
            Ok(_) => {}
        }

        let content = match std::fs::read_to_string(path) {
            Ok(c) => c,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                // Deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        if let Ok(raw) = content.parse::<toml::Table>() {
            for key in raw.keys() {
                if !Self::KNOWN_KEYS.contains(&key.as_str()) {
                    tracing::warn!(key = %key, "Unknown key in config file, ignoring");
                }
            }
        }

        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        tracing::info!(
            path = %path.display(),
            pull_dir = %config.pull_dir.display(),
            podcast_dir = %config.podcast_dir.display(),
            "Loaded configuration"
        );
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        validate_base_url(&self.static_content_url).map_err(|e| ConfigError::Invalid {
            key: "static_content_url",
            reason: e.to_string(),
        })?;
        if self.import_interval_minutes == 0 {
            return Err(ConfigError::Invalid {
                key: "import_interval_minutes",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.feed_concurrency == 0 {
            return Err(ConfigError::Invalid {
                key: "feed_concurrency",
                reason: "must be at least 1".to_string(),
            });
        }
        if self.io_timeout_secs == 0 {
            return Err(ConfigError::Invalid {
                key: "io_timeout_secs",
                reason: "must be at least 1".to_string(),
            });
        }
        Ok(())
    }

    pub fn import_interval(&self) -> Duration {
        Duration::from_secs(self.import_interval_minutes * 60)
    }

    pub fn io_timeout(&self) -> Duration {
        Duration::from_secs(self.io_timeout_secs)
    }
}

// ============================================================================
// Tests
// ============================================================================

//! Configuration file parser for newswire.toml.
//!
//! The config file is optional; a missing file yields `Config::default()`
//! (useful for tests and local smoke runs, where the registry is built in
//! code). Unknown keys are silently ignored by serde so a config written for
//! a newer build still loads.
use serde::Deserialize;
use std::path::Path;
use thiserror::Error;

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Invalid TOML in config file: {0}")]
    Parse(#[from] toml::de::Error),

    /// Config file exceeds maximum allowed size.
    #[error("Config file too large: {0}")]
    TooLarge(String),
}

// ============================================================================
// Configuration Structs
// ============================================================================

/// Top-level service configuration.
///
/// All fields use `#[serde(default)]` so any subset of keys can be specified.
/// Missing keys fall back to `Default::default()`.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Address the HTTP trigger endpoint binds to.
    pub bind: String,

    /// Path to the SQLite database file.
    pub database_path: String,

    /// Age in days past which persisted articles are purged.
    pub retention_days: i64,

    /// Per-request timeout for feed fetches, in seconds.
    pub fetch_timeout_secs: u64,

    /// Number of feeds fetched and processed concurrently.
    pub fetch_concurrency: usize,

    /// The publisher feed registry. Deployment-time state: changing it means
    /// editing this file and redeploying, never a request parameter.
    pub publishers: Vec<PublisherConfig>,
}

/// One publisher entry in the feed registry.
#[derive(Debug, Clone, Deserialize)]
pub struct PublisherConfig {
    /// Display name, copied verbatim onto every article.
    pub name: String,
    /// Stable identifier used by downstream consumers of the store.
    pub slug: String,
    /// One or more RSS/Atom feed URLs, processed in order.
    pub feeds: Vec<String>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            bind: "127.0.0.1:8080".to_string(),
            database_path: "newswire.db".to_string(),
            retention_days: 90,
            fetch_timeout_secs: 15,
            fetch_concurrency: 4,
            publishers: Vec::new(),
        }
    }
}

impl Config {
    /// Maximum config file size (1 MB).
    const MAX_FILE_SIZE: u64 = 1_048_576;

    /// Load configuration from a TOML file.
    ///
    /// - Missing file → `Ok(Config::default())`
    /// - Empty file → `Ok(Config::default())`
    /// - Invalid TOML → `Err(ConfigError::Parse)` with line number info
    /// - Unknown keys → silently accepted (serde default behavior)
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        // Check file size before reading so a corrupted or runaway file
        // cannot exhaust memory.
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
                // Race condition: file deleted between metadata and read
                tracing::debug!(path = %path.display(), "Config file disappeared, using defaults");
                return Ok(Self::default());
            }
            Err(e) => return Err(ConfigError::Io(e)),
        };

        if content.trim().is_empty() {
            tracing::debug!(path = %path.display(), "Config file is empty, using defaults");
            return Ok(Self::default());
        }

        let config: Config = toml::from_str(&content)?;
        tracing::info!(
            path = %path.display(),
            publishers = config.publishers.len(),
            "Loaded configuration"
        );
        Ok(config)
    }
}

// ============================================================================
// Tests
// ============================================================================

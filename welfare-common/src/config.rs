//! Configuration loading and config file resolution
//!
//! Bootstrap configuration lives in a small TOML file. Every field has a
//! built-in default, so a missing file is never fatal: the loader warns and
//! carries on with defaults.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Built-in defaults (code constants)
//!
//! This module handles tiers 3 and 4; callers layer CLI and environment on top.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Environment variable overriding the config file location
pub const CONFIG_PATH_ENV: &str = "WELFARE_CONFIG";

/// Records sent per chunk request
pub const DEFAULT_CHUNK_SIZE: u32 = 50;

/// Pause between two chunk requests (milliseconds)
pub const DEFAULT_INTER_CHUNK_DELAY_MS: u64 = 500;

/// Status poll period while processing (milliseconds)
pub const DEFAULT_STATUS_POLL_INTERVAL_MS: u64 = 2000;

/// Largest spreadsheet accepted for upload (20 MiB)
pub const DEFAULT_MAX_FILE_SIZE_BYTES: u64 = 20 * 1024 * 1024;

/// Consecutive non-advancing chunk responses tolerated before aborting
pub const DEFAULT_MAX_STALLED_CHUNKS: u32 = 3;

/// Bootstrap configuration loaded from TOML file
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// Bulk Import Service connection settings
    #[serde(default)]
    pub service: ServiceConfig,

    /// Import pipeline tuning
    #[serde(default)]
    pub import: ImportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Bulk Import Service connection settings
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ServiceConfig {
    /// Base URL of the REST backend (e.g. `http://localhost:8000/api`)
    #[serde(default)]
    pub base_url: Option<String>,

    /// Per-request timeout. Unset means the transport default (no timeout).
    #[serde(default)]
    pub request_timeout_secs: Option<u64>,
}

/// Import pipeline tuning
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImportConfig {
    #[serde(default = "default_chunk_size")]
    pub chunk_size: u32,

    #[serde(default = "default_inter_chunk_delay_ms")]
    pub inter_chunk_delay_ms: u64,

    /// 0 disables status polling
    #[serde(default = "default_status_poll_interval_ms")]
    pub status_poll_interval_ms: u64,

    #[serde(default = "default_max_file_size_bytes")]
    pub max_file_size_bytes: u64,

    #[serde(default = "default_max_stalled_chunks")]
    pub max_stalled_chunks: u32,
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

fn default_chunk_size() -> u32 {
    DEFAULT_CHUNK_SIZE
}

fn default_inter_chunk_delay_ms() -> u64 {
    DEFAULT_INTER_CHUNK_DELAY_MS
}

fn default_status_poll_interval_ms() -> u64 {
    DEFAULT_STATUS_POLL_INTERVAL_MS
}

fn default_max_file_size_bytes() -> u64 {
    DEFAULT_MAX_FILE_SIZE_BYTES
}

fn default_max_stalled_chunks() -> u32 {
    DEFAULT_MAX_STALLED_CHUNKS
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Default for ImportConfig {
    fn default() -> Self {
        Self {
            chunk_size: DEFAULT_CHUNK_SIZE,
            inter_chunk_delay_ms: DEFAULT_INTER_CHUNK_DELAY_MS,
            status_poll_interval_ms: DEFAULT_STATUS_POLL_INTERVAL_MS,
            max_file_size_bytes: DEFAULT_MAX_FILE_SIZE_BYTES,
            max_stalled_chunks: DEFAULT_MAX_STALLED_CHUNKS,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

impl ImportConfig {
    /// Reject values the import pipeline cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.chunk_size == 0 {
            return Err(Error::Config("import.chunk_size must be at least 1".to_string()));
        }
        if self.max_file_size_bytes == 0 {
            return Err(Error::Config(
                "import.max_file_size_bytes must be at least 1".to_string(),
            ));
        }
        if self.max_stalled_chunks == 0 {
            return Err(Error::Config(
                "import.max_stalled_chunks must be at least 1".to_string(),
            ));
        }
        Ok(())
    }
}

/// Resolve the TOML config file location
///
/// Priority: explicit path → `WELFARE_CONFIG` → `<config dir>/welfare/<module>.toml`
pub fn resolve_config_path(cli_path: Option<&Path>, module_name: &str) -> Result<PathBuf> {
    if let Some(path) = cli_path {
        return Ok(path.to_path_buf());
    }

    if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
        if !path.trim().is_empty() {
            return Ok(PathBuf::from(path));
        }
    }

    dirs::config_dir()
        .map(|d| d.join("welfare").join(format!("{}.toml", module_name)))
        .ok_or_else(|| Error::Config("Could not determine config directory".to_string()))
}

/// Load TOML config, falling back to defaults when the file is missing
///
/// A file that exists but does not parse is an error: silently ignoring a
/// typo in a hand-edited file hides misconfiguration.
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    if !path.exists() {
        warn!(
            "Config file not found at {}, using built-in defaults",
            path.display()
        );
        return Ok(TomlConfig::default());
    }

    let content = std::fs::read_to_string(path)?;
    let config: TomlConfig = toml::from_str(&content)?;
    config.import.validate()?;

    info!("Loaded configuration from {}", path.display());
    Ok(config)
}

/// Write TOML config atomically (temp file + rename)
///
/// On Unix the file is created with 0600 permissions.
pub fn write_toml_config(config: &TomlConfig, path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }

    let content = toml::to_string_pretty(config)?;

    let file_name = path
        .file_name()
        .ok_or_else(|| Error::InvalidInput(format!("Not a file path: {}", path.display())))?;
    let mut temp_name = file_name.to_os_string();
    temp_name.push(".tmp");
    let temp_path = path.with_file_name(temp_name);

    std::fs::write(&temp_path, content)?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::PermissionsExt;
        std::fs::set_permissions(&temp_path, std::fs::Permissions::from_mode(0o600))?;
    }

    if let Err(e) = std::fs::rename(&temp_path, path) {
        let _ = std::fs::remove_file(&temp_path);
        return Err(e.into());
    }

    debug!("Wrote configuration to {}", path.display());
    Ok(())
}

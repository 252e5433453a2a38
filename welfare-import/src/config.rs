//! Configuration resolution for welfare-import
//!
//! Provides multi-tier configuration resolution with CLI → ENV → TOML →
//! default priority on top of `welfare_common::config`.

use std::time::Duration;
use tracing::{info, warn};
use welfare_common::config::{ImportConfig, TomlConfig};
use welfare_common::{Error, Result};

/// Module name, used for the default config file name
pub const MODULE_NAME: &str = "welfare-import";

/// Environment variable holding the Bulk Import Service base URL
pub const SERVICE_URL_ENV: &str = "WELFARE_SERVICE_URL";

/// Runtime settings for the import coordinator
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportSettings {
    /// Records per chunk request
    pub chunk_size: u32,
    /// Pause between chunk requests
    pub inter_chunk_delay: Duration,
    /// Status poll period while processing; zero disables polling
    pub status_poll_interval: Duration,
    /// Upload ceiling (inclusive)
    pub max_file_size_bytes: u64,
    /// Non-advancing chunk responses tolerated in a row
    pub max_stalled_chunks: u32,
}

impl From<&ImportConfig> for ImportSettings {
    fn from(config: &ImportConfig) -> Self {
        Self {
            chunk_size: config.chunk_size,
            inter_chunk_delay: Duration::from_millis(config.inter_chunk_delay_ms),
            status_poll_interval: Duration::from_millis(config.status_poll_interval_ms),
            max_file_size_bytes: config.max_file_size_bytes,
            max_stalled_chunks: config.max_stalled_chunks,
        }
    }
}

impl Default for ImportSettings {
    fn default() -> Self {
        Self::from(&ImportConfig::default())
    }
}

impl ImportSettings {
    /// Settings from TOML with an optional CLI chunk size override
    pub fn resolve(toml_config: &TomlConfig, cli_chunk_size: Option<u32>) -> Result<Self> {
        let mut settings = Self::from(&toml_config.import);

        if let Some(chunk_size) = cli_chunk_size {
            if chunk_size == 0 {
                return Err(Error::InvalidInput("--chunk-size must be at least 1".to_string()));
            }
            settings.chunk_size = chunk_size;
        }

        Ok(settings)
    }
}

/// Resolve the Bulk Import Service base URL
///
/// **Priority:** CLI → ENV (`WELFARE_SERVICE_URL`) → TOML `service.base_url`
pub fn resolve_service_url(cli_url: Option<&str>, toml_config: &TomlConfig) -> Result<String> {
    let env_url = std::env::var(SERVICE_URL_ENV).ok();
    resolve_service_url_from(cli_url, env_url.as_deref(), toml_config)
}

fn resolve_service_url_from(
    cli_url: Option<&str>,
    env_url: Option<&str>,
    toml_config: &TomlConfig,
) -> Result<String> {
    let candidates = [
        ("command line", cli_url),
        ("environment", env_url),
        ("TOML", toml_config.service.base_url.as_deref()),
    ];

    let sources: Vec<&str> = candidates
        .iter()
        .filter(|(_, value)| value.map(is_valid_url).unwrap_or(false))
        .map(|(source, _)| *source)
        .collect();

    if sources.len() > 1 {
        warn!(
            "Service URL found in multiple sources: {}. Using {} (highest priority).",
            sources.join(", "),
            sources[0]
        );
    }

    for (source, value) in candidates {
        if let Some(url) = value {
            if is_valid_url(url) {
                info!("Service URL loaded from {}", source);
                return Ok(url.trim().to_string());
            }
        }
    }

    Err(Error::Config(format!(
        "Bulk Import Service URL not configured. Please configure using one of:\n\
         1. Command line: --service-url http://host:port/api\n\
         2. Environment: {}=http://host:port/api\n\
         3. TOML config: [service] base_url = \"http://host:port/api\"",
        SERVICE_URL_ENV
    )))
}

/// Validate URL candidate (non-empty, non-whitespace)
pub fn is_valid_url(url: &str) -> bool {
    !url.trim().is_empty()
}

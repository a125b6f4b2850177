//! Configuration loading from disk.

use std::fs;
use std::path::Path;

use thiserror::Error;
use url::Url;

use crate::config::schema::ProxyConfig;

/// Error type for configuration loading. Misconfiguration here is the only
/// condition that halts the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("parse error: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("invalid backend url {url:?}: {reason}")]
    InvalidBackend { url: String, reason: String },

    #[error("no backends configured")]
    NoBackends,
}

/// Load and validate configuration from a TOML file.
pub fn load_config(path: &Path) -> Result<ProxyConfig, ConfigError> {
    let content = fs::read_to_string(path)?;
    let config: ProxyConfig = toml::from_str(&content)?;
    validate_config(&config)?;
    Ok(config)
}

/// Semantic validation: serde covers the syntax, this covers meaning.
pub fn validate_config(config: &ProxyConfig) -> Result<(), ConfigError> {
    if config.backends.is_empty() {
        return Err(ConfigError::NoBackends);
    }
    for raw in &config.backends {
        parse_backend_url(raw)?;
    }
    Ok(())
}

/// Parse one backend base URL, requiring a host to probe and dial.
pub fn parse_backend_url(raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidBackend {
        url: raw.to_string(),
        reason: e.to_string(),
    })?;
    if url.host_str().is_none() {
        return Err(ConfigError::InvalidBackend {
            url: raw.to_string(),
            reason: "missing host".to_string(),
        });
    }
    Ok(url)
}

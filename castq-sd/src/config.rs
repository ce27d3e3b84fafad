//! Runtime configuration for castq-sd
//!
//! Resolves the bootstrap TOML (see `castq_common::config`) and applies
//! command-line overrides on top of it.
//!
//! # Settings Sources Priority
//!
//! 1. Command-line arguments (`--port`, `--endpoint`, ...; clap also reads
//!    `CASTQ_PORT`, `CASTQ_ENDPOINT`, `CASTQ_CONTEXT_ID`)
//! 2. TOML configuration file (`--config` / `CASTQ_CONFIG` / platform default)
//! 3. Built-in defaults

use castq_common::config::{ConfigResolver, TomlConfig};
use std::path::PathBuf;
use std::time::Duration;

use crate::error::{Error, Result};
use crate::scheduler::SessionSettings;

/// Values that override the TOML file
#[derive(Debug, Clone, Default)]
pub struct Overrides {
    pub port: Option<u16>,
    pub endpoint: Option<String>,
    pub context_id: Option<String>,
    pub media_dir: Option<PathBuf>,
}

/// Fully resolved daemon configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub port: u16,
    pub media_dir: PathBuf,
    pub context_id: Option<String>,
    pub settings: SessionSettings,
    pub poll_interval: Duration,
    pub request_timeout: Duration,
    pub unconfigured_retry: Duration,
    pub settle_delay: Duration,
    /// Log level from the TOML `[logging]` table
    pub log_level: String,
}

impl Config {
    /// Load the TOML file (gracefully) and apply overrides
    pub fn load(config_path: Option<PathBuf>, overrides: Overrides) -> Result<Self> {
        let toml = ConfigResolver::new(config_path).load();
        Self::from_toml(toml, overrides)
    }

    /// Build from an already parsed TOML config
    pub fn from_toml(mut toml: TomlConfig, overrides: Overrides) -> Result<Self> {
        if let Some(port) = overrides.port {
            toml.port = port;
        }
        if let Some(endpoint) = overrides.endpoint {
            toml.source.endpoint = Some(endpoint);
        }
        if let Some(context_id) = overrides.context_id {
            toml.session.context_id = Some(context_id);
        }
        if let Some(media_dir) = overrides.media_dir {
            toml.media_dir = Some(media_dir);
        }

        if toml.source.poll_interval_ms == 0 {
            return Err(Error::Config("source.poll_interval_ms must be greater than 0".to_string()));
        }
        if toml.source.request_timeout_ms == 0 {
            return Err(Error::Config("source.request_timeout_ms must be greater than 0".to_string()));
        }
        if let Some(endpoint) = toml.source.endpoint.as_deref() {
            let endpoint = endpoint.trim();
            if !endpoint.is_empty() && !(endpoint.starts_with("http://") || endpoint.starts_with("https://")) {
                return Err(Error::Config(format!(
                    "source.endpoint must be an http(s) URL, got '{}'",
                    endpoint
                )));
            }
        }

        Ok(Self {
            port: toml.port,
            media_dir: toml.media_dir(),
            context_id: toml.session.context_id.clone(),
            settings: SessionSettings::from_config(&toml),
            poll_interval: Duration::from_millis(toml.source.poll_interval_ms),
            request_timeout: Duration::from_millis(toml.source.request_timeout_ms),
            unconfigured_retry: Duration::from_millis(toml.source.unconfigured_retry_ms.max(1)),
            settle_delay: Duration::from_millis(toml.playback.settle_delay_ms),
            log_level: toml.logging.level.clone(),
        })
    }
}

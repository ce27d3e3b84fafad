//! Bootstrap configuration loading
//!
//! Configuration sources, highest priority first:
//! 1. Command-line arguments (applied by the binary)
//! 2. Environment variables
//! 3. TOML config file
//! 4. Compiled defaults
//!
//! A missing config file is not an error: a warning is logged and compiled
//! defaults are used, so the daemon always starts.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "CASTQ_CONFIG";

/// Default HTTP port for the scheduler daemon
pub const DEFAULT_PORT: u16 = 5760;

/// Full TOML configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TomlConfig {
    /// HTTP server port
    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory where manually injected media is stored and served from
    #[serde(default)]
    pub media_dir: Option<PathBuf>,

    #[serde(default)]
    pub source: SourceConfig,

    #[serde(default)]
    pub session: SessionConfig,

    #[serde(default)]
    pub playback: PlaybackConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for TomlConfig {
    fn default() -> Self {
        Self {
            port: DEFAULT_PORT,
            media_dir: None,
            source: SourceConfig::default(),
            session: SessionConfig::default(),
            playback: PlaybackConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// Remote event source settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SourceConfig {
    /// Commentary endpoint; polling idles until this is set
    #[serde(default)]
    pub endpoint: Option<String>,

    /// Delay between the end of one poll and the start of the next
    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Hard timeout for a single poll or chat request
    #[serde(default = "default_request_timeout_ms")]
    pub request_timeout_ms: u64,

    /// Every Nth poll asks the source to refresh its expensive upstream data
    #[serde(default = "default_full_poll_every")]
    pub full_poll_every: u64,

    /// Retry delay while the endpoint or context id is missing
    #[serde(default = "default_unconfigured_retry_ms")]
    pub unconfigured_retry_ms: u64,
}

impl Default for SourceConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            poll_interval_ms: default_poll_interval_ms(),
            request_timeout_ms: default_request_timeout_ms(),
            full_poll_every: default_full_poll_every(),
            unconfigured_retry_ms: default_unconfigured_retry_ms(),
        }
    }
}

/// Initial session settings (all mutable at runtime)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SessionConfig {
    /// Match/context to broadcast at startup
    #[serde(default)]
    pub context_id: Option<String>,

    /// Commentator persona forwarded to the source
    #[serde(default = "default_persona")]
    pub persona: String,

    /// Statistics provider selector forwarded to the source
    #[serde(default = "default_data_provider")]
    pub data_provider: String,

    #[serde(default = "default_auto_play")]
    pub auto_play: bool,

    /// Opaque credential material forwarded with every request
    #[serde(default)]
    pub credentials: BTreeMap<String, String>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            context_id: None,
            persona: default_persona(),
            data_provider: default_data_provider(),
            auto_play: default_auto_play(),
            credentials: BTreeMap::new(),
        }
    }
}

/// Playback driver settings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlaybackConfig {
    /// Pause before starting a new media item to avoid clipping
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self {
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_port() -> u16 {
    DEFAULT_PORT
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_request_timeout_ms() -> u64 {
    8000
}

fn default_full_poll_every() -> u64 {
    5
}

fn default_unconfigured_retry_ms() -> u64 {
    250
}

fn default_persona() -> String {
    "classic".to_string()
}

fn default_data_provider() -> String {
    "default".to_string()
}

fn default_auto_play() -> bool {
    true
}

fn default_settle_delay_ms() -> u64 {
    500
}

fn default_log_level() -> String {
    "info".to_string()
}

impl TomlConfig {
    /// Parse configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        Ok(toml::from_str(content)?)
    }

    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config = Self::from_toml_str(&content)
            .map_err(|e| Error::Config(format!("{}: {}", path.display(), e)))?;
        info!("Loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Compiled defaults (no file present)
    pub fn compiled_defaults() -> Self {
        Self::default()
    }

    /// Media directory, falling back to the platform data directory
    pub fn media_dir(&self) -> PathBuf {
        self.media_dir.clone().unwrap_or_else(default_media_dir)
    }
}

/// Locates and loads the config file with graceful degradation
#[derive(Debug, Clone)]
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    /// `cli_path` is the `--config` argument, if any
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Config file path: CLI argument, then `CASTQ_CONFIG`, then the
    /// platform config directory (`<config_dir>/castq/config.toml`)
    pub fn config_path(&self) -> Option<PathBuf> {
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }
        if let Ok(path) = std::env::var(CONFIG_ENV_VAR) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }
        default_config_path()
    }

    /// Load the resolved config file, falling back to compiled defaults
    ///
    /// Never fails on a missing file; a file that exists but does not parse
    /// is also reported and replaced by defaults.
    pub fn load(&self) -> TomlConfig {
        let Some(path) = self.config_path() else {
            warn!("No configuration directory available, using compiled defaults");
            return TomlConfig::compiled_defaults();
        };

        if !path.exists() {
            warn!("Config file {} not found, using compiled defaults", path.display());
            return TomlConfig::compiled_defaults();
        }

        match TomlConfig::load(&path) {
            Ok(config) => config,
            Err(e) => {
                warn!("Failed to load config ({}), using compiled defaults", e);
                TomlConfig::compiled_defaults()
            }
        }
    }
}

/// Default config file location for the platform
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("castq").join("config.toml"))
}

/// Default directory for injected media
pub fn default_media_dir() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("castq").join("media"))
        .unwrap_or_else(|| std::env::temp_dir().join("castq-media"))
}

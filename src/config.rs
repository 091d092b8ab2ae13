//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.
//! Configuration is fixed at startup; there is no reload.

use serde::Deserialize;
use std::num::NonZeroUsize;
use std::path::{Path, PathBuf};

use crate::frame::parse_identifier;
use crate::ingest::{FilterSettings, MonitorConfig};
use crate::telemetry::DEFAULT_LOG_CAPACITY;
use crate::websocket::HubConfig;

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub bus: BusConfig,

    #[serde(default)]
    pub filter: FilterConfig,

    #[serde(default)]
    pub stats: StatsConfig,

    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// CAN bus configuration
#[derive(Debug, Clone, Deserialize)]
pub struct BusConfig {
    #[serde(default = "default_interface")]
    pub interface: String,

    /// Frames buffered between the reader thread and the ingestion task
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,
}

fn default_interface() -> String {
    "can0".to_string()
}

fn default_channel_capacity() -> usize {
    1024
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            interface: default_interface(),
            channel_capacity: default_channel_capacity(),
        }
    }
}

/// Filtered log configuration
#[derive(Debug, Clone, Deserialize)]
pub struct FilterConfig {
    #[serde(default = "default_filter_enabled")]
    pub enabled: bool,

    /// Lowest logged identifier (inclusive)
    #[serde(default = "default_min_id")]
    pub min_id: u32,

    /// Highest logged identifier (inclusive)
    #[serde(default = "default_max_id")]
    pub max_id: u32,

    /// Maximum number of log entries kept
    #[serde(default = "default_capacity")]
    pub capacity: usize,
}

fn default_filter_enabled() -> bool {
    true
}

fn default_min_id() -> u32 {
    0x700
}

fn default_max_id() -> u32 {
    0x77F
}

fn default_capacity() -> usize {
    DEFAULT_LOG_CAPACITY
}

impl Default for FilterConfig {
    fn default() -> Self {
        Self {
            enabled: default_filter_enabled(),
            min_id: default_min_id(),
            max_id: default_max_id(),
            capacity: default_capacity(),
        }
    }
}

/// Identifier statistics configuration
#[derive(Debug, Clone, Default, Deserialize)]
pub struct StatsConfig {
    /// Also push the number of distinct identifiers when it changes
    #[serde(default)]
    pub unique_id_count: bool,
}

/// HTTP / WebSocket server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory served for non-API requests
    #[serde(default = "default_static_dir")]
    pub static_dir: PathBuf,

    /// `Cache-Control` max-age for static files
    #[serde(default = "default_static_max_age")]
    pub static_max_age_secs: u64,

    #[serde(default = "default_max_observers")]
    pub max_observers: usize,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> PathBuf {
    PathBuf::from("./public")
}

fn default_static_max_age() -> u64 {
    86_400 // 1 day
}

fn default_max_observers() -> usize {
    1000
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            static_max_age_secs: default_static_max_age(),
            max_observers: default_max_observers(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::Parse {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Ok(config)
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_env_overrides();
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Load from default locations or environment
    pub fn load_default() -> Self {
        let config_paths: Vec<PathBuf> = [
            dirs::config_dir().map(|p| p.join("canscope").join("config.toml")),
            Some(PathBuf::from("/etc/canscope/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ]
        .into_iter()
        .flatten()
        .collect();

        Self::load_first(&config_paths)
    }

    /// Load the first existing file that parses, skipping broken ones
    fn load_first(paths: &[PathBuf]) -> Self {
        for path in paths {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return config;
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Self::from_env()
    }

    /// Check cross-field constraints
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.bus.interface.is_empty() {
            return Err(ConfigError::Invalid("bus.interface must not be empty".into()));
        }
        if self.bus.channel_capacity == 0 {
            return Err(ConfigError::Invalid("bus.channel_capacity must be positive".into()));
        }
        if self.filter.capacity == 0 {
            return Err(ConfigError::Invalid("filter.capacity must be positive".into()));
        }
        if self.filter.min_id > self.filter.max_id {
            return Err(ConfigError::Invalid(format!(
                "filter.min_id (0x{:X}) is greater than filter.max_id (0x{:X})",
                self.filter.min_id, self.filter.max_id
            )));
        }
        if self.server.max_observers == 0 {
            return Err(ConfigError::Invalid("server.max_observers must be positive".into()));
        }
        Ok(())
    }

    /// Build the monitor capabilities described by this config
    pub fn monitor_config(&self) -> Result<MonitorConfig, ConfigError> {
        self.validate()?;

        let filter = if self.filter.enabled {
            let capacity = NonZeroUsize::new(self.filter.capacity)
                .ok_or_else(|| ConfigError::Invalid("filter.capacity must be positive".into()))?;
            Some(FilterSettings {
                range: self.filter.min_id..=self.filter.max_id,
                capacity,
            })
        } else {
            None
        };

        Ok(MonitorConfig {
            filter,
            unique_id_count: self.stats.unique_id_count,
            hub: HubConfig {
                max_observers: self.server.max_observers,
            },
        })
    }

    /// Apply environment variable overrides to an existing config
    fn apply_env_overrides(&mut self) {
        self.apply_overrides(|key| std::env::var(key).ok());
    }

    fn apply_overrides(&mut self, var: impl Fn(&str) -> Option<String>) {
        // Bus overrides
        if let Some(interface) = var("CANSCOPE_INTERFACE") {
            self.bus.interface = interface;
        }

        // Filter overrides
        if let Some(enabled) = var("CANSCOPE_FILTER_ENABLED") {
            self.filter.enabled = enabled.to_lowercase() != "false" && enabled != "0";
        }
        if let Some(min) = override_value(&var, "CANSCOPE_FILTER_MIN", parse_identifier) {
            self.filter.min_id = min;
        }
        if let Some(max) = override_value(&var, "CANSCOPE_FILTER_MAX", parse_identifier) {
            self.filter.max_id = max;
        }
        if let Some(capacity) = override_value(&var, "CANSCOPE_LOG_CAPACITY", |v| v.parse().ok()) {
            self.filter.capacity = capacity;
        }

        // Server overrides
        if let Some(host) = var("CANSCOPE_HOST") {
            self.server.host = host;
        }
        if let Some(port) = override_value(&var, "CANSCOPE_PORT", |v| v.parse().ok()) {
            self.server.port = port;
        }
        if let Some(dir) = var("CANSCOPE_STATIC_DIR") {
            self.server.static_dir = PathBuf::from(dir);
        }

        // Logging overrides
        if let Some(level) = var("CANSCOPE_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = var("CANSCOPE_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Look up and parse one override; unparsable values are ignored with a warning
fn override_value<T>(
    var: impl Fn(&str) -> Option<String>,
    key: &str,
    parse: impl FnOnce(&str) -> Option<T>,
) -> Option<T> {
    let value = var(key)?;
    let parsed = parse(value.trim());
    if parsed.is_none() {
        tracing::warn!("Ignoring {}={:?}: invalid value", key, value);
    }
    parsed
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },

    #[error("Invalid configuration: {0}")]
    Invalid(String),
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# canscope Configuration
#
# Environment variables override these settings:
# - CANSCOPE_INTERFACE
# - CANSCOPE_FILTER_ENABLED
# - CANSCOPE_FILTER_MIN / CANSCOPE_FILTER_MAX (decimal or 0x-prefixed hex)
# - CANSCOPE_LOG_CAPACITY
# - CANSCOPE_HOST
# - CANSCOPE_PORT
# - CANSCOPE_STATIC_DIR
# - CANSCOPE_LOG_LEVEL
# - CANSCOPE_LOG_FORMAT

[bus]
# CAN interface to listen on (e.g. can0, vcan0)
interface = "can0"

# Frames buffered between the bus reader and the aggregator
channel_capacity = 1024

[filter]
# Keep a log of recent frames inside the identifier range below
enabled = true

# Inclusive identifier range
min_id = 0x700
max_id = 0x77F

# Number of log entries kept (oldest evicted first)
capacity = 50

[stats]
# Also push the number of distinct identifiers when a new one appears
unique_id_count = false

[server]
# Server host
host = "0.0.0.0"

# Server port (HTTP and WebSocket)
port = 3000

# Directory with the dashboard's HTML/JS/CSS
static_dir = "./public"

# Cache-Control max-age for static files (seconds)
static_max_age_secs = 86400

# Maximum concurrent WebSocket clients
max_observers = 1000

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

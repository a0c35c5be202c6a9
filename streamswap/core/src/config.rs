//! TOML Configuration File Support
//!
//! Configuration for hosts embedding the controller, loaded from an optional
//! TOML file at `~/.config/streamswap/streamswap.toml`.
//!
//! # Configuration Priority
//!
//! Configuration values are loaded with the following priority (highest first):
//! 1. CLI arguments (via [`ConfigOverrides`])
//! 2. Environment variables
//! 3. TOML configuration file
//! 4. Default values
//!
//! # XDG Base Directory Compliance
//!
//! - `$XDG_CONFIG_HOME/streamswap/streamswap.toml` (typically `~/.config/streamswap/streamswap.toml`)
//!
//! # Example Configuration
//!
//! ```toml
//! [http]
//! connect_timeout_ms = 5000
//! user_agent = "streamswap/0.1"
//!
//! [http.headers]
//! X-Client = "terminal"
//!
//! [streaming]
//! extension_name = "streaming-html"
//! flush_trailing_bytes = true
//! ```

use std::collections::BTreeMap;
use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::controller::{ControllerSettings, DEFAULT_EXTENSION};
use crate::request::{baseline_headers, is_baseline_header};

/// Environment variable overriding the extension name
pub const ENV_EXTENSION: &str = "STREAMSWAP_EXTENSION";
/// Environment variable overriding the connect timeout (milliseconds)
pub const ENV_CONNECT_TIMEOUT_MS: &str = "STREAMSWAP_CONNECT_TIMEOUT_MS";
/// Environment variable overriding the user agent
pub const ENV_USER_AGENT: &str = "STREAMSWAP_USER_AGENT";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur when loading configuration
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Failed to read config file
    #[error("Failed to read config file at {path}: {source}")]
    ReadError {
        /// The path that was attempted
        path: PathBuf,
        /// The underlying IO error
        source: std::io::Error,
    },

    /// Failed to parse TOML
    #[error("Failed to parse TOML config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Invalid configuration value
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

// =============================================================================
// Configuration Source Tracking
// =============================================================================

/// Tracks where a configuration value came from
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConfigSource {
    /// Value from command-line argument
    Cli,
    /// Value from environment variable
    Env,
    /// Value from TOML configuration file
    File,
    /// Default value
    Default,
}

impl std::fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Cli => write!(f, "CLI"),
            Self::Env => write!(f, "environment"),
            Self::File => write!(f, "config file"),
            Self::Default => write!(f, "default"),
        }
    }
}

// =============================================================================
// TOML Configuration Structures
// =============================================================================

/// HTTP section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct HttpToml {
    /// Connection timeout in milliseconds
    pub connect_timeout_ms: Option<u64>,

    /// User-Agent header value
    pub user_agent: Option<String>,

    /// Extra headers sent with every request
    pub headers: BTreeMap<String, String>,
}

/// Streaming section of the TOML configuration
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamingToml {
    /// Extension name elements designate to opt in
    pub extension_name: Option<String>,

    /// Render an incomplete trailing sequence as a final chunk
    pub flush_trailing_bytes: Option<bool>,
}

/// Top-level TOML configuration structure
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamerToml {
    /// HTTP configuration section
    pub http: HttpToml,

    /// Streaming configuration section
    pub streaming: StreamingToml,
}

// =============================================================================
// Main Configuration Struct
// =============================================================================

/// Resolved configuration
///
/// Use [`load_config`] to load it with proper priority handling.
#[derive(Clone, Debug)]
pub struct StreamerConfig {
    /// Extension name elements designate to opt in
    pub extension_name: String,

    /// Headers sent with every request
    pub default_headers: Vec<(String, String)>,

    /// Connection establishment timeout
    pub connect_timeout: Duration,

    /// User-Agent header value
    pub user_agent: Option<String>,

    /// Render an incomplete trailing sequence as a final chunk
    pub flush_trailing_bytes: bool,

    /// Path to the config file that was loaded (if any)
    pub config_file_path: Option<PathBuf>,

    /// Source of configuration values
    source: ConfigSource,
}

impl Default for StreamerConfig {
    fn default() -> Self {
        Self {
            extension_name: DEFAULT_EXTENSION.to_string(),
            default_headers: baseline_headers(),
            connect_timeout: Duration::from_secs(10),
            user_agent: None,
            flush_trailing_bytes: true,
            config_file_path: None,
            source: ConfigSource::Default,
        }
    }
}

impl StreamerConfig {
    /// Create a new configuration with default values
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the primary source of this configuration
    #[must_use]
    pub fn source(&self) -> ConfigSource {
        self.source
    }

    /// Set the configuration source
    pub fn set_source(&mut self, source: ConfigSource) {
        self.source = source;
    }

    /// Add a header, replacing any header of the same name
    ///
    /// Baseline headers are fixed; an attempt to set one is ignored.
    pub fn set_header(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        if is_baseline_header(&name) {
            tracing::warn!(header = %name, "Ignoring override of baseline header");
            return;
        }
        self.default_headers
            .retain(|(existing, _)| !existing.eq_ignore_ascii_case(&name));
        self.default_headers.push((name, value.into()));
    }

    /// Check values that would make the controller unusable
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::ValidationError`] for an empty extension name or
    /// a zero connect timeout.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.extension_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "extension_name must not be empty".to_string(),
            ));
        }
        if self.connect_timeout.is_zero() {
            return Err(ConfigError::ValidationError(
                "connect_timeout_ms must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }

    /// Settings for a [`StreamController`](crate::controller::StreamController)
    #[must_use]
    pub fn controller_settings(&self) -> ControllerSettings {
        ControllerSettings {
            extension_name: self.extension_name.clone(),
            headers: self.default_headers.clone(),
            flush_trailing_bytes: self.flush_trailing_bytes,
        }
    }
}

// =============================================================================
// Configuration Loading
// =============================================================================

/// Get the default configuration file path
///
/// Returns `$XDG_CONFIG_HOME/streamswap/streamswap.toml` or
/// `~/.config/streamswap/streamswap.toml` if `XDG_CONFIG_HOME` is not set.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|p| p.join("streamswap").join("streamswap.toml"))
}

/// Load configuration from all sources with proper priority
///
/// # Errors
///
/// Returns an error if the config file exists but cannot be parsed, or if the
/// resulting values fail validation. A missing config file is not an error.
pub fn load_config() -> Result<StreamerConfig, ConfigError> {
    load_config_from_path(default_config_path())
}

/// Load configuration from a specific path
///
/// # Arguments
///
/// * `path` - Optional path to the configuration file. If `None`, only defaults
///   and environment variables are used.
///
/// # Errors
///
/// Returns an error if the specified config file cannot be read or parsed, or
/// if the resulting values fail validation.
pub fn load_config_from_path(path: Option<PathBuf>) -> Result<StreamerConfig, ConfigError> {
    load_config_with_env(path, |key| std::env::var(key).ok())
}

fn load_config_with_env(
    path: Option<PathBuf>,
    env: impl Fn(&str) -> Option<String>,
) -> Result<StreamerConfig, ConfigError> {
    let mut config = StreamerConfig::default();

    if let Some(ref config_path) = path {
        if config_path.exists() {
            let toml_content =
                std::fs::read_to_string(config_path).map_err(|e| ConfigError::ReadError {
                    path: config_path.clone(),
                    source: e,
                })?;

            let toml_config: StreamerToml = toml::from_str(&toml_content)?;
            apply_toml_config(&mut config, &toml_config);
            config.config_file_path = Some(config_path.clone());
            config.source = ConfigSource::File;

            tracing::info!(
                path = %config_path.display(),
                "Loaded configuration from file"
            );
        } else {
            tracing::debug!(
                path = %config_path.display(),
                "Config file not found, using defaults"
            );
        }
    }

    apply_env_config(&mut config, env);
    config.validate()?;

    Ok(config)
}

/// Apply TOML configuration values to the config struct
fn apply_toml_config(config: &mut StreamerConfig, toml: &StreamerToml) {
    if let Some(ms) = toml.http.connect_timeout_ms {
        config.connect_timeout = Duration::from_millis(ms);
    }
    if toml.http.user_agent.is_some() {
        config.user_agent = toml.http.user_agent.clone();
    }
    for (name, value) in &toml.http.headers {
        config.set_header(name.clone(), value.clone());
    }

    if let Some(ref name) = toml.streaming.extension_name {
        config.extension_name = name.clone();
    }
    if let Some(flush) = toml.streaming.flush_trailing_bytes {
        config.flush_trailing_bytes = flush;
    }
}

/// Apply environment variable overrides to the config
fn apply_env_config(config: &mut StreamerConfig, env: impl Fn(&str) -> Option<String>) {
    if let Some(name) = env(ENV_EXTENSION) {
        config.extension_name = name;
        config.source = ConfigSource::Env;
    }
    if let Some(timeout) = env(ENV_CONNECT_TIMEOUT_MS) {
        match timeout.parse::<u64>() {
            Ok(ms) => {
                config.connect_timeout = Duration::from_millis(ms);
                config.source = ConfigSource::Env;
            }
            Err(_) => {
                tracing::warn!(
                    var = ENV_CONNECT_TIMEOUT_MS,
                    value = %timeout,
                    "Ignoring unparsable timeout"
                );
            }
        }
    }
    if let Some(agent) = env(ENV_USER_AGENT) {
        config.user_agent = Some(agent);
        config.source = ConfigSource::Env;
    }
}

// =============================================================================
// CLI Override Support
// =============================================================================

/// Builder for applying CLI overrides to configuration
///
/// Use this after [`load_config`] to apply command-line argument overrides.
#[derive(Clone, Debug, Default)]
pub struct ConfigOverrides {
    /// Extension name override
    pub extension_name: Option<String>,

    /// Connect timeout override (milliseconds)
    pub connect_timeout_ms: Option<u64>,

    /// User agent override
    pub user_agent: Option<String>,

    /// Additional headers
    pub headers: Vec<(String, String)>,

    /// Trailing-byte flush override
    pub flush_trailing_bytes: Option<bool>,
}

impl ConfigOverrides {
    /// Create a new empty set of overrides
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set extension name override
    #[must_use]
    pub fn with_extension_name(mut self, name: String) -> Self {
        self.extension_name = Some(name);
        self
    }

    /// Set connect timeout override
    #[must_use]
    pub fn with_connect_timeout_ms(mut self, ms: u64) -> Self {
        self.connect_timeout_ms = Some(ms);
        self
    }

    /// Set user agent override
    #[must_use]
    pub fn with_user_agent(mut self, agent: String) -> Self {
        self.user_agent = Some(agent);
        self
    }

    /// Add a header
    #[must_use]
    pub fn with_header(mut self, name: String, value: String) -> Self {
        self.headers.push((name, value));
        self
    }

    /// Set trailing-byte flush override
    #[must_use]
    pub fn with_flush_trailing_bytes(mut self, flush: bool) -> Self {
        self.flush_trailing_bytes = Some(flush);
        self
    }

    fn is_empty(&self) -> bool {
        self.extension_name.is_none()
            && self.connect_timeout_ms.is_none()
            && self.user_agent.is_none()
            && self.headers.is_empty()
            && self.flush_trailing_bytes.is_none()
    }

    /// Apply overrides to a configuration
    pub fn apply(&self, config: &mut StreamerConfig) {
        if !self.is_empty() {
            config.source = ConfigSource::Cli;
        }

        if let Some(ref name) = self.extension_name {
            config.extension_name = name.clone();
        }
        if let Some(ms) = self.connect_timeout_ms {
            config.connect_timeout = Duration::from_millis(ms);
        }
        if let Some(ref agent) = self.user_agent {
            config.user_agent = Some(agent.clone());
        }
        for (name, value) in &self.headers {
            config.set_header(name.clone(), value.clone());
        }
        if let Some(flush) = self.flush_trailing_bytes {
            config.flush_trailing_bytes = flush;
        }
    }
}

// =============================================================================
// Tests
// =============================================================================

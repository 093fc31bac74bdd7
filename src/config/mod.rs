pub mod validation;

use serde::{Deserialize, Serialize};
use std::path::Path;

use self::validation::validate_config;

/// Environment variable carrying the upstream bearer credential.
pub const CREDENTIAL_ENV: &str = "AGENT_KEY";
/// Environment variable overriding the upstream endpoint.
pub const UPSTREAM_URL_ENV: &str = "AGENT_URL";
/// Environment variable pointing at an optional YAML config file.
pub const CONFIG_PATH_ENV: &str = "RELAY_CONFIG";
/// Environment variable overriding `features.log_level`.
pub const LOG_LEVEL_ENV: &str = "RELAY_LOG_LEVEL";

const DEFAULT_CONFIG_PATH: &str = "config.yaml";
pub const DEFAULT_UPSTREAM_URL: &str =
    "https://bbknmramomyuvt64i6qbhqbe.agents.do-ai.run/api/v1/chat/completions";

/// Error type for configuration loading and validation.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("An 'AGENT_KEY' environment variable is required")]
    MissingCredential,
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),
    #[error("Failed to parse YAML: {0}")]
    Yaml(#[from] serde_yaml::Error),
    #[error("Config validation error: {0}")]
    Validation(String),
}

/// Server configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_port")]
    pub port: u16,
    #[serde(default = "default_host")]
    pub host: String,
    /// Ceiling for one relay session, dispatch and streaming included.
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
    #[serde(default = "default_index_path")]
    pub index_path: String,
    /// Largest upstream frame buffered while waiting for its delimiter.
    #[serde(default = "default_max_frame_bytes")]
    pub max_frame_bytes: usize,
    #[serde(default = "default_http_pool_max_idle_per_host")]
    pub http_pool_max_idle_per_host: usize,
    #[serde(default = "default_http_pool_idle_timeout_secs")]
    pub http_pool_idle_timeout_secs: u64,
}

fn default_port() -> u16 {
    3000
}
fn default_host() -> String {
    "0.0.0.0".to_string()
}
fn default_timeout_secs() -> u64 {
    30
}
fn default_index_path() -> String {
    "index.html".to_string()
}
fn default_max_frame_bytes() -> usize {
    64 * 1024
}
fn default_http_pool_max_idle_per_host() -> usize {
    16
}
fn default_http_pool_idle_timeout_secs() -> u64 {
    15
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            port: default_port(),
            host: default_host(),
            timeout_secs: default_timeout_secs(),
            index_path: default_index_path(),
            max_frame_bytes: default_max_frame_bytes(),
            http_pool_max_idle_per_host: default_http_pool_max_idle_per_host(),
            http_pool_idle_timeout_secs: default_http_pool_idle_timeout_secs(),
        }
    }
}

/// Upstream streaming API configuration.
///
/// `api_key` is never read from the YAML file; it only comes from
/// [`CREDENTIAL_ENV`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UpstreamConfig {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(skip)]
    pub api_key: String,
    #[serde(default = "default_prompt")]
    pub prompt: String,
    #[serde(default = "default_top_p")]
    pub top_p: f64,
}

fn default_prompt() -> String {
    "How do I create a Droplet?".to_string()
}
fn default_top_p() -> f64 {
    0.02
}

impl UpstreamConfig {
    /// The effective upstream URL, falling back to [`DEFAULT_UPSTREAM_URL`].
    #[must_use]
    pub fn url(&self) -> &str {
        self.url.as_deref().unwrap_or(DEFAULT_UPSTREAM_URL)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            url: None,
            api_key: String::new(),
            prompt: default_prompt(),
            top_p: default_top_p(),
        }
    }
}

/// Feature flags and settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeaturesConfig {
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

fn default_log_level() -> String {
    "INFO".to_string()
}

impl Default for FeaturesConfig {
    fn default() -> Self {
        Self {
            log_level: default_log_level(),
        }
    }
}

/// Top-level application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
    #[serde(default)]
    pub features: FeaturesConfig,
}

/// Load configuration from the process environment and the optional YAML file.
///
/// # Errors
///
/// See [`load_config_with`].
pub fn load_config() -> Result<AppConfig, ConfigError> {
    load_config_with(|name| std::env::var(name).ok())
}

/// Load configuration using `lookup` in place of the process environment.
///
/// The YAML file named by [`CONFIG_PATH_ENV`] (default `config.yaml`) is read
/// first; a missing default file is not an error, an explicitly named one is.
/// Environment values then override the file.
///
/// # Errors
///
/// Returns [`ConfigError::MissingCredential`] when the credential is absent or
/// empty, [`ConfigError::Io`]/[`ConfigError::Yaml`] when the file cannot be
/// read or parsed, and [`ConfigError::Validation`] when a value is out of range.
pub fn load_config_with<F>(lookup: F) -> Result<AppConfig, ConfigError>
where
    F: Fn(&str) -> Option<String>,
{
    let var = |name: &str| lookup(name).filter(|value| !value.trim().is_empty());

    let mut config = match var(CONFIG_PATH_ENV) {
        Some(path) => load_config_file(Path::new(&path))?,
        None if Path::new(DEFAULT_CONFIG_PATH).exists() => {
            load_config_file(Path::new(DEFAULT_CONFIG_PATH))?
        }
        None => AppConfig::default(),
    };

    config.upstream.api_key = var(CREDENTIAL_ENV).ok_or(ConfigError::MissingCredential)?;
    if let Some(url) = var(UPSTREAM_URL_ENV) {
        config.upstream.url = Some(url);
    }
    if let Some(level) = var(LOG_LEVEL_ENV) {
        config.features.log_level = level;
    }

    validate_config(&config)?;
    Ok(config)
}

/// Parse a YAML config file without applying the environment overlay.
///
/// # Errors
///
/// Returns [`ConfigError::Io`] when reading the file fails and
/// [`ConfigError::Yaml`] when parsing fails.
pub fn load_config_file(path: &Path) -> Result<AppConfig, ConfigError> {
    let contents = std::fs::read_to_string(path)?;
    parse_config(&contents)
}

/// Parse YAML config text.
///
/// # Errors
///
/// Returns [`ConfigError::Yaml`] when parsing fails.
pub fn parse_config(contents: &str) -> Result<AppConfig, ConfigError> {
    if contents.trim().is_empty() {
        return Ok(AppConfig::default());
    }
    Ok(serde_yaml::from_str(contents)?)
}

//! Configuration management
//!
//! This module handles loading and parsing configuration for the jobtrack client.
//! Configuration can be loaded from:
//! - a YAML file (`jobtrack.yml` by default)
//! - Environment variables (override file settings)
//!
//! Missing optional values are filled with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend API configuration
    #[serde(default)]
    pub api: ApiConfig,
    /// Credential storage configuration
    #[serde(default)]
    pub storage: StorageConfig,
    /// Job cache configuration
    #[serde(default)]
    pub cache: CacheConfig,
    /// Theme configuration
    #[serde(default)]
    pub theme: ThemeConfig,
}

/// Backend API configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiConfig {
    /// Base URL every request path is joined onto
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Request timeout in seconds
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,
    /// User-Agent header sent with every request
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl Default for ApiConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_seconds: default_timeout_seconds(),
            user_agent: default_user_agent(),
        }
    }
}

impl ApiConfig {
    /// Request timeout as a duration
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_seconds)
    }
}

fn default_base_url() -> String {
    "http://127.0.0.1:8000".to_string()
}

fn default_timeout_seconds() -> u64 {
    30
}

fn default_user_agent() -> String {
    format!("jobtrack/{}", env!("CARGO_PKG_VERSION"))
}

/// Credential storage configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StorageConfig {
    /// Path of the credential file (token and theme preference)
    #[serde(default = "default_storage_path")]
    pub path: PathBuf,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            path: default_storage_path(),
        }
    }
}

fn default_storage_path() -> PathBuf {
    PathBuf::from("data/credentials.json")
}

/// Job cache configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheConfig {
    /// How long a fetched job list stays fresh, in seconds
    #[serde(default = "default_ttl")]
    pub ttl_seconds: u64,
    /// Maximum number of cached filter results
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            ttl_seconds: default_ttl(),
            max_capacity: default_max_capacity(),
        }
    }
}

impl CacheConfig {
    /// Entry time-to-live as a duration
    pub fn ttl(&self) -> Duration {
        Duration::from_secs(self.ttl_seconds)
    }
}

/// Longest accepted cache TTL: one year
pub const MAX_CACHE_TTL_SECONDS: u64 = 365 * 24 * 60 * 60;

fn default_ttl() -> u64 {
    300
}

fn default_max_capacity() -> u64 {
    64
}

/// Theme configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ThemeConfig {
    /// Dark mode when no preference has been stored yet
    #[serde(default = "default_dark")]
    pub default_dark: bool,
}

impl Default for ThemeConfig {
    fn default() -> Self {
        Self {
            default_dark: default_dark(),
        }
    }
}

fn default_dark() -> bool {
    true
}

/// Error type for configuration parsing
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    FileRead {
        path: String,
        source: std::io::Error,
    },
    #[error("Failed to parse config file '{path}': {message}")]
    ParseError {
        path: String,
        message: String,
    },
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

impl Config {
    /// Load configuration from file
    ///
    /// If the file doesn't exist or is empty, returns default configuration.
    /// If the file exists but is invalid YAML, returns an error with details.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::FileRead {
            path: path.display().to_string(),
            source: e,
        })?;

        if content.trim().is_empty() {
            return Ok(Self::default());
        }

        let config: Config = serde_yaml::from_str(&content).map_err(|e| {
            ConfigError::ParseError {
                path: path.display().to_string(),
                message: format_yaml_error(&e),
            }
        })?;

        Ok(config)
    }

    /// Load configuration from file with environment variable overrides
    ///
    /// Environment variables follow the pattern:
    /// - JOBTRACK_API_BASE_URL
    /// - JOBTRACK_API_TIMEOUT_SECONDS
    /// - JOBTRACK_API_USER_AGENT
    /// - JOBTRACK_STORAGE_PATH
    /// - JOBTRACK_CACHE_TTL_SECONDS
    /// - JOBTRACK_CACHE_MAX_CAPACITY
    /// - JOBTRACK_THEME_DEFAULT_DARK
    pub fn load_with_env(path: &std::path::Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// Apply environment variable overrides to the configuration
    fn apply_env_overrides(&mut self) {
        if let Ok(base_url) = std::env::var("JOBTRACK_API_BASE_URL") {
            self.api.base_url = base_url;
        }
        if let Ok(timeout) = std::env::var("JOBTRACK_API_TIMEOUT_SECONDS") {
            if let Ok(timeout) = timeout.parse::<u64>() {
                self.api.timeout_seconds = timeout;
            }
        }
        if let Ok(user_agent) = std::env::var("JOBTRACK_API_USER_AGENT") {
            self.api.user_agent = user_agent;
        }

        if let Ok(path) = std::env::var("JOBTRACK_STORAGE_PATH") {
            self.storage.path = PathBuf::from(path);
        }

        if let Ok(ttl) = std::env::var("JOBTRACK_CACHE_TTL_SECONDS") {
            if let Ok(ttl) = ttl.parse::<u64>() {
                self.cache.ttl_seconds = ttl;
            }
        }
        if let Ok(capacity) = std::env::var("JOBTRACK_CACHE_MAX_CAPACITY") {
            if let Ok(capacity) = capacity.parse::<u64>() {
                self.cache.max_capacity = capacity;
            }
        }

        if let Ok(dark) = std::env::var("JOBTRACK_THEME_DEFAULT_DARK") {
            match dark.to_lowercase().as_str() {
                "true" | "1" | "yes" => self.theme.default_dark = true,
                "false" | "0" | "no" => self.theme.default_dark = false,
                _ => {} // Ignore invalid values
            }
        }
    }

    /// Check values that would otherwise fail later at request time
    pub fn validate(&self) -> Result<(), ConfigError> {
        let url = reqwest::Url::parse(&self.api.base_url).map_err(|e| {
            ConfigError::ValidationError(format!(
                "api.base_url '{}' is not a valid URL: {}",
                self.api.base_url, e
            ))
        })?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ConfigError::ValidationError(format!(
                "api.base_url must use http or https, got '{}'",
                url.scheme()
            )));
        }
        if self.api.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "api.timeout_seconds must be greater than zero".to_string(),
            ));
        }
        if self.cache.max_capacity == 0 {
            return Err(ConfigError::ValidationError(
                "cache.max_capacity must be greater than zero".to_string(),
            ));
        }
        if self.cache.ttl_seconds > MAX_CACHE_TTL_SECONDS {
            return Err(ConfigError::ValidationError(format!(
                "cache.ttl_seconds must be at most {}, got {}",
                MAX_CACHE_TTL_SECONDS, self.cache.ttl_seconds
            )));
        }
        Ok(())
    }
}

/// Format YAML parsing error with location and context
fn format_yaml_error(e: &serde_yaml::Error) -> String {
    if let Some(location) = e.location() {
        format!(
            "at line {}, column {}: {}",
            location.line(),
            location.column(),
            e
        )
    } else {
        e.to_string()
    }
}

// Shared mutex for config tests that modify environment variables.
#[cfg(test)]
static CONFIG_ENV_MUTEX: std::sync::Mutex<()> = std::sync::Mutex::new(());


#[cfg(test)]
mod property_tests {
    use super::*;
    use proptest::prelude::*;

    proptest! {
        #![proptest_config(ProptestConfig::with_cases(20))]

        /// Any config serialized to YAML loads back with the same values.
        #[test]
        fn config_yaml_roundtrip(
            port in 1u16..,
            timeout in 1u64..3600,
            ttl in 0u64..86_400,
            capacity in 1u64..10_000,
            dark in any::<bool>(),
        ) {
            let mut config = Config::default();
            config.api.base_url = format!("http://localhost:{}", port);
            config.api.timeout_seconds = timeout;
            config.cache.ttl_seconds = ttl;
            config.cache.max_capacity = capacity;
            config.theme.default_dark = dark;

            let yaml = serde_yaml::to_string(&config).unwrap();
            let mut file = tempfile::NamedTempFile::new().unwrap();
            std::io::Write::write_all(&mut file, yaml.as_bytes()).unwrap();

            let loaded = Config::load(file.path()).unwrap();
            prop_assert_eq!(&loaded.api.base_url, &config.api.base_url);
            prop_assert_eq!(loaded.api.timeout_seconds, timeout);
            prop_assert_eq!(loaded.cache.ttl_seconds, ttl);
            prop_assert_eq!(loaded.cache.max_capacity, capacity);
            prop_assert_eq!(loaded.theme.default_dark, dark);
            prop_assert!(loaded.validate().is_ok());
        }
    }
}

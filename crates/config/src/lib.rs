#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for the audiobook core
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/audiobook/config.toml)
//! - Environment variables (`AUDIOBOOK_*`)

pub mod constants;
pub mod resources_semaphore;

pub use resources_semaphore::{acquire_semaphore_permit, create_semaphore};

use audiobook_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

use constants::{
    DEFAULT_CHUNK_SIZE, DEFAULT_CONNECT_TIMEOUT_SECS, DEFAULT_MAX_CONCURRENT_DOWNLOADS,
    DEFAULT_PROGRESS_STEP, SCRATCH_DIR_NAME,
};

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,

    #[serde(default)]
    pub license: LicenseConfig,
}

/// Download engine configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct NetworkConfig {
    #[serde(default = "default_connect_timeout")]
    pub connect_timeout: u64, // seconds
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
    #[serde(default = "default_chunk_size")]
    pub chunk_size: usize,
    #[serde(default = "default_max_concurrent_downloads")]
    pub max_concurrent_downloads: usize,
    #[serde(default = "default_progress_step")]
    pub progress_step: u8,
}

/// License verification configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq, Eq)]
pub struct LicenseConfig {
    /// Shared secret for HMAC-SHA256 manifest signatures
    pub hmac_secret: Option<String>,
    /// When set, signed claims must carry this `iss`
    pub expected_issuer: Option<String>,
    /// Where fetched status documents are written before parsing
    pub scratch_dir: Option<PathBuf>,
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            connect_timeout: DEFAULT_CONNECT_TIMEOUT_SECS,
            user_agent: default_user_agent(),
            chunk_size: DEFAULT_CHUNK_SIZE,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            progress_step: DEFAULT_PROGRESS_STEP,
        }
    }
}

// Default value functions for serde
fn default_connect_timeout() -> u64 {
    DEFAULT_CONNECT_TIMEOUT_SECS
}

fn default_user_agent() -> String {
    format!("audiobook-core/{}", env!("CARGO_PKG_VERSION"))
}

fn default_chunk_size() -> usize {
    DEFAULT_CHUNK_SIZE
}

fn default_max_concurrent_downloads() -> usize {
    DEFAULT_MAX_CONCURRENT_DOWNLOADS
}

fn default_progress_step() -> u8 {
    DEFAULT_PROGRESS_STEP
}

impl NetworkConfig {
    /// Connect timeout as a `Duration`
    #[must_use]
    pub fn connect_timeout(&self) -> Duration {
        Duration::from_secs(self.connect_timeout)
    }
}

impl LicenseConfig {
    /// The configured HMAC secret
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::MissingField` when no secret is configured.
    pub fn hmac_secret(&self) -> Result<&str, Error> {
        self.hmac_secret.as_deref().ok_or_else(|| {
            ConfigError::MissingField {
                field: "license.hmac_secret".to_string(),
            }
            .into()
        })
    }

    /// Scratch directory for status documents (with default)
    #[must_use]
    pub fn scratch_dir(&self) -> PathBuf {
        self.scratch_dir
            .clone()
            .unwrap_or_else(|| std::env::temp_dir().join(SCRATCH_DIR_NAME))
    }
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("audiobook").join("config.toml"))
    }

    /// Parse configuration from TOML text and validate it
    ///
    /// # Errors
    ///
    /// Returns an error if the text is not valid TOML or holds invalid values.
    pub fn from_toml_str(contents: &str) -> Result<Self, Error> {
        let config: Self = toml::from_str(contents).map_err(|e| ConfigError::ParseError {
            message: e.to_string(),
        })?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub async fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = fs::read_to_string(path)
            .await
            .map_err(|_| ConfigError::NotFound {
                path: path.display().to_string(),
            })?;

        Self::from_toml_str(&contents)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub async fn load() -> Result<Self, Error> {
        let config_path = Self::default_path()?;

        if config_path.exists() {
            Self::load_from_file(&config_path).await
        } else {
            tracing::debug!(path = %config_path.display(), "no config file, using defaults");
            Ok(Self::default())
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub async fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path).await,
            None => Self::load().await,
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        // AUDIOBOOK_USER_AGENT
        if let Ok(agent) = std::env::var("AUDIOBOOK_USER_AGENT") {
            if agent.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "AUDIOBOOK_USER_AGENT".to_string(),
                    value: agent,
                }
                .into());
            }
            self.network.user_agent = agent;
        }

        // AUDIOBOOK_CONNECT_TIMEOUT
        if let Ok(timeout) = std::env::var("AUDIOBOOK_CONNECT_TIMEOUT") {
            self.network.connect_timeout =
                timeout.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "AUDIOBOOK_CONNECT_TIMEOUT".to_string(),
                    value: timeout,
                })?;
        }

        // AUDIOBOOK_MAX_CONCURRENT_DOWNLOADS
        if let Ok(downloads) = std::env::var("AUDIOBOOK_MAX_CONCURRENT_DOWNLOADS") {
            self.network.max_concurrent_downloads =
                downloads.parse().map_err(|_| ConfigError::InvalidValue {
                    field: "AUDIOBOOK_MAX_CONCURRENT_DOWNLOADS".to_string(),
                    value: downloads,
                })?;
        }

        // AUDIOBOOK_LICENSE_SECRET
        if let Ok(secret) = std::env::var("AUDIOBOOK_LICENSE_SECRET") {
            self.license.hmac_secret = Some(secret);
        }

        // AUDIOBOOK_LICENSE_ISSUER
        if let Ok(issuer) = std::env::var("AUDIOBOOK_LICENSE_ISSUER") {
            self.license.expected_issuer = Some(issuer);
        }

        // AUDIOBOOK_SCRATCH_DIR
        if let Ok(dir) = std::env::var("AUDIOBOOK_SCRATCH_DIR") {
            self.license.scratch_dir = Some(PathBuf::from(dir));
        }

        self.validate()
    }

    /// Check value ranges that serde cannot express
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> Result<(), Error> {
        if self.network.chunk_size == 0 {
            return Err(invalid("network.chunk_size", self.network.chunk_size));
        }
        if self.network.max_concurrent_downloads == 0 {
            return Err(invalid(
                "network.max_concurrent_downloads",
                self.network.max_concurrent_downloads,
            ));
        }
        if self.network.progress_step == 0 || self.network.progress_step > 100 {
            return Err(invalid("network.progress_step", self.network.progress_step));
        }
        Ok(())
    }
}

fn invalid(field: &str, value: impl ToString) -> Error {
    ConfigError::InvalidValue {
        field: field.to_string(),
        value: value.to_string(),
    }
    .into()
}

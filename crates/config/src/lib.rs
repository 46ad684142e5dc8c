#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for pkgi
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/pkgi/config.toml)
//! - Environment variables (`PKGI_*`)
//! - CLI flags (applied by the binary)

pub mod constants;

use pkgi_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::time::Duration;
use tokio::fs;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub general: GeneralConfig,

    #[serde(default)]
    pub paths: PathConfig,

    #[serde(default)]
    pub shell: ShellConfig,

    #[serde(default)]
    pub verify: VerifyConfig,
}

/// Identities and links used by the orchestrator
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GeneralConfig {
    #[serde(default = "default_app_name")]
    pub app_name: String,
    #[serde(default = "default_self_package")]
    pub self_package: String,
    #[serde(default = "default_store_installer")]
    pub store_installer: String,
    #[serde(default = "default_fallback_installer")]
    pub fallback_installer: String,
    #[serde(default = "default_broker_manager")]
    pub broker_manager: String,
    #[serde(default = "default_broker_download_url")]
    pub broker_download_url: String,
}

/// Path configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PathConfig {
    pub cache_dir: Option<PathBuf>,
    pub archive_dir: Option<PathBuf>,
    pub log_dir: Option<PathBuf>,
}

/// Elevated shell configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ShellConfig {
    #[serde(default = "default_su_binary")]
    pub su_binary: String,
    #[serde(default = "default_probe_timeout_ms")]
    pub probe_timeout_ms: u64,
    /// Pause after a shell install reports success, before verification
    #[serde(default = "default_settle_delay_ms")]
    pub settle_delay_ms: u64,
}

/// Post-install verification
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VerifyConfig {
    #[serde(default = "default_verify_attempts")]
    pub attempts: u32,
    #[serde(default = "default_verify_interval_ms")]
    pub interval_ms: u64,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            app_name: default_app_name(),
            self_package: default_self_package(),
            store_installer: default_store_installer(),
            fallback_installer: default_fallback_installer(),
            broker_manager: default_broker_manager(),
            broker_download_url: default_broker_download_url(),
        }
    }
}

impl Default for ShellConfig {
    fn default() -> Self {
        Self {
            su_binary: default_su_binary(),
            probe_timeout_ms: default_probe_timeout_ms(),
            settle_delay_ms: default_settle_delay_ms(),
        }
    }
}

impl Default for VerifyConfig {
    fn default() -> Self {
        Self {
            attempts: default_verify_attempts(),
            interval_ms: default_verify_interval_ms(),
        }
    }
}

// Default value functions for serde
fn default_app_name() -> String {
    constants::APP_NAME.to_string()
}

fn default_self_package() -> String {
    constants::SELF_PACKAGE.to_string()
}

fn default_store_installer() -> String {
    pkgi_types::STORE_INSTALLER.to_string()
}

fn default_fallback_installer() -> String {
    pkgi_types::SHELL_INSTALLER.to_string()
}

fn default_broker_manager() -> String {
    constants::BROKER_MANAGER.to_string()
}

fn default_broker_download_url() -> String {
    constants::BROKER_DOWNLOAD_URL.to_string()
}

fn default_su_binary() -> String {
    constants::SU_BINARY.to_string()
}

fn default_probe_timeout_ms() -> u64 {
    constants::PROBE_TIMEOUT_MS
}

fn default_settle_delay_ms() -> u64 {
    constants::SETTLE_DELAY_MS
}

fn default_verify_attempts() -> u32 {
    constants::VERIFY_ATTEMPTS
}

fn default_verify_interval_ms() -> u64 {
    constants::VERIFY_INTERVAL_MS
}

impl ShellConfig {
    #[must_use]
    pub fn probe_timeout(&self) -> Duration {
        Duration::from_millis(self.probe_timeout_ms)
    }

    #[must_use]
    pub fn settle_delay(&self) -> Duration {
        Duration::from_millis(self.settle_delay_ms)
    }
}

impl VerifyConfig {
    #[must_use]
    pub fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
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
        Ok(config_dir.join(constants::APP_NAME).join("config.toml"))
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

        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
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
            tracing::debug!(path = %config_path.display(), "loading config");
            Self::load_from_file(&config_path).await
        } else {
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
        if let Ok(su) = std::env::var("PKGI_SU") {
            if su.trim().is_empty() {
                return Err(ConfigError::InvalidValue {
                    field: "PKGI_SU".to_string(),
                    value: su,
                }
                .into());
            }
            self.shell.su_binary = su;
        }

        if let Ok(dir) = std::env::var("PKGI_CACHE_DIR") {
            self.paths.cache_dir = Some(PathBuf::from(dir));
        }

        if let Ok(dir) = std::env::var("PKGI_ARCHIVE_DIR") {
            self.paths.archive_dir = Some(PathBuf::from(dir));
        }

        if let Ok(attempts) = std::env::var("PKGI_VERIFY_ATTEMPTS") {
            self.verify.attempts = attempts.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PKGI_VERIFY_ATTEMPTS".to_string(),
                value: attempts,
            })?;
        }

        if let Ok(interval) = std::env::var("PKGI_VERIFY_INTERVAL_MS") {
            self.verify.interval_ms = interval.parse().map_err(|_| ConfigError::InvalidValue {
                field: "PKGI_VERIFY_INTERVAL_MS".to_string(),
                value: interval,
            })?;
        }

        Ok(())
    }

    /// Private scratch area for payload copies (with default)
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.paths.cache_dir.clone().unwrap_or_else(|| {
            dirs::cache_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(constants::APP_NAME)
        })
    }

    /// Directory holding produced archives (with default)
    #[must_use]
    pub fn archive_dir(&self) -> PathBuf {
        self.paths.archive_dir.clone().unwrap_or_else(|| {
            dirs::document_dir()
                .or_else(dirs::home_dir)
                .unwrap_or_else(std::env::temp_dir)
                .join(&self.general.app_name)
        })
    }

    /// Directory for debug log files (with default)
    #[must_use]
    pub fn log_dir(&self) -> PathBuf {
        self.paths.log_dir.clone().unwrap_or_else(|| {
            dirs::data_local_dir()
                .unwrap_or_else(std::env::temp_dir)
                .join(constants::APP_NAME)
                .join("logs")
        })
    }
}

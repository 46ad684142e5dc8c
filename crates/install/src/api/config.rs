use std::path::PathBuf;
use std::time::Duration;

use pkgi_config::Config;

/// Directory under the cache used by the shell backend for payload copies
pub const SHELL_CACHE_DIR: &str = "root_install";

/// Installer configuration
#[derive(Clone, Debug)]
pub struct InstallConfig {
    /// Identity recorded as installer when no attribution is requested
    pub self_package: String,
    pub store_installer: String,
    /// Used instead of the store identity when the store is not a system package
    pub fallback_installer: String,
    pub broker_manager: String,
    pub broker_download_url: String,
    pub cache_dir: PathBuf,
    pub archive_dir: PathBuf,
    /// Pause after the shell reports success
    pub settle_delay: Duration,
    pub verify_attempts: u32,
    pub verify_interval: Duration,
}

impl Default for InstallConfig {
    fn default() -> Self {
        Self::from(&Config::default())
    }
}

impl From<&Config> for InstallConfig {
    fn from(config: &Config) -> Self {
        Self {
            self_package: config.general.self_package.clone(),
            store_installer: config.general.store_installer.clone(),
            fallback_installer: config.general.fallback_installer.clone(),
            broker_manager: config.general.broker_manager.clone(),
            broker_download_url: config.general.broker_download_url.clone(),
            cache_dir: config.cache_dir(),
            archive_dir: config.archive_dir(),
            settle_delay: config.shell.settle_delay(),
            verify_attempts: config.verify.attempts,
            verify_interval: config.verify.interval(),
        }
    }
}

impl InstallConfig {
    #[must_use]
    pub fn with_cache_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = dir.into();
        self
    }

    #[must_use]
    pub fn with_archive_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.archive_dir = dir.into();
        self
    }

    /// Set the post-install verification bound
    #[must_use]
    pub fn with_verify(mut self, attempts: u32, interval: Duration) -> Self {
        self.verify_attempts = attempts;
        self.verify_interval = interval;
        self
    }

    #[must_use]
    pub fn with_settle_delay(mut self, delay: Duration) -> Self {
        self.settle_delay = delay;
        self
    }

    /// Scratch directory for shell-backend payload copies
    #[must_use]
    pub fn shell_cache_dir(&self) -> PathBuf {
        self.cache_dir.join(SHELL_CACHE_DIR)
    }
}

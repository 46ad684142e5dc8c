//! Built-in defaults
//!
//! The retry bounds mirror the registry's indexing latency on slow hosts;
//! changing them shifts how long a success takes to be confirmed.

pub const APP_NAME: &str = "pkgi";

/// Identity recorded as installer when attribution is not requested
pub const SELF_PACKAGE: &str = "io.github.pkgi";

/// Package id of the broker's manager app
pub const BROKER_MANAGER: &str = "moe.shizuku.privileged.api";

pub const BROKER_DOWNLOAD_URL: &str = "https://shizuku.rikka.app/download/";

pub const SU_BINARY: &str = "su";
pub const PROBE_TIMEOUT_MS: u64 = 2_000;
pub const SETTLE_DELAY_MS: u64 = 300;

pub const VERIFY_ATTEMPTS: u32 = 20;
pub const VERIFY_INTERVAL_MS: u64 = 150;

use serde::{Deserialize, Serialize};

use pkgi_errors::UserFacingError;

/// Structured failure information shared across domains.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FailureContext {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// Short user-facing message.
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub hint: Option<String>,
    pub retryable: bool,
}

impl FailureContext {
    /// Build failure context from a `UserFacingError` implementation.
    #[must_use]
    pub fn from_error<E: UserFacingError + ?Sized>(error: &E) -> Self {
        Self {
            code: error.user_code().map(Into::into),
            message: error.user_message().into_owned(),
            hint: error.user_hint().map(Into::into),
            retryable: error.is_retryable(),
        }
    }
}

pub mod general;
pub mod install;
pub mod platform;

pub use general::*;
pub use install::*;
pub use platform::*;

/// Top-level application event enum that aggregates all domain-specific events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "domain", content = "event", rename_all = "snake_case")]
pub enum AppEvent {
    /// Warnings, notes and command lifecycle
    General(GeneralEvent),

    /// Orchestrator events (stages, sessions, payloads, archives)
    Install(InstallEvent),

    /// Host process execution events
    Platform(PlatformEvent),
}

impl AppEvent {
    /// Determine the appropriate tracing log level for this event
    #[must_use]
    pub fn log_level(&self) -> tracing::Level {
        use tracing::Level;

        match self {
            Self::General(GeneralEvent::OperationFailed { .. })
            | Self::Platform(PlatformEvent::ProcessExecutionFailed { .. }) => Level::ERROR,

            Self::Install(InstallEvent::StageChanged { stage, .. })
                if stage == "failed" || stage == "aborted" =>
            {
                Level::WARN
            }

            Self::General(GeneralEvent::Warning { .. })
            | Self::Install(InstallEvent::SessionAbandoned { .. }) => Level::WARN,

            Self::General(GeneralEvent::Note { .. })
            | Self::Install(InstallEvent::PayloadStaged { .. })
            | Self::Platform(PlatformEvent::ProcessExecutionStarted { .. }) => Level::DEBUG,

            _ => Level::INFO,
        }
    }

    /// Get the log target for this event
    #[must_use]
    pub fn log_target(&self) -> &'static str {
        match self {
            Self::General(_) => "pkgi::events::general",
            Self::Install(_) => "pkgi::events::install",
            Self::Platform(_) => "pkgi::events::platform",
        }
    }
}

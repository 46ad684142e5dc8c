//! Platform-specific operation errors

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

/// Errors that can occur while running host processes
#[derive(Debug, Clone, Error)]
pub enum PlatformError {
    #[error("process execution failed: {command} - {message}")]
    ProcessExecutionFailed { command: String, message: String },

    #[error("process timed out after {millis}ms: {command}")]
    Timeout { command: String, millis: u64 },

    #[error("command not found: {command}")]
    CommandNotFound { command: String },

    #[error("unexpected command output from {command}: {message}")]
    UnexpectedOutput { command: String, message: String },
}

impl UserFacingError for PlatformError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::CommandNotFound { .. } => Some("Check that the command is on PATH."),
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Timeout { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::ProcessExecutionFailed { .. } => "platform.process",
            Self::Timeout { .. } => "platform.timeout",
            Self::CommandNotFound { .. } => "platform.command_not_found",
            Self::UnexpectedOutput { .. } => "platform.output",
        })
    }
}

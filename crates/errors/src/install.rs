//! Installation orchestration error types

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum InstallError {
    #[error("no privileged backend is available")]
    NoPrivilege,

    #[error("unrecognized install source: {source_ref}")]
    InvalidSource { source_ref: String },

    #[error("failed to parse package: {message}")]
    ParseFailed { message: String },

    #[error("invalid manifest: {message}")]
    InvalidManifest { message: String },

    #[error("failed to stage payload: {message}")]
    StagingFailed { message: String },

    #[error("no payloads found in {path}")]
    NoPayloads { path: String },

    #[error("source payload not found: {path}")]
    SourceNotFound { path: String },

    #[error("archive failed for {path}: {message}")]
    ArchiveFailed { path: String, message: String },

    #[error("task execution failed: {message}")]
    TaskError { message: String },
}

impl UserFacingError for InstallError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::NoPrivilege => {
                Some("Start the privileged broker and grant permission, or make `su` available.")
            }
            Self::ParseFailed { .. } | Self::InvalidManifest { .. } => {
                Some("Check that the file is a valid package or package bundle.")
            }
            Self::InvalidSource { .. } => {
                Some("Pass a package name, a package:/market:/content:/file: reference.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(
            self,
            Self::StagingFailed { .. } | Self::ArchiveFailed { .. } | Self::TaskError { .. }
        )
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NoPrivilege => "install.no_privilege",
            Self::InvalidSource { .. } => "install.invalid_source",
            Self::ParseFailed { .. } | Self::InvalidManifest { .. } => "install.parse",
            Self::StagingFailed { .. } => "install.write",
            Self::NoPayloads { .. } | Self::SourceNotFound { .. } => "install.source",
            Self::ArchiveFailed { .. } => "install.archive",
            Self::TaskError { .. } => "install.task",
        })
    }
}

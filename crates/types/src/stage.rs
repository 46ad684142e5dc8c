//! Install stage state machine

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::{ExistingPackageInfo, PackageDescriptor};

/// Session status code for success
pub const STATUS_SUCCESS: i32 = 0;
/// Session status code for a generic failure
pub const STATUS_FAILURE: i32 = 1;
/// Legacy status code for success
pub const INSTALL_SUCCEEDED: i32 = 1;
/// Legacy status code for an internal failure
pub const INSTALL_FAILED_INTERNAL_ERROR: i32 = -110;

/// Why an operation stopped before reaching the backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AbortReason {
    NoPrivilege,
    ParseError,
    NotFound,
    InvalidInfo,
    SplitWithoutBase,
    CreateError,
    WriteError,
    /// The caller closed without committing; the session stays staged
    UserClosed,
}

impl AbortReason {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::NoPrivilege => "no_privilege",
            Self::ParseError => "parse_error",
            Self::NotFound => "not_found",
            Self::InvalidInfo => "invalid_info",
            Self::SplitWithoutBase => "split_without_base",
            Self::CreateError => "create_error",
            Self::WriteError => "write_error",
            Self::UserClosed => "user_closed",
        }
    }
}

/// Something the front end can open after a terminal stage
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum LaunchRef {
    /// Launch entry point of an installed package
    Activity { package: String, component: String },
    /// View a produced file
    View { path: PathBuf, mime: String },
    /// Open a web page
    Url { url: String },
}

/// Result delivered by a backend for a commit, install or uninstall
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstallStatus {
    pub status: i32,
    pub legacy_status: i32,
    pub message: Option<String>,
}

impl InstallStatus {
    #[must_use]
    pub fn success() -> Self {
        Self {
            status: STATUS_SUCCESS,
            legacy_status: INSTALL_SUCCEEDED,
            message: None,
        }
    }

    pub fn internal_error(message: impl Into<String>) -> Self {
        Self {
            status: STATUS_FAILURE,
            legacy_status: INSTALL_FAILED_INTERNAL_ERROR,
            message: Some(message.into()),
        }
    }

    #[must_use]
    pub fn is_success(&self) -> bool {
        self.status == STATUS_SUCCESS
    }
}

/// Externally observable state of the orchestrator
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "stage", rename_all = "snake_case")]
pub enum InstallStage {
    Parse,
    /// The caller must choose whether to proceed
    UserAction {
        descriptor: PackageDescriptor,
        existing: Option<ExistingPackageInfo>,
        full_mode: bool,
        skip_create: bool,
    },
    /// The package is already installed; offer open/archive/uninstall
    PackageAction {
        descriptor: PackageDescriptor,
        existing: ExistingPackageInfo,
    },
    Installing {
        descriptor: PackageDescriptor,
    },
    Success {
        descriptor: PackageDescriptor,
        launch: Option<LaunchRef>,
        /// Produced archive path (archive operations only)
        archive_path: Option<String>,
    },
    Failed {
        descriptor: PackageDescriptor,
        legacy_status: i32,
        status: i32,
        message: Option<String>,
    },
    Aborted {
        reason: AbortReason,
        recovery: Option<LaunchRef>,
    },
}

impl InstallStage {
    #[must_use]
    pub fn aborted(reason: AbortReason) -> Self {
        Self::Aborted {
            reason,
            recovery: None,
        }
    }

    /// Build the terminal stage for a backend-reported status
    #[must_use]
    pub fn failed(descriptor: PackageDescriptor, status: InstallStatus) -> Self {
        Self::Failed {
            descriptor,
            legacy_status: status.legacy_status,
            status: status.status,
            message: status.message,
        }
    }

    /// Terminal stages admit no further transition
    #[must_use]
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::Success { .. } | Self::Failed { .. } | Self::Aborted { .. }
        )
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Parse => "parse",
            Self::UserAction { .. } => "user_action",
            Self::PackageAction { .. } => "package_action",
            Self::Installing { .. } => "installing",
            Self::Success { .. } => "success",
            Self::Failed { .. } => "failed",
            Self::Aborted { .. } => "aborted",
        }
    }

    #[must_use]
    pub fn abort_reason(&self) -> Option<AbortReason> {
        match self {
            Self::Aborted { reason, .. } => Some(*reason),
            _ => None,
        }
    }

    #[must_use]
    pub fn descriptor(&self) -> Option<&PackageDescriptor> {
        match self {
            Self::UserAction { descriptor, .. }
            | Self::PackageAction { descriptor, .. }
            | Self::Installing { descriptor }
            | Self::Success { descriptor, .. }
            | Self::Failed { descriptor, .. } => Some(descriptor),
            Self::Parse | Self::Aborted { .. } => None,
        }
    }
}

//! Staged-session model shared by the broker interface and the drivers

use bitflags::bitflags;
use serde::{Deserialize, Serialize};

use crate::Icon;

/// Identifier of a staged install session
pub type SessionId = i32;

/// Sentinel for "no session bound"
pub const INVALID_SESSION_ID: SessionId = -1;

/// How a staged session treats the already-installed package
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionMode {
    /// Replace the whole package with the staged payloads
    Full,
    /// Keep existing payloads and apply the staged ones on top
    InheritExisting,
}

impl SessionMode {
    #[must_use]
    pub fn from_full(full: bool) -> Self {
        if full {
            Self::Full
        } else {
            Self::InheritExisting
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstallReason {
    #[default]
    Unknown,
    Policy,
    DeviceRestore,
    DeviceSetup,
    User,
}

/// Where the package bytes came from, as reported to the registry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PackageSource {
    #[default]
    Unspecified,
    Other,
    Store,
    LocalFile,
    DownloadedFile,
}

bitflags! {
    /// Install flags understood by the registry
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct InstallFlags: u32 {
        const REPLACE_EXISTING = 0x0000_0002;
        const ALLOW_TEST = 0x0000_0004;
        const FROM_ADB = 0x0000_0020;
        const REQUEST_DOWNGRADE = 0x0000_0080;
        const FULL_APP = 0x0000_4000;
        const BYPASS_LOW_TARGET_SDK_BLOCK = 0x0100_0000;
        const REQUEST_UPDATE_OWNERSHIP = 0x0200_0000;
    }
}

bitflags! {
    /// Flags for uninstall requests
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
    pub struct DeleteFlags: u32 {
        const KEEP_DATA = 0x0000_0001;
        const ALL_USERS = 0x0000_0002;
    }
}

/// Component enabled state for `set_package_enabled`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EnabledState {
    Enabled,
    DisabledUser,
}

/// Optional host features; each defaults to absent
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[allow(clippy::struct_excessive_bools)]
pub struct HostCapabilities {
    /// Sessions accept a package source
    pub package_source: bool,
    /// Session listings report the installer uid
    pub session_installer_uid: bool,
    pub bypass_low_target_block: bool,
    pub request_update_ownership: bool,
    /// A native "archive installed app" call exists
    pub native_archive: bool,
}

/// Parameters used to create a staged session
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionParams {
    pub mode: SessionMode,
    pub installer_package: Option<String>,
    pub package_source: PackageSource,
    pub referrer: Option<String>,
    pub originating_uri: Option<String>,
    pub originating_uid: Option<u32>,
    pub install_reason: InstallReason,
    pub app_package_name: Option<String>,
    pub app_label: Option<String>,
    pub app_icon: Option<Icon>,
    pub install_flags: InstallFlags,
}

impl SessionParams {
    #[must_use]
    pub fn new(mode: SessionMode) -> Self {
        Self {
            mode,
            installer_package: None,
            package_source: PackageSource::Unspecified,
            referrer: None,
            originating_uri: None,
            originating_uid: None,
            install_reason: InstallReason::Unknown,
            app_package_name: None,
            app_label: None,
            app_icon: None,
            install_flags: InstallFlags::empty(),
        }
    }
}

/// Snapshot of a staged session as listed by the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionInfo {
    pub session_id: SessionId,
    pub app_package_name: Option<String>,
    pub active: bool,
    pub mode: SessionMode,
    /// Only reported when the host has `session_installer_uid`
    pub installer_uid: Option<u32>,
    pub install_reason: InstallReason,
    pub install_flags: InstallFlags,
    pub app_label: Option<String>,
    pub app_icon: Option<Icon>,
}

impl SessionInfo {
    /// Whether this session was opened by the identity `uid`
    ///
    /// Hosts that do not report installer uids are matched on a user-initiated
    /// install reason plus the shell-origin flag instead.
    #[must_use]
    pub fn is_attributed_to(&self, uid: u32) -> bool {
        match self.installer_uid {
            Some(installer) => installer == uid,
            None => {
                self.install_reason == InstallReason::User
                    && self.install_flags.contains(InstallFlags::FROM_ADB)
            }
        }
    }
}

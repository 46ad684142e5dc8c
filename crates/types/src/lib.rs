#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Core type definitions for the pkgi package installer
//!
//! This crate provides the data model shared by every other crate:
//! package descriptors, registry snapshots, install-source requests,
//! staged-session parameters and the install stage state machine.

pub mod package;
pub mod request;
pub mod session;
pub mod stage;

pub use package::{ExistingPackageInfo, Icon, PackageDescriptor};
pub use request::{SourceLocator, SourceRequest};
pub use session::{
    DeleteFlags, EnabledState, HostCapabilities, InstallFlags, InstallReason, PackageSource,
    SessionId, SessionInfo, SessionMode, SessionParams, INVALID_SESSION_ID,
};
pub use stage::{AbortReason, InstallStage, InstallStatus, LaunchRef};

/// Payload file extension for installable parts
pub const PAYLOAD_EXTENSION: &str = ".apk";

/// Name of the manifest entry inside a single payload
pub const MANIFEST_ENTRY: &str = "AndroidManifest.xml";

/// Well-known app-store identity used for installer attribution
pub const STORE_INSTALLER: &str = "com.android.vending";

/// Shell identity used when no store is present on the host
pub const SHELL_INSTALLER: &str = "com.android.shell";

/// Number of uids reserved per host user
pub const PER_USER_RANGE: u32 = 100_000;

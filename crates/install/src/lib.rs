#![warn(clippy::pedantic)]
#![deny(clippy::all)]
#![allow(clippy::module_name_repetitions)]

//! Privileged package install orchestration for pkgi
//!
//! An [`Installer`] takes one install-source request at a time through
//! privilege selection, source resolution and one of three install paths:
//! a staged session on the privileged broker, `pm` through the elevated
//! shell, or install-existing for packages the registry already knows.
//! Installed packages can also be archived and optionally removed.
//!
//! Progress is observed through [`Installer::subscribe`]; diagnostic events
//! go to the optional [`EventSender`].

#[macro_use]
mod macros;
mod api;
mod archive;
mod backend;
mod broker;
mod content;
mod installer;
mod manifest;
mod payload;
mod reconcile;
mod registry;
mod resolver;
mod shell;
mod staged;
mod status;
mod verify;

#[cfg(test)]
mod testing;

pub use backend::{PrivilegeBackend, ROOT_UID};
pub use broker::{
    PackageBroker, PackageRegistry, StagedSession, INSTALL_PACKAGES_PERMISSION,
    KNOWN_PACKAGES_FLAG,
};
pub use content::{ContentResolver, FsContentResolver};
pub use installer::{Host, Installer};
pub use manifest::{parse_manifest, ManifestInfo};
pub use payload::BASE_PAYLOAD_NAME;
pub use registry::{ShellRegistry, UnavailableBroker};
pub use shell::{build_install_command, interpret_shell_output, quote, ShellOutcome};
pub use status::{status_channel, StatusReceiver, StatusSender};

pub use api::config::{InstallConfig, SHELL_CACHE_DIR};
pub use api::context::{ArchiveContext, InstallContext};

// Re-export EventSender for use by macros and contexts
pub use pkgi_events::EventSender;

//! Seams to the package registry and the privileged broker
//!
//! Both are consumed at their interface: the binary links host
//! implementations, tests link in-memory fakes.

use async_trait::async_trait;
use pkgi_errors::Error;
use pkgi_types::{
    DeleteFlags, EnabledState, ExistingPackageInfo, HostCapabilities, InstallReason, LaunchRef,
    SessionId, SessionInfo, SessionParams,
};
use std::io::Write;

use crate::status::StatusSender;

/// Capability the broker must hold for installs
pub const INSTALL_PACKAGES_PERMISSION: &str = "android.permission.INSTALL_PACKAGES";

/// Registry match flag that also returns packages known but not installed
pub const KNOWN_PACKAGES_FLAG: &str = "MATCH_KNOWN_PACKAGES";

/// An opened staged session
///
/// Used from blocking threads while payload bytes are streamed.
pub trait StagedSession: Send {
    /// Open a named payload slot for writing
    ///
    /// # Errors
    ///
    /// Returns an error if the session rejects the slot.
    fn open_write(&mut self, name: &str, size: u64) -> Result<Box<dyn Write + Send + '_>, Error>;

    /// Mark a split of the installed package for removal
    ///
    /// # Errors
    ///
    /// Returns an error if the session rejects the removal.
    fn remove_split(&mut self, split_name: &str) -> Result<(), Error>;
}

/// Read access to the host package registry
#[async_trait]
pub trait PackageRegistry: Send + Sync {
    /// Registry record for `package`
    ///
    /// Unknown packages are reported as `BrokerError::NotFound`.
    async fn package_info(&self, package: &str, flags: u32) -> Result<ExistingPackageInfo, Error>;

    /// Resolve an optional registry constant by name
    async fn query_flag(&self, name: &str) -> Option<u32>;

    async fn installer_of(&self, package: &str) -> Result<Option<String>, Error>;

    async fn launch_ref(&self, package: &str) -> Option<LaunchRef>;

    /// Whether `package` is installed as part of the system image
    async fn is_system_package(&self, package: &str) -> bool;

    async fn all_sessions(&self) -> Result<Vec<SessionInfo>, Error>;

    async fn session_info(&self, session_id: SessionId) -> Result<Option<SessionInfo>, Error>;

    /// Make a package known to the registry available to the current user
    async fn install_existing(&self, package: &str, reason: InstallReason) -> Result<(), Error>;

    /// Uid of the app serving a content authority
    async fn provider_uid(&self, authority: &str) -> Option<u32>;
}

/// Privileged IPC broker
#[async_trait]
pub trait PackageBroker: PackageRegistry {
    /// Whether the broker process answers
    async fn ping(&self) -> bool;

    /// Uid the broker runs as; staged sessions are attributed to it
    async fn uid(&self) -> u32;

    async fn check_self_permission(&self) -> bool;

    async fn check_remote_permission(&self, permission: &str) -> bool;

    fn capabilities(&self) -> HostCapabilities;

    /// Turn off the host's unknown-sources verification gate
    async fn disable_verifier(&self) -> Result<(), Error>;

    async fn create_session(&self, params: SessionParams) -> Result<SessionId, Error>;

    async fn open_session(&self, session_id: SessionId) -> Result<Box<dyn StagedSession>, Error>;

    /// Request a commit; the outcome arrives through `result`
    async fn commit_session(&self, session_id: SessionId, result: StatusSender) -> Result<(), Error>;

    async fn abandon_session(&self, session_id: SessionId) -> Result<(), Error>;

    /// Native "archive installed app" call
    async fn request_archive(&self, package: &str, result: StatusSender) -> Result<(), Error>;

    async fn uninstall(
        &self,
        package: &str,
        version_code: i64,
        flags: DeleteFlags,
        result: StatusSender,
    ) -> Result<(), Error>;

    async fn delete_cache(&self, package: &str, user_id: u32) -> Result<(), Error>;

    async fn set_enabled(&self, package: &str, state: EnabledState) -> Result<(), Error>;
}

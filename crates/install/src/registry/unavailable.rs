//! Broker placeholder for hosts without one

use async_trait::async_trait;
use pkgi_errors::{BrokerError, Error};
use pkgi_types::{
    DeleteFlags, EnabledState, ExistingPackageInfo, HostCapabilities, InstallReason, LaunchRef,
    SessionId, SessionInfo, SessionParams,
};

use crate::broker::{PackageBroker, PackageRegistry, StagedSession};
use crate::status::StatusSender;

/// A broker that never answers
#[derive(Debug, Clone, Copy, Default)]
pub struct UnavailableBroker;

fn unavailable<T>() -> Result<T, Error> {
    Err(BrokerError::Unavailable.into())
}

#[async_trait]
impl PackageRegistry for UnavailableBroker {
    async fn package_info(&self, _package: &str, _flags: u32) -> Result<ExistingPackageInfo, Error> {
        unavailable()
    }

    async fn query_flag(&self, _name: &str) -> Option<u32> {
        None
    }

    async fn installer_of(&self, _package: &str) -> Result<Option<String>, Error> {
        unavailable()
    }

    async fn launch_ref(&self, _package: &str) -> Option<LaunchRef> {
        None
    }

    async fn is_system_package(&self, _package: &str) -> bool {
        false
    }

    async fn all_sessions(&self) -> Result<Vec<SessionInfo>, Error> {
        unavailable()
    }

    async fn session_info(&self, _session_id: SessionId) -> Result<Option<SessionInfo>, Error> {
        unavailable()
    }

    async fn install_existing(&self, _package: &str, _reason: InstallReason) -> Result<(), Error> {
        unavailable()
    }

    async fn provider_uid(&self, _authority: &str) -> Option<u32> {
        None
    }
}

#[async_trait]
impl PackageBroker for UnavailableBroker {
    async fn ping(&self) -> bool {
        false
    }

    async fn uid(&self) -> u32 {
        0
    }

    async fn check_self_permission(&self) -> bool {
        false
    }

    async fn check_remote_permission(&self, _permission: &str) -> bool {
        false
    }

    fn capabilities(&self) -> HostCapabilities {
        HostCapabilities::default()
    }

    async fn disable_verifier(&self) -> Result<(), Error> {
        unavailable()
    }

    async fn create_session(&self, _params: SessionParams) -> Result<SessionId, Error> {
        unavailable()
    }

    async fn open_session(&self, _session_id: SessionId) -> Result<Box<dyn StagedSession>, Error> {
        unavailable()
    }

    async fn commit_session(&self, _session_id: SessionId, _result: StatusSender) -> Result<(), Error> {
        unavailable()
    }

    async fn abandon_session(&self, _session_id: SessionId) -> Result<(), Error> {
        unavailable()
    }

    async fn request_archive(&self, _package: &str, _result: StatusSender) -> Result<(), Error> {
        unavailable()
    }

    async fn uninstall(
        &self,
        _package: &str,
        _version_code: i64,
        _flags: DeleteFlags,
        _result: StatusSender,
    ) -> Result<(), Error> {
        unavailable()
    }

    async fn delete_cache(&self, _package: &str, _user_id: u32) -> Result<(), Error> {
        unavailable()
    }

    async fn set_enabled(&self, _package: &str, _state: EnabledState) -> Result<(), Error> {
        unavailable()
    }
}

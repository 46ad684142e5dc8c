//! Privilege backend selection

use pkgi_platform::{ElevatedShell, PlatformContext};
use std::fmt;

use crate::broker::{PackageBroker, INSTALL_PACKAGES_PERMISSION};

/// Uid commands run as through the elevated shell
pub const ROOT_UID: u32 = 0;

/// Backend bound at precheck; fixed for the rest of the request
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrivilegeBackend {
    /// Privileged IPC broker, attributing sessions to `uid`
    Broker { uid: u32 },
    /// `su -c` fallback
    ElevatedShell,
}

impl PrivilegeBackend {
    /// Uid staged sessions are attributed to
    #[must_use]
    pub fn uid(&self) -> u32 {
        match self {
            Self::Broker { uid } => *uid,
            Self::ElevatedShell => ROOT_UID,
        }
    }

    #[must_use]
    pub fn name(&self) -> &'static str {
        match self {
            Self::Broker { .. } => "broker",
            Self::ElevatedShell => "elevated_shell",
        }
    }

    #[must_use]
    pub fn is_shell(&self) -> bool {
        matches!(self, Self::ElevatedShell)
    }
}

impl fmt::Display for PrivilegeBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Broker must answer, hold its own permission and be allowed to install
async fn broker_usable(broker: &dyn PackageBroker) -> bool {
    if !broker.ping().await {
        tracing::debug!("broker not running");
        return false;
    }
    if !broker.check_self_permission().await {
        tracing::debug!("broker permission not granted");
        return false;
    }
    broker
        .check_remote_permission(INSTALL_PACKAGES_PERMISSION)
        .await
}

/// Pick the broker when usable, else the elevated shell, else nothing
pub(crate) async fn select_backend(
    broker: &dyn PackageBroker,
    shell: &ElevatedShell,
    ctx: &PlatformContext,
) -> Option<PrivilegeBackend> {
    if broker_usable(broker).await {
        return Some(PrivilegeBackend::Broker {
            uid: broker.uid().await,
        });
    }
    if shell.is_available(ctx).await {
        return Some(PrivilegeBackend::ElevatedShell);
    }
    None
}

//! Split installs against live sessions and the installed base

use pkgi_types::{
    AbortReason, ExistingPackageInfo, PackageDescriptor, SessionInfo, SessionMode,
};
use tracing::{debug, warn};

use crate::broker::PackageRegistry;

/// How an install request relates to what is already on the host
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct Reconciliation {
    pub(crate) full_mode: bool,
    /// Active session this run can keep writing into
    pub(crate) reused_session: Option<SessionInfo>,
}

impl Reconciliation {
    fn full() -> Self {
        Self {
            full_mode: true,
            reused_session: None,
        }
    }
}

/// Decide mode and session reuse for a resolved payload
///
/// Only splits need reconciling. A split is written into an active session
/// for the same package attributed to `uid` when one exists; otherwise it
/// needs an installed base with the exact same version code.
pub(crate) async fn reconcile(
    registry: &dyn PackageRegistry,
    descriptor: &PackageDescriptor,
    existing: Option<&ExistingPackageInfo>,
    uid: u32,
) -> Result<Reconciliation, AbortReason> {
    if !descriptor.is_split() {
        return Ok(Reconciliation::full());
    }

    let sessions = registry.all_sessions().await.unwrap_or_else(|e| {
        warn!(error = %e, "could not enumerate staged sessions");
        Vec::new()
    });

    for item in sessions {
        if !item.active
            || item.app_package_name.as_deref() != Some(descriptor.package_id.as_str())
            || !item.is_attributed_to(uid)
        {
            continue;
        }
        match registry.session_info(item.session_id).await {
            Ok(Some(info)) => {
                debug!(session_id = info.session_id, package = %descriptor.package_id, "reusing staged session");
                return Ok(Reconciliation {
                    full_mode: info.mode == SessionMode::Full,
                    reused_session: Some(info),
                });
            }
            Ok(None) => continue,
            Err(e) => {
                warn!(session_id = item.session_id, error = %e, "session vanished while reconciling");
            }
        }
    }

    match existing {
        Some(base) if base.version_code == descriptor.version_code => Ok(Reconciliation {
            full_mode: false,
            reused_session: None,
        }),
        _ => Err(AbortReason::SplitWithoutBase),
    }
}

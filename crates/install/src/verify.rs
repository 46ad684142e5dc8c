//! Post-install registry polling
//!
//! The registry may not list a freshly installed package right away, so
//! reads are retried for a bounded time. Only "not found" is retried.

use pkgi_events::EventEmitter;
use pkgi_types::{ExistingPackageInfo, InstallStage, PackageDescriptor};
use std::time::Duration;
use tracing::{debug, warn};

use crate::broker::PackageRegistry;
use crate::Installer;

pub(crate) async fn poll_package(
    registry: &dyn PackageRegistry,
    package: &str,
    attempts: u32,
    interval: Duration,
) -> Option<ExistingPackageInfo> {
    for attempt in 1..=attempts {
        match registry.package_info(package, 0).await {
            Ok(info) => return Some(info),
            Err(e) if e.is_not_found() => {
                debug!(package, attempt, "package not visible yet");
                tokio::time::sleep(interval).await;
            }
            Err(e) => {
                warn!(package, error = %e, "registry read failed, giving up");
                return None;
            }
        }
    }
    None
}

impl Installer {
    /// Confirm a successful install and publish `Success`
    ///
    /// `Success` is published whether or not the poll sees the package.
    pub(crate) async fn verify_and_finish(
        &self,
        mut descriptor: PackageDescriptor,
    ) -> Option<ExistingPackageInfo> {
        let registry = self.registry();
        let launch = registry.launch_ref(&descriptor.package_id).await;
        let info = poll_package(
            registry.as_ref(),
            &descriptor.package_id,
            self.config.verify_attempts,
            self.config.verify_interval,
        )
        .await;

        match &info {
            Some(fresh) => {
                if fresh.icon.is_some() {
                    descriptor.icon.clone_from(&fresh.icon);
                }
                if fresh.label.is_some() {
                    descriptor.label.clone_from(&fresh.label);
                }
            }
            None => self.emit_package_warning(
                "installed package is not visible in the registry yet",
                descriptor.package_id.clone(),
            ),
        }
        self.set_descriptor(descriptor.clone());

        self.emitter.publish(InstallStage::Success {
            descriptor,
            launch,
            archive_path: None,
        });
        info
    }
}

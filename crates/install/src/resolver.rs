//! Source resolution
//!
//! Turns the bound request into a [`PackageDescriptor`] plus the next
//! stage: `UserAction`, `PackageAction` or `Aborted`.

use pkgi_events::{AppEvent, EventEmitter, InstallEvent};
use pkgi_types::{
    package::archive_name, AbortReason, ExistingPackageInfo, InstallStage, SourceLocator,
    INVALID_SESSION_ID,
};
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use crate::payload::parse_container;
use crate::reconcile::reconcile;
use crate::Installer;

/// Whether `file_name` is `{stem}.zip` or a `{stem} (N).zip` duplicate
pub(crate) fn is_archive_for(file_name: &str, expected: &str) -> bool {
    if file_name == expected {
        return true;
    }
    let Some(stem) = expected.strip_suffix(".zip") else {
        return false;
    };
    file_name
        .strip_prefix(stem)
        .and_then(|rest| rest.strip_prefix(" ("))
        .and_then(|rest| rest.strip_suffix(").zip"))
        .is_some_and(|n| !n.is_empty() && n.chars().all(|c| c.is_ascii_digit()))
}

/// Look for a previously produced archive of `package` at `version_code`
pub(crate) async fn find_archive(dir: &Path, package: &str, version_code: i64) -> Option<PathBuf> {
    let expected = archive_name(package, version_code);
    let exact = dir.join(&expected);
    if tokio::fs::try_exists(&exact).await.unwrap_or(false) {
        return Some(exact);
    }

    let mut entries = tokio::fs::read_dir(dir).await.ok()?;
    let mut candidates = Vec::new();
    while let Ok(Some(entry)) = entries.next_entry().await {
        let name = entry.file_name().to_string_lossy().into_owned();
        if is_archive_for(&name, &expected) {
            candidates.push(entry.path());
        }
    }
    candidates.sort();
    candidates.into_iter().next()
}

impl Installer {
    /// Resolve a package the registry already knows by name
    pub(crate) async fn resolve_by_name(&self, package: &str) -> InstallStage {
        let flags = self.known_packages_flag().await;
        let info = match self.registry().package_info(package, flags).await {
            Ok(info) => info,
            Err(e) => {
                if !e.is_not_found() {
                    warn!(package, error = %e, "registry read failed");
                }
                return InstallStage::aborted(AbortReason::NotFound);
            }
        };

        let descriptor = info.to_descriptor();
        self.set_descriptor(descriptor.clone());

        if !info.base_payload_exists() {
            if let Some(path) =
                find_archive(&self.config.archive_dir, &info.package_id, info.version_code).await
            {
                debug!(package, archive = %path.display(), "installing from archive");
                return self.resolve_by_content(SourceLocator::File(path)).await;
            }
        } else if info.installed {
            return InstallStage::PackageAction {
                descriptor,
                existing: info,
            };
        }

        InstallStage::UserAction {
            descriptor,
            existing: Some(info),
            full_mode: true,
            skip_create: false,
        }
    }

    /// Resolve an openable source by reading its payload
    pub(crate) async fn resolve_by_content(&self, locator: SourceLocator) -> InstallStage {
        self.state().source = Some(locator.clone());
        let registry = self.registry();
        if let Some(authority) = locator.authority() {
            if let Some(uid) = registry.provider_uid(authority).await {
                self.state().calling_uid = Some(uid);
            }
        }

        let content = self.host.content.clone();
        let source = locator.clone();
        let parsed = tokio::task::spawn_blocking(move || {
            let file = content.open(&source)?;
            parse_container(file)
        })
        .await;

        let mut descriptor = match parsed {
            Ok(Ok(descriptor)) => descriptor,
            Ok(Err(e)) => {
                warn!(locator = ?locator, error = %e, "failed to parse payload");
                return InstallStage::aborted(AbortReason::ParseError);
            }
            Err(e) => {
                warn!(error = %e, "payload parser task failed");
                return InstallStage::aborted(AbortReason::ParseError);
            }
        };

        let flags = self.known_packages_flag().await;
        let mut existing: Option<ExistingPackageInfo> =
            match registry.package_info(&descriptor.package_id, flags).await {
                Ok(info) => Some(info),
                Err(e) => {
                    if !e.is_not_found() {
                        debug!(package = %descriptor.package_id, error = %e, "no prior registry record");
                    }
                    None
                }
            };

        let uid = self.backend().map_or(0, |b| b.uid());
        let reconciliation =
            match reconcile(registry.as_ref(), &descriptor, existing.as_ref(), uid).await {
                Ok(r) => r,
                Err(reason) => return InstallStage::aborted(reason),
            };

        let mut session_id = INVALID_SESSION_ID;
        if let Some(session) = reconciliation.reused_session {
            session_id = session.session_id;
            descriptor.label = session.app_label;
            descriptor.icon = session.app_icon;
            self.emit(AppEvent::Install(InstallEvent::SessionReused {
                session_id,
                package: descriptor.package_id.clone(),
            }));
        }

        if let Some(old) = existing.as_mut() {
            if descriptor.label.is_none() {
                descriptor.label.clone_from(&old.label);
            }
            if descriptor.icon.is_none() {
                descriptor.icon.clone_from(&old.icon);
            }
            match registry.installer_of(&descriptor.package_id).await {
                Ok(installer) => old.installer = installer,
                Err(e) => debug!(error = %e, "installer attribution unavailable"),
            }
        }

        if descriptor.label.is_none() {
            descriptor.label = self.host.content.display_name(&locator);
        }

        {
            let mut state = self.state();
            state.descriptor = Some(descriptor.clone());
            state.session_id = session_id;
        }

        InstallStage::UserAction {
            descriptor,
            existing,
            full_mode: reconciliation.full_mode,
            skip_create: session_id != INVALID_SESSION_ID,
        }
    }
}

//! Archive / uninstall driver
//!
//! Packs the installed payloads of a package into a single zip under the
//! archive directory and optionally removes the package afterwards, keeping
//! its data so the archive can be installed again later.

use pkgi_errors::{Error, InstallError};
use pkgi_events::{AppEvent, EventEmitter, FailureContext, InstallEvent};
use pkgi_types::{
    AbortReason, DeleteFlags, ExistingPackageInfo, InstallStage, InstallStatus, LaunchRef,
};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::backend::PrivilegeBackend;
use crate::payload::{copy_with_progress, ProgressCounter, BASE_PAYLOAD_NAME};
use crate::shell::{interpret_shell_output, quote, ShellOutcome};
use crate::status::status_channel;
use crate::{ArchiveContext, Installer};

const ARCHIVE_MIME: &str = "application/zip";
const PENDING_PREFIX: &str = ".pending-";

fn archive_failed(path: &Path, message: impl Into<String>) -> Error {
    InstallError::ArchiveFailed {
        path: path.display().to_string(),
        message: message.into(),
    }
    .into()
}

/// First free `{stem}.zip`, `{stem} (1).zip`, `{stem} (2).zip`, … in `dir`
pub(crate) fn unique_archive_path(dir: &Path, name: &str) -> PathBuf {
    let first = dir.join(name);
    if !first.exists() {
        return first;
    }
    let stem = name.strip_suffix(".zip").unwrap_or(name);
    let mut n = 1u32;
    loop {
        let candidate = dir.join(format!("{stem} ({n}).zip"));
        if !candidate.exists() {
            return candidate;
        }
        n += 1;
    }
}

/// Entry names for the payloads of `existing`, base first
fn archive_entries(existing: &ExistingPackageInfo) -> Vec<(String, PathBuf)> {
    let mut entries = Vec::new();
    if let Some(base) = &existing.base_path {
        entries.push((BASE_PAYLOAD_NAME.to_string(), base.clone()));
    }
    for split in &existing.split_paths {
        let name = split
            .file_name()
            .map_or_else(|| split.display().to_string(), |n| n.to_string_lossy().into_owned());
        entries.push((name, split.clone()));
    }
    entries
}

/// Write every installed payload of `existing` into a new archive in `dir`
///
/// Bytes go to a hidden placeholder first, which is renamed once the
/// archive is complete. Returns the absolute path and the entry count.
pub(crate) fn write_archive<F: FnMut(u8)>(
    dir: &Path,
    existing: &ExistingPackageInfo,
    report: F,
) -> Result<(PathBuf, usize), Error> {
    std::fs::create_dir_all(dir).map_err(|e| Error::io_with_path(&e, dir))?;

    let entries = archive_entries(existing);
    if entries.is_empty() {
        return Err(InstallError::NoPayloads {
            path: existing.package_id.clone(),
        }
        .into());
    }

    let name = pkgi_types::package::archive_name(&existing.package_id, existing.version_code);
    let destination = unique_archive_path(dir, &name);
    let final_name = destination
        .file_name()
        .map_or_else(|| name.clone(), |n| n.to_string_lossy().into_owned());
    let pending = dir.join(format!("{PENDING_PREFIX}{final_name}"));

    let result = write_entries(&pending, &entries, report)
        .and_then(|()| {
            std::fs::rename(&pending, &destination)
                .map_err(|e| Error::io_with_path(&e, &destination))
        })
        .and_then(|()| {
            destination
                .canonicalize()
                .map_err(|e| Error::io_with_path(&e, &destination))
        });

    match result {
        Ok(path) => Ok((path, entries.len())),
        Err(e) => {
            for leftover in [&pending, &destination] {
                if leftover.exists() {
                    if let Err(remove) = std::fs::remove_file(leftover) {
                        debug!(path = %leftover.display(), error = %remove, "could not remove partial archive");
                    }
                }
            }
            Err(e)
        }
    }
}

fn write_entries<F: FnMut(u8)>(
    pending: &Path,
    entries: &[(String, PathBuf)],
    report: F,
) -> Result<(), Error> {
    let mut total = 0u64;
    for (_, path) in entries {
        total += std::fs::metadata(path)
            .map_err(|e| Error::io_with_path(&e, path))?
            .len();
    }

    let file = File::create(pending).map_err(|e| Error::io_with_path(&e, pending))?;
    let mut writer = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Stored)
        .large_file(total > u64::from(u32::MAX));
    let mut progress = ProgressCounter::new(total, report);

    for (name, path) in entries {
        let mut input = File::open(path).map_err(|e| Error::io_with_path(&e, path))?;
        writer
            .start_file(name.as_str(), options)
            .map_err(|e| archive_failed(pending, e.to_string()))?;
        copy_with_progress(&mut input, &mut writer, &mut progress)
            .map_err(|e| Error::io_with_path(&e, path))?;
    }

    let file = writer
        .finish()
        .map_err(|e| archive_failed(pending, e.to_string()))?;
    file.sync_all().map_err(|e| Error::io_with_path(&e, pending))?;
    progress.finish();
    Ok(())
}

impl Installer {
    /// Archive an installed package, optionally uninstalling it afterwards
    ///
    /// Publishes `Success` carrying the archive path; an uninstall failure
    /// is appended to that path rather than failing the operation.
    pub async fn archive_package(&self, existing: ExistingPackageInfo, ctx: ArchiveContext) {
        let descriptor = existing.to_descriptor();
        self.set_descriptor(descriptor.clone());
        self.emitter.publish(InstallStage::Installing {
            descriptor: descriptor.clone(),
        });
        self.emitter.set_progress(0);

        let dir = self.config.archive_dir.clone();
        let snapshot = existing.clone();
        let emitter = self.emitter.clone();
        let written = tokio::task::spawn_blocking(move || {
            write_archive(&dir, &snapshot, |percent| emitter.set_progress(percent))
        })
        .await
        .map_err(|e| {
            Error::from(InstallError::TaskError {
                message: e.to_string(),
            })
        })
        .and_then(|result| result);

        let (path, entries) = match written {
            Ok(written) => written,
            Err(e) => {
                warn!(package = %existing.package_id, error = %e, "failed to write archive");
                self.emitter
                    .publish(InstallStage::aborted(AbortReason::WriteError));
                return;
            }
        };
        info!(package = %existing.package_id, path = %path.display(), entries, "archive written");
        self.emit(AppEvent::Install(InstallEvent::ArchiveWritten {
            path: path.clone(),
            entries,
        }));

        let launch = Some(LaunchRef::View {
            path: path.clone(),
            mime: ARCHIVE_MIME.to_string(),
        });
        let mut archive_path = path.display().to_string();

        if ctx.also_uninstall {
            self.emitter.set_progress(pkgi_events::PROGRESS_COMMITTING);
            let status = self.uninstall_keeping_data(&existing).await;
            if !status.is_success() {
                let message = status
                    .message
                    .unwrap_or_else(|| format!("uninstall failed ({})", status.legacy_status));
                archive_path = format!("{archive_path}\n\n{message}");
            }
        }

        self.emitter.publish(InstallStage::Success {
            descriptor,
            launch,
            archive_path: Some(archive_path),
        });
    }

    async fn uninstall_keeping_data(&self, existing: &ExistingPackageInfo) -> InstallStatus {
        match self.backend() {
            Some(PrivilegeBackend::ElevatedShell) => {
                let command = format!("pm uninstall -k {}", quote(&existing.package_id));
                match self.host.shell.run(&self.platform, &command).await {
                    Ok(output) => {
                        match interpret_shell_output(&output.stdout_lossy(), &output.stderr_lossy())
                        {
                            ShellOutcome::Success => InstallStatus::success(),
                            ShellOutcome::Failure(message) => InstallStatus::internal_error(message),
                        }
                    }
                    Err(e) => InstallStatus::internal_error(e.to_string()),
                }
            }
            Some(PrivilegeBackend::Broker { .. }) => self.broker_archive(existing).await,
            None => InstallStatus::internal_error(InstallError::NoPrivilege.to_string()),
        }
    }

    /// Native archive when the host has it, plain keep-data uninstall otherwise
    async fn broker_archive(&self, existing: &ExistingPackageInfo) -> InstallStatus {
        let broker = &self.host.broker;
        let package = existing.package_id.as_str();

        if broker.capabilities().native_archive {
            let (tx, rx) = status_channel();
            match broker.request_archive(package, tx).await {
                Ok(()) => return rx.recv().await,
                Err(e) if e.is_not_found() => {
                    debug!(package, "native archive unavailable, uninstalling");
                    self.emit_note("native archive unavailable, falling back to uninstall");
                }
                Err(e) => return InstallStatus::internal_error(e.to_string()),
            }
        }

        let (tx, rx) = status_channel();
        if let Err(e) = broker
            .uninstall(package, existing.version_code, DeleteFlags::KEEP_DATA, tx)
            .await
        {
            return InstallStatus::internal_error(e.to_string());
        }
        let status = rx.recv().await;

        if let Err(e) = broker.delete_cache(package, existing.user_id()).await {
            debug!(package, error = %e, "could not clear package cache");
            self.emit(AppEvent::Install(InstallEvent::StepSkipped {
                step: "delete_cache".to_string(),
                failure: FailureContext::from_error(&e),
            }));
        }
        status
    }
}

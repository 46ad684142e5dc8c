//! Elevated-shell install driver
//!
//! Installs through `pm install` / `pm install-multiple` run via `su -c`.
//! Payloads are first made available as local files, the command output is
//! buffered in full and the cache is emptied whatever the outcome.

use pkgi_errors::Error;
use pkgi_types::{InstallStatus, PackageDescriptor, SourceLocator};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, warn};

use crate::payload::extract_payloads;
use crate::{InstallContext, Installer};

const PM_FAILED: &str = "pm command failed";

/// Interpretation of `pm` output
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShellOutcome {
    Success,
    Failure(String),
}

/// Decide whether a `pm` invocation succeeded
///
/// Any line reading `Success` (any case) wins over other noise. Otherwise
/// the first line starting with `Failure`, or with `Error` in any case, is
/// the message; failing that, every non-blank line joined.
#[must_use]
pub fn interpret_shell_output(stdout: &str, stderr: &str) -> ShellOutcome {
    let lines: Vec<&str> = stdout.lines().chain(stderr.lines()).map(str::trim).collect();

    if lines.iter().any(|line| line.eq_ignore_ascii_case("success")) {
        return ShellOutcome::Success;
    }

    let failure = lines.iter().find(|line| {
        line.starts_with("Failure")
            || line
                .get(..5)
                .is_some_and(|prefix| prefix.eq_ignore_ascii_case("error"))
    });
    let message = match failure {
        Some(line) => (*line).to_string(),
        None => {
            let joined = lines
                .iter()
                .filter(|line| !line.is_empty())
                .copied()
                .collect::<Vec<_>>()
                .join("\n");
            if joined.is_empty() {
                PM_FAILED.to_string()
            } else {
                joined
            }
        }
    };
    ShellOutcome::Failure(message)
}

/// Single-quote an argument for `sh -c`
#[must_use]
pub fn quote(arg: &str) -> String {
    format!("'{}'", arg.replace('\'', r"'\''"))
}

/// `pm install` for one payload, `pm install-multiple` for several
#[must_use]
pub fn build_install_command(files: &[PathBuf], installer: Option<&str>) -> String {
    let verb = if files.len() > 1 {
        "install-multiple"
    } else {
        "install"
    };
    let mut command = format!("pm {verb} -r -d -t");
    if let Some(installer) = installer {
        command.push_str(" --installer ");
        command.push_str(&quote(installer));
    }
    for file in files {
        command.push(' ');
        command.push_str(&quote(&file.display().to_string()));
    }
    command
}

fn file_name_of(path: &Path) -> Option<&str> {
    path.file_name().and_then(|n| n.to_str())
}

async fn clear_dir(dir: &Path) {
    let Ok(mut entries) = tokio::fs::read_dir(dir).await else {
        return;
    };
    while let Ok(Some(entry)) = entries.next_entry().await {
        if let Err(e) = tokio::fs::remove_file(entry.path()).await {
            debug!(path = %entry.path().display(), error = %e, "could not remove cache file");
        }
    }
}

impl Installer {
    pub(crate) async fn shell_install(&self, descriptor: PackageDescriptor, ctx: &InstallContext) {
        let cache = self.config.shell_cache_dir();
        let status = match self.run_shell_install(&descriptor, ctx, &cache).await {
            Ok(status) => status,
            Err(e) => {
                warn!(package = %descriptor.package_id, error = %e, "shell install failed");
                InstallStatus::internal_error(e.to_string())
            }
        };
        clear_dir(&cache).await;

        if status.is_success() {
            tokio::time::sleep(self.config.settle_delay).await;
        }
        self.finish_with_status(descriptor, status).await;
    }

    async fn run_shell_install(
        &self,
        descriptor: &PackageDescriptor,
        ctx: &InstallContext,
        cache: &Path,
    ) -> Result<InstallStatus, Error> {
        tokio::fs::create_dir_all(cache)
            .await
            .map_err(|e| Error::io_with_path(&e, cache))?;

        let source = match self.source() {
            Some(SourceLocator::File(path)) => Some(path),
            Some(locator @ SourceLocator::Content(_)) => {
                self.copy_to_cache(locator, cache, descriptor.is_bundle).await
            }
            _ => None,
        };
        let Some(source) = source.filter(|path| path.exists()) else {
            return Ok(InstallStatus::internal_error("Source APK not found"));
        };

        let files = if ctx.remove_split {
            match self.payloads_without_split(descriptor).await {
                Ok(files) => files,
                Err(e) => {
                    return Ok(InstallStatus::internal_error(format!(
                        "Failed to prepare split removal: {e}"
                    )))
                }
            }
        } else if descriptor.is_split() {
            self.payloads_with_split(descriptor, &source).await
        } else if descriptor.is_bundle {
            let dest = cache.to_path_buf();
            let extracted =
                tokio::task::spawn_blocking(move || extract_payloads(&source, &dest)).await;
            match extracted {
                Ok(Ok(files)) => files,
                Ok(Err(e)) => {
                    return Ok(InstallStatus::internal_error(format!("Zip extract failed: {e}")))
                }
                Err(e) => {
                    return Ok(InstallStatus::internal_error(format!("Zip extract failed: {e}")))
                }
            }
        } else {
            vec![source]
        };

        let installer = ctx
            .set_installer
            .then_some(self.config.store_installer.as_str());
        let command = build_install_command(&files, installer);
        let output = self.host.shell.run(&self.platform, &command).await?;

        match interpret_shell_output(&output.stdout_lossy(), &output.stderr_lossy()) {
            ShellOutcome::Success => Ok(InstallStatus::success()),
            ShellOutcome::Failure(message) => Ok(InstallStatus::internal_error(message)),
        }
    }

    /// Copy a content source into the shell cache
    async fn copy_to_cache(
        &self,
        locator: SourceLocator,
        cache: &Path,
        bundle: bool,
    ) -> Option<PathBuf> {
        let extension = if bundle { "zip" } else { "apk" };
        let dest = cache.join(format!(
            "apk_{}.{extension}",
            chrono::Utc::now().timestamp_millis()
        ));
        let content = Arc::clone(&self.host.content);
        let target = dest.clone();
        let copied = tokio::task::spawn_blocking(move || -> Result<u64, Error> {
            let mut input = content.open(&locator)?;
            let mut output = std::fs::File::create(&target)?;
            Ok(std::io::copy(&mut input, &mut output)?)
        })
        .await;

        match copied {
            Ok(Ok(bytes)) => {
                debug!(path = %dest.display(), bytes, "copied source into cache");
                Some(dest)
            }
            Ok(Err(e)) => {
                warn!(error = %e, "could not copy source into cache");
                None
            }
            Err(e) => {
                warn!(error = %e, "copy task failed");
                None
            }
        }
    }

    /// Installed payloads minus the split being removed
    async fn payloads_without_split(
        &self,
        descriptor: &PackageDescriptor,
    ) -> Result<Vec<PathBuf>, Error> {
        let info = self.registry().package_info(&descriptor.package_id, 0).await?;
        let base = info.base_path.clone().ok_or_else(|| pkgi_errors::InstallError::SourceNotFound {
            path: format!("{} base payload", descriptor.package_id),
        })?;
        let split = descriptor.split_name.as_deref().unwrap_or_default();
        let mut files = vec![base];
        files.extend(
            info.split_paths
                .into_iter()
                .filter(|path| split.is_empty() || !path.to_string_lossy().contains(split)),
        );
        Ok(files)
    }

    /// Installed base and other splits plus the new split
    ///
    /// Without a readable registry record only the new split is installed.
    async fn payloads_with_split(&self, descriptor: &PackageDescriptor, source: &Path) -> Vec<PathBuf> {
        let info = match self.registry().package_info(&descriptor.package_id, 0).await {
            Ok(info) => info,
            Err(e) => {
                debug!(error = %e, "installing split alone");
                return vec![source.to_path_buf()];
            }
        };
        let Some(base) = info.base_path else {
            return vec![source.to_path_buf()];
        };
        let source_name = file_name_of(source);
        let mut files = vec![base];
        files.extend(
            info.split_paths
                .into_iter()
                .filter(|path| file_name_of(path) != source_name),
        );
        files.push(source.to_path_buf());
        files
    }
}

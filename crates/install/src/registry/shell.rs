//! Package registry read through `pm`, `dumpsys` and `cmd package`

use async_trait::async_trait;
use pkgi_errors::{BrokerError, Error, PlatformError};
use pkgi_platform::{CommandOutput, ElevatedShell, PlatformContext};
use pkgi_types::{ExistingPackageInfo, InstallReason, LaunchRef, SessionId, SessionInfo};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::debug;

use crate::broker::PackageRegistry;
use crate::shell::quote;

const SYSTEM_FLAG: &str = "SYSTEM";

/// Fields of interest from one `dumpsys package <pkg>` record
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub(crate) struct DumpsysRecord {
    pub(crate) version_code: i64,
    pub(crate) uid: u32,
    pub(crate) installer: Option<String>,
    pub(crate) installed: bool,
    pub(crate) system: bool,
}

/// Parse `dumpsys package <package>`; `None` when the package is unknown
pub(crate) fn parse_dumpsys(output: &str, package: &str) -> Option<DumpsysRecord> {
    let header = format!("Package [{package}]");
    let mut lines = output.lines().skip_while(|line| !line.contains(&header));
    lines.next()?;

    let mut record = DumpsysRecord::default();
    let mut saw_user = false;
    for line in lines {
        let trimmed = line.trim();
        if trimmed.starts_with("Package [") {
            break;
        }
        for token in trimmed.split_whitespace() {
            if let Some(value) = token.strip_prefix("versionCode=") {
                record.version_code = value.parse().unwrap_or(record.version_code);
            } else if let Some(value) = token.strip_prefix("userId=") {
                record.uid = value.parse().unwrap_or(record.uid);
            } else if let Some(value) = token.strip_prefix("installerPackageName=") {
                if value != "null" {
                    record.installer = Some(value.to_string());
                }
            } else if let Some(value) = token.strip_prefix("installed=") {
                // First user block is the current user
                if !saw_user {
                    record.installed = value == "true";
                    saw_user = true;
                }
            }
        }
        if trimmed.starts_with("pkgFlags=[") && trimmed.split_whitespace().any(|f| f == SYSTEM_FLAG) {
            record.system = true;
        }
    }
    Some(record)
}

/// Parse `pm path <package>` into base and split payload paths
pub(crate) fn parse_pm_path(output: &str) -> (Option<PathBuf>, Vec<PathBuf>) {
    let paths: Vec<PathBuf> = output
        .lines()
        .filter_map(|line| line.trim().strip_prefix("package:"))
        .map(PathBuf::from)
        .collect();
    let base = paths
        .iter()
        .position(|p| p.file_name().is_some_and(|n| n == "base.apk"))
        .or(if paths.is_empty() { None } else { Some(0) });
    match base {
        Some(index) => {
            let mut splits = paths;
            let base = splits.remove(index);
            (Some(base), splits)
        }
        None => (None, Vec::new()),
    }
}

/// Parse `cmd package resolve-activity --brief` into a launch entry point
pub(crate) fn parse_resolve_activity(output: &str, package: &str) -> Option<LaunchRef> {
    let line = output.lines().rev().map(str::trim).find(|l| l.contains('/'))?;
    let (owner, component) = line.split_once('/')?;
    (owner == package).then(|| LaunchRef::Activity {
        package: owner.to_string(),
        component: component.to_string(),
    })
}

/// [`PackageRegistry`] backed by the elevated shell
///
/// Session enumeration and provider lookups have no shell equivalent and
/// report nothing.
pub struct ShellRegistry {
    shell: Arc<ElevatedShell>,
    platform: PlatformContext,
}

impl ShellRegistry {
    #[must_use]
    pub fn new(shell: Arc<ElevatedShell>, platform: PlatformContext) -> Self {
        Self { shell, platform }
    }

    async fn run(&self, command: &str) -> Result<CommandOutput, Error> {
        self.shell.run(&self.platform, command).await
    }

    async fn dumpsys(&self, package: &str) -> Result<DumpsysRecord, Error> {
        let output = self
            .run(&format!("dumpsys package {}", quote(package)))
            .await?;
        parse_dumpsys(&output.stdout_lossy(), package).ok_or_else(|| {
            BrokerError::NotFound {
                package: package.to_string(),
            }
            .into()
        })
    }
}

impl std::fmt::Debug for ShellRegistry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ShellRegistry")
            .field("shell", &self.shell)
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl PackageRegistry for ShellRegistry {
    async fn package_info(&self, package: &str, _flags: u32) -> Result<ExistingPackageInfo, Error> {
        let record = self.dumpsys(package).await?;
        let output = self.run(&format!("pm path {}", quote(package))).await?;
        let (base_path, split_paths) = if output.success() {
            parse_pm_path(&output.stdout_lossy())
        } else {
            (None, Vec::new())
        };

        Ok(ExistingPackageInfo {
            package_id: package.to_string(),
            version_code: record.version_code,
            label: None,
            icon: None,
            installer: record.installer,
            installed: record.installed && base_path.is_some(),
            base_path,
            split_paths,
            uid: record.uid,
        })
    }

    async fn query_flag(&self, _name: &str) -> Option<u32> {
        None
    }

    async fn installer_of(&self, package: &str) -> Result<Option<String>, Error> {
        Ok(self.dumpsys(package).await?.installer)
    }

    async fn launch_ref(&self, package: &str) -> Option<LaunchRef> {
        let command = format!("cmd package resolve-activity --brief {}", quote(package));
        match self.run(&command).await {
            Ok(output) if output.success() => {
                parse_resolve_activity(&output.stdout_lossy(), package)
            }
            Ok(_) => None,
            Err(e) => {
                debug!(package, error = %e, "could not resolve launch activity");
                None
            }
        }
    }

    async fn is_system_package(&self, package: &str) -> bool {
        self.dumpsys(package).await.is_ok_and(|record| record.system)
    }

    async fn all_sessions(&self) -> Result<Vec<SessionInfo>, Error> {
        Ok(Vec::new())
    }

    async fn session_info(&self, _session_id: SessionId) -> Result<Option<SessionInfo>, Error> {
        Ok(None)
    }

    async fn install_existing(&self, package: &str, _reason: InstallReason) -> Result<(), Error> {
        let command = format!("pm install-existing {}", quote(package));
        let output = self.run(&command).await?;
        let stdout = output.stdout_lossy();
        if stdout.contains("doesn't exist") {
            return Err(BrokerError::NotFound {
                package: package.to_string(),
            }
            .into());
        }
        if output.success() {
            Ok(())
        } else {
            Err(PlatformError::UnexpectedOutput {
                command,
                message: format!("{}{}", stdout.trim(), output.stderr_lossy().trim()),
            }
            .into())
        }
    }

    async fn provider_uid(&self, _authority: &str) -> Option<u32> {
        None
    }
}

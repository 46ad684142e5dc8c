//! Structured logging integration for events
//!
//! Converts domain events into tracing records with structured fields so a
//! `--debug` log file carries the full event stream.

use pkgi_events::{AppEvent, GeneralEvent, InstallEvent, PlatformEvent};
use tracing::{debug, error, info, warn};

/// Log an `AppEvent` through tracing with structured fields
pub fn log_event_with_tracing(event: &AppEvent) {
    let target = event.log_target();
    match event {
        AppEvent::General(general) => match general {
            GeneralEvent::Warning { message, package } => {
                warn!(target: "pkgi::events", source = target, package = ?package, "{message}");
            }
            GeneralEvent::Note { message } => {
                debug!(target: "pkgi::events", source = target, "{message}");
            }
            GeneralEvent::OperationStarted { operation } => {
                info!(target: "pkgi::events", operation = %operation, "Operation started");
            }
            GeneralEvent::OperationCompleted { operation, success } => {
                info!(target: "pkgi::events", operation = %operation, success, "Operation completed");
            }
            GeneralEvent::OperationFailed { operation, error } => {
                error!(target: "pkgi::events", operation = %operation, error = %error, "Operation failed");
            }
        },

        AppEvent::Install(install) => match install {
            InstallEvent::BackendSelected { backend, uid } => {
                info!(target: "pkgi::events", backend = %backend, uid, "Backend selected");
            }
            InstallEvent::StageChanged { stage, package } => {
                if event.log_level() == tracing::Level::WARN {
                    warn!(target: "pkgi::events", stage = %stage, package = ?package, "Stage changed");
                } else {
                    info!(target: "pkgi::events", stage = %stage, package = ?package, "Stage changed");
                }
            }
            InstallEvent::ProgressUpdated { value } => {
                debug!(target: "pkgi::events", value, "Progress updated");
            }
            InstallEvent::SessionCreated {
                session_id,
                package,
            } => {
                info!(target: "pkgi::events", session_id, package = %package, "Session created");
            }
            InstallEvent::SessionReused {
                session_id,
                package,
            } => {
                info!(target: "pkgi::events", session_id, package = %package, "Session reused");
            }
            InstallEvent::SessionAbandoned { session_id } => {
                warn!(target: "pkgi::events", session_id, "Session abandoned");
            }
            InstallEvent::PayloadStaged { name, bytes } => {
                debug!(target: "pkgi::events", name = %name, bytes, "Payload staged");
            }
            InstallEvent::CommitRequested { session_id } => {
                info!(target: "pkgi::events", session_id, "Commit requested");
            }
            InstallEvent::ArchiveWritten { path, entries } => {
                info!(target: "pkgi::events", path = %path.display(), entries, "Archive written");
            }
            InstallEvent::StepSkipped { step, failure } => {
                warn!(
                    target: "pkgi::events",
                    step = %step,
                    code = ?failure.code,
                    retryable = failure.retryable,
                    hint = ?failure.hint,
                    "Step skipped: {}",
                    failure.message
                );
            }
        },

        AppEvent::Platform(platform) => match platform {
            PlatformEvent::ProcessExecutionStarted { command, args } => {
                debug!(target: "pkgi::events", command = %command, args = ?args, "Process started");
            }
            PlatformEvent::ProcessExecutionCompleted {
                command,
                exit_code,
                duration_ms,
                stdout_bytes,
                stderr_bytes,
            } => {
                info!(
                    target: "pkgi::events",
                    command = %command,
                    exit_code = ?exit_code,
                    duration_ms,
                    stdout_bytes,
                    stderr_bytes,
                    "Process completed"
                );
            }
            PlatformEvent::ProcessExecutionFailed {
                command,
                error_message,
                duration_ms,
            } => {
                error!(
                    target: "pkgi::events",
                    command = %command,
                    duration_ms,
                    error = %error_message,
                    "Process failed"
                );
            }
            PlatformEvent::CapabilityCheckCompleted {
                capability,
                available,
            } => {
                info!(target: "pkgi::events", capability = %capability, available, "Capability checked");
            }
        },
    }
}

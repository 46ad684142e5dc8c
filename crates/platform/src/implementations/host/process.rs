//! Host process operations implementation
//!
//! Wraps `tokio::process::Command` with event emission, timeouts and
//! error mapping.

use async_trait::async_trait;
use pkgi_errors::{Error, PlatformError};
use pkgi_events::{AppEvent, PlatformEvent};
use std::time::{Duration, Instant};
use tokio::process::Command;

use crate::core::PlatformContext;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

/// Process operations that spawn real host processes
#[derive(Debug, Default, Clone, Copy)]
pub struct HostProcessOperations;

impl HostProcessOperations {
    #[must_use]
    pub fn new() -> Self {
        Self
    }
}

fn duration_to_millis(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

#[async_trait]
impl ProcessOperations for HostProcessOperations {
    async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, Error> {
        let start = Instant::now();
        let program = cmd.program().to_string();

        ctx.emit_event(AppEvent::Platform(PlatformEvent::ProcessExecutionStarted {
            command: program.clone(),
            args: cmd.get_args().to_vec(),
        }));

        let result: Result<CommandOutput, PlatformError> = async {
            let mut command = Command::new(cmd.program());
            command.args(cmd.get_args()).kill_on_drop(true);

            if let Some(dir) = cmd.get_current_dir() {
                command.current_dir(dir);
            }

            let output = match cmd.get_timeout() {
                Some(limit) => tokio::time::timeout(limit, command.output())
                    .await
                    .map_err(|_| PlatformError::Timeout {
                        command: cmd.display(),
                        millis: duration_to_millis(limit),
                    })?,
                None => command.output().await,
            }
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    PlatformError::CommandNotFound {
                        command: program.clone(),
                    }
                } else {
                    PlatformError::ProcessExecutionFailed {
                        command: program.clone(),
                        message: e.to_string(),
                    }
                }
            })?;

            Ok(CommandOutput {
                exit_code: output.status.code(),
                stdout: output.stdout,
                stderr: output.stderr,
            })
        }
        .await;

        let duration_ms = duration_to_millis(start.elapsed());

        match &result {
            Ok(output) => {
                tracing::debug!(
                    command = %program,
                    exit_code = ?output.exit_code,
                    duration_ms,
                    "process finished"
                );
                ctx.emit_event(AppEvent::Platform(PlatformEvent::ProcessExecutionCompleted {
                    command: program,
                    exit_code: output.exit_code,
                    duration_ms,
                    stdout_bytes: output.stdout.len(),
                    stderr_bytes: output.stderr.len(),
                }));
            }
            Err(e) => {
                ctx.emit_event(AppEvent::Platform(PlatformEvent::ProcessExecutionFailed {
                    command: program,
                    error_message: e.to_string(),
                    duration_ms,
                }));
            }
        }

        result.map_err(Error::from)
    }
}

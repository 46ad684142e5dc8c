//! Elevated shell access through a `su` binary
//!
//! A command runs as `<su> -c <command line>`. Availability is decided once
//! per [`ElevatedShell`] by running `id` and looking for `uid=0`.

use pkgi_errors::Error;
use pkgi_events::{AppEvent, PlatformEvent};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

use crate::core::PlatformContext;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

const ROOT_MARKER: &str = "uid=0";

pub struct ElevatedShell {
    process: Arc<dyn ProcessOperations>,
    su_binary: String,
    probe_timeout: Duration,
    probe: OnceCell<bool>,
}

impl ElevatedShell {
    pub fn new(
        process: Arc<dyn ProcessOperations>,
        su_binary: impl Into<String>,
        probe_timeout: Duration,
    ) -> Self {
        Self {
            process,
            su_binary: su_binary.into(),
            probe_timeout,
            probe: OnceCell::new(),
        }
    }

    #[must_use]
    pub fn su_binary(&self) -> &str {
        &self.su_binary
    }

    /// Whether commands can run with uid 0
    ///
    /// The first call runs the probe; later calls reuse its answer. The probe
    /// must exit cleanly and print `uid=0` on either stream.
    pub async fn is_available(&self, ctx: &PlatformContext) -> bool {
        *self
            .probe
            .get_or_init(|| async {
                let mut cmd = PlatformCommand::new(&self.su_binary);
                cmd.arg("-c").arg("id").timeout(self.probe_timeout);

                let available = match self.process.execute_command(ctx, cmd).await {
                    Ok(output) => {
                        output.success()
                            && (output.stdout_lossy().contains(ROOT_MARKER)
                                || output.stderr_lossy().contains(ROOT_MARKER))
                    }
                    Err(e) => {
                        tracing::debug!(error = %e, "elevated shell probe failed");
                        false
                    }
                };

                ctx.emit_event(AppEvent::Platform(PlatformEvent::CapabilityCheckCompleted {
                    capability: "elevated_shell".to_string(),
                    available,
                }));
                available
            })
            .await
    }

    /// Run a shell command line with elevated privileges
    ///
    /// # Errors
    ///
    /// Returns an error when the `su` process cannot be spawned. A non-zero
    /// exit is reported through the returned output.
    pub async fn run(&self, ctx: &PlatformContext, command_line: &str) -> Result<CommandOutput, Error> {
        tracing::debug!(command = command_line, "running elevated command");
        let mut cmd = PlatformCommand::new(&self.su_binary);
        cmd.arg("-c").arg(command_line);
        self.process.execute_command(ctx, cmd).await
    }
}

impl std::fmt::Debug for ElevatedShell {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ElevatedShell")
            .field("su_binary", &self.su_binary)
            .field("probe_timeout", &self.probe_timeout)
            .field("probe", &self.probe.get())
            .finish()
    }
}

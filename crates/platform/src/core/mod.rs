//! Core platform abstractions and context management

use pkgi_events::{AppEvent, EventEmitter, EventSender};
use std::sync::Arc;

use crate::implementations::host::HostProcessOperations;
use crate::process::{CommandOutput, PlatformCommand, ProcessOperations};

/// Context for platform operations, carrying the optional event channel
#[derive(Clone, Default)]
pub struct PlatformContext {
    event_sender: Option<EventSender>,
}

impl PlatformContext {
    #[must_use]
    pub fn new(event_sender: Option<EventSender>) -> Self {
        Self { event_sender }
    }

    /// Emit a platform event if an event sender is available
    pub fn emit_event(&self, event: AppEvent) {
        self.emit(event);
    }
}

impl EventEmitter for PlatformContext {
    fn event_sender(&self) -> Option<&EventSender> {
        self.event_sender.as_ref()
    }
}

/// Entry point bundling the process backend
#[derive(Clone)]
pub struct Platform {
    process_ops: Arc<dyn ProcessOperations>,
}

impl Platform {
    #[must_use]
    pub fn new(process_ops: Arc<dyn ProcessOperations>) -> Self {
        Self { process_ops }
    }

    /// Platform backed by real host processes
    #[must_use]
    pub fn current() -> Self {
        Self::new(Arc::new(HostProcessOperations::new()))
    }

    /// Access process operations
    #[must_use]
    pub fn process(&self) -> Arc<dyn ProcessOperations> {
        Arc::clone(&self.process_ops)
    }

    #[must_use]
    pub fn create_context(&self, event_sender: Option<EventSender>) -> PlatformContext {
        PlatformContext::new(event_sender)
    }

    /// Convenience method: Execute a command and get output
    ///
    /// # Errors
    ///
    /// Propagates the process backend's error.
    pub async fn execute_command(
        &self,
        ctx: &PlatformContext,
        cmd: PlatformCommand,
    ) -> Result<CommandOutput, pkgi_errors::Error> {
        self.process_ops.execute_command(ctx, cmd).await
    }

    #[must_use]
    pub fn command(&self, program: &str) -> PlatformCommand {
        PlatformCommand::new(program)
    }
}

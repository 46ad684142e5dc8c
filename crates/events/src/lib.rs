#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Event system for pkgi
//!
//! Two channels leave the orchestrator:
//!
//! - the **stage channel** ([`StageEmitter`]): the current [`InstallStage`]
//!   plus the 0–101 staging progress, single writer, latest value replayed
//!   to late subscribers;
//! - the **event stream** ([`EventSender`]): domain events for diagnostics
//!   and machine-readable output, fire-and-forget.
//!
//! [`InstallStage`]: pkgi_types::InstallStage

pub mod emitter;
pub mod events;

pub use emitter::{StageEmitter, StageWatcher, PROGRESS_COMMITTING};
pub use events::{AppEvent, FailureContext, GeneralEvent, InstallEvent, PlatformEvent};

use tokio::sync::mpsc::UnboundedSender;

/// Type alias for event sender
pub type EventSender = UnboundedSender<AppEvent>;

/// Type alias for event receiver
pub type EventReceiver = tokio::sync::mpsc::UnboundedReceiver<AppEvent>;

/// Create a new event channel
#[must_use]
pub fn channel() -> (EventSender, EventReceiver) {
    tokio::sync::mpsc::unbounded_channel()
}

/// The unified trait for emitting events throughout pkgi
///
/// Implemented by the raw `EventSender` and by any struct that holds one.
pub trait EventEmitter {
    /// Get the event sender for this emitter
    fn event_sender(&self) -> Option<&EventSender>;

    /// Emit an event through this emitter
    fn emit(&self, event: AppEvent) {
        if let Some(sender) = self.event_sender() {
            // Receiver may be gone; events are advisory
            let _ = sender.send(event);
        }
    }

    /// Emit a diagnostic note
    fn emit_note(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::note(message)));
    }

    /// Emit a warning event
    fn emit_warning(&self, message: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::warning(message)));
    }

    /// Emit a warning about a specific package
    fn emit_package_warning(&self, message: impl Into<String>, package: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::package_warning(
            message, package,
        )));
    }

    /// Emit an operation started event
    fn emit_operation_started(&self, operation: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationStarted {
            operation: operation.into(),
        }));
    }

    /// Emit an operation completed event
    fn emit_operation_completed(&self, operation: impl Into<String>, success: bool) {
        self.emit(AppEvent::General(GeneralEvent::OperationCompleted {
            operation: operation.into(),
            success,
        }));
    }

    /// Emit an operation failed event
    fn emit_operation_failed(&self, operation: impl Into<String>, error: impl Into<String>) {
        self.emit(AppEvent::General(GeneralEvent::OperationFailed {
            operation: operation.into(),
            error: error.into(),
        }));
    }
}

impl EventEmitter for EventSender {
    fn event_sender(&self) -> Option<&EventSender> {
        Some(self)
    }
}

impl EventEmitter for Option<EventSender> {
    fn event_sender(&self) -> Option<&EventSender> {
        self.as_ref()
    }
}

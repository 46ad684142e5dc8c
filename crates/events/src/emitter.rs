//! Stage channel
//!
//! The orchestrator is the only writer. Readers subscribe at any time and
//! always see the latest stage and progress first.

use std::sync::Arc;

use pkgi_types::InstallStage;
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

use crate::{AppEvent, EventEmitter, EventSender, InstallEvent};

/// Progress sentinel meaning "committing / finalizing"
pub const PROGRESS_COMMITTING: u8 = 101;

/// Single-writer publisher of the current stage and staging progress
#[derive(Clone)]
pub struct StageEmitter {
    stage: Arc<watch::Sender<Option<InstallStage>>>,
    progress: Arc<watch::Sender<u8>>,
    events: Option<EventSender>,
}

impl EventEmitter for StageEmitter {
    fn event_sender(&self) -> Option<&EventSender> {
        self.events.as_ref()
    }
}

impl Default for StageEmitter {
    fn default() -> Self {
        Self::new(None)
    }
}

impl StageEmitter {
    #[must_use]
    pub fn new(events: Option<EventSender>) -> Self {
        let (stage, _) = watch::channel(None);
        let (progress, _) = watch::channel(0);
        Self {
            stage: Arc::new(stage),
            progress: Arc::new(progress),
            events,
        }
    }

    /// Publish a new stage
    ///
    /// Terminal stages are final: anything published after one is dropped
    /// until [`reset`](Self::reset) starts a new request.
    pub fn publish(&self, stage: InstallStage) {
        if let Some(current) = self.stage.borrow().as_ref() {
            if current.is_terminal() {
                warn!(
                    current = current.name(),
                    dropped = stage.name(),
                    "stage published after a terminal stage"
                );
                return;
            }
        }

        let package = stage.descriptor().map(|d| d.package_id.clone());
        match &stage {
            InstallStage::Failed {
                legacy_status,
                status,
                message,
                ..
            } => error!(
                package = ?package,
                legacy_status,
                status,
                message = ?message,
                "install failed"
            ),
            InstallStage::Aborted { reason, .. } => {
                warn!(package = ?package, reason = reason.as_str(), "install aborted");
            }
            InstallStage::Success { archive_path, .. } => {
                info!(package = ?package, archive_path = ?archive_path, "install succeeded");
            }
            other => debug!(package = ?package, stage = other.name(), "stage changed"),
        }

        self.emit(AppEvent::Install(InstallEvent::StageChanged {
            stage: stage.name().to_string(),
            package,
        }));
        self.stage.send_replace(Some(stage));
    }

    /// Publish staging progress, clamped to `0..=101`
    pub fn set_progress(&self, value: u8) {
        let value = value.min(PROGRESS_COMMITTING);
        let previous = self.progress.send_replace(value);
        if previous != value {
            self.emit(AppEvent::Install(InstallEvent::ProgressUpdated { value }));
        }
    }

    /// Forget the previous request's stage and progress
    pub fn reset(&self) {
        self.stage.send_replace(None);
        self.progress.send_replace(0);
    }

    /// The latest published stage
    #[must_use]
    pub fn current(&self) -> Option<InstallStage> {
        self.stage.borrow().clone()
    }

    /// The latest published progress
    #[must_use]
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Subscribe to stage and progress updates
    #[must_use]
    pub fn subscribe(&self) -> StageWatcher {
        StageWatcher {
            stage: self.stage.subscribe(),
            progress: self.progress.subscribe(),
        }
    }
}

/// Read side of the stage channel
#[derive(Clone)]
pub struct StageWatcher {
    stage: watch::Receiver<Option<InstallStage>>,
    progress: watch::Receiver<u8>,
}

impl StageWatcher {
    #[must_use]
    pub fn current(&self) -> Option<InstallStage> {
        self.stage.borrow().clone()
    }

    #[must_use]
    pub fn progress(&self) -> u8 {
        *self.progress.borrow()
    }

    /// Receiver for progress values only
    #[must_use]
    pub fn progress_receiver(&self) -> watch::Receiver<u8> {
        self.progress.clone()
    }

    /// Wait for the next stage change; `None` once the emitter is gone
    pub async fn changed(&mut self) -> Option<InstallStage> {
        self.stage.changed().await.ok()?;
        self.stage.borrow_and_update().clone()
    }

    /// Wait until a terminal stage is published
    pub async fn wait_terminal(&mut self) -> Option<InstallStage> {
        loop {
            if let Some(stage) = self.stage.borrow_and_update().clone() {
                if stage.is_terminal() {
                    return Some(stage);
                }
            }
            if self.stage.changed().await.is_err() {
                return self.current().filter(InstallStage::is_terminal);
            }
        }
    }
}

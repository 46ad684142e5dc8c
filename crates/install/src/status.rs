//! One-shot result channel for asynchronous backend operations
//!
//! Commit, archive and uninstall requests hand a [`StatusSender`] to the
//! backend, which fires it exactly once when the operation settles.

use pkgi_types::InstallStatus;
use tokio::sync::oneshot;

/// Sending half handed to the backend
#[derive(Debug)]
pub struct StatusSender(oneshot::Sender<InstallStatus>);

/// Receiving half kept by the orchestrator
#[derive(Debug)]
pub struct StatusReceiver(oneshot::Receiver<InstallStatus>);

/// Create a connected sender/receiver pair
#[must_use]
pub fn status_channel() -> (StatusSender, StatusReceiver) {
    let (tx, rx) = oneshot::channel();
    (StatusSender(tx), StatusReceiver(rx))
}

impl StatusSender {
    /// Deliver the result; a dropped receiver is ignored
    pub fn send(self, status: InstallStatus) {
        let _ = self.0.send(status);
    }
}

impl StatusReceiver {
    /// Wait for the backend's result
    ///
    /// A sender dropped without firing is reported as an internal error.
    pub async fn recv(self) -> InstallStatus {
        self.0
            .await
            .unwrap_or_else(|_| InstallStatus::internal_error("backend dropped the result channel"))
    }
}

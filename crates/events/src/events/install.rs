use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::FailureContext;

/// Orchestrator events
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum InstallEvent {
    /// Backend bound by the privilege check
    BackendSelected { backend: String, uid: u32 },

    /// The published stage changed
    StageChanged {
        stage: String,
        package: Option<String>,
    },

    /// Staging progress moved (0–100, 101 while committing)
    ProgressUpdated { value: u8 },

    SessionCreated { session_id: i32, package: String },

    /// An active session was picked up instead of creating one
    SessionReused { session_id: i32, package: String },

    SessionAbandoned { session_id: i32 },

    PayloadStaged { name: String, bytes: u64 },

    CommitRequested { session_id: i32 },

    ArchiveWritten { path: PathBuf, entries: usize },

    /// A best-effort step failed and was skipped
    StepSkipped {
        step: String,
        failure: FailureContext,
    },
}

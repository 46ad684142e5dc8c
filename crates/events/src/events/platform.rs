//! Host process events

use serde::{Deserialize, Serialize};

/// Platform operation events for tracking host process execution
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "event_type", rename_all = "snake_case")]
pub enum PlatformEvent {
    /// Process execution started
    ProcessExecutionStarted {
        /// Command being executed
        command: String,
        /// Command arguments
        args: Vec<String>,
    },

    /// Process execution completed
    ProcessExecutionCompleted {
        command: String,
        /// Exit code from the process (`None` when killed by a signal)
        exit_code: Option<i32>,
        duration_ms: u64,
        stdout_bytes: usize,
        stderr_bytes: usize,
    },

    /// Process execution failed
    ProcessExecutionFailed {
        command: String,
        error_message: String,
        duration_ms: u64,
    },

    /// Capability probe finished
    CapabilityCheckCompleted { capability: String, available: bool },
}

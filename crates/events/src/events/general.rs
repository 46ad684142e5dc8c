use serde::{Deserialize, Serialize};

/// Cross-cutting events: notices that are not tied to a stage transition
/// and the lifecycle of a front-end command.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum GeneralEvent {
    /// Something degraded but the request carried on
    Warning {
        message: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        package: Option<String>,
    },

    /// Low-volume diagnostic, shown only with `--debug`
    Note { message: String },

    OperationStarted {
        operation: String,
    },

    OperationCompleted {
        operation: String,
        success: bool,
    },

    OperationFailed {
        operation: String,
        error: String,
    },
}

impl GeneralEvent {
    pub fn warning(message: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            package: None,
        }
    }

    /// Warning about one package
    pub fn package_warning(message: impl Into<String>, package: impl Into<String>) -> Self {
        Self::Warning {
            message: message.into(),
            package: Some(package.into()),
        }
    }

    pub fn note(message: impl Into<String>) -> Self {
        Self::Note {
            message: message.into(),
        }
    }
}

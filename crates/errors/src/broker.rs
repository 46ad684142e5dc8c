//! Errors reported by the privileged broker and the package registry

use std::borrow::Cow;

use crate::UserFacingError;
use thiserror::Error;

#[derive(Debug, Clone, Error)]
pub enum BrokerError {
    #[error("package not found: {package}")]
    NotFound { package: String },

    #[error("broker is not running")]
    Unavailable,

    #[error("permission denied: {operation}")]
    PermissionDenied { operation: String },

    #[error("remote call failed: {message}")]
    Remote { message: String },
}

impl BrokerError {
    /// Whether the registry reported the package as unknown
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. })
    }
}

impl UserFacingError for BrokerError {
    fn user_message(&self) -> Cow<'_, str> {
        Cow::Owned(self.to_string())
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Self::Unavailable => Some("Start the broker service and retry."),
            Self::PermissionDenied { .. } => {
                Some("Grant the installer permission in the broker manager.")
            }
            _ => None,
        }
    }

    fn is_retryable(&self) -> bool {
        matches!(self, Self::Unavailable | Self::Remote { .. })
    }

    fn user_code(&self) -> Option<&'static str> {
        Some(match self {
            Self::NotFound { .. } => "broker.not_found",
            Self::Unavailable => "broker.unavailable",
            Self::PermissionDenied { .. } => "broker.permission_denied",
            Self::Remote { .. } => "broker.remote",
        })
    }
}

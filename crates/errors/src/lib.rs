#![warn(mismatched_lifetime_syntaxes)]
#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Error types for pkgi
//!
//! One enum per domain (orchestration, broker, host process, config),
//! folded into [`Error`] at crate boundaries. Everything is `Clone` because
//! failures are carried inside stages and event payloads.

use std::borrow::Cow;
use std::io::ErrorKind;
use std::path::PathBuf;

use thiserror::Error;

pub mod broker;
pub mod config;
pub mod install;
pub mod platform;

pub use broker::BrokerError;
pub use config::ConfigError;
pub use install::InstallError;
pub use platform::PlatformError;

#[derive(Debug, Clone, Error)]
pub enum Error {
    #[error("install error: {0}")]
    Install(#[from] InstallError),

    #[error("broker error: {0}")]
    Broker(#[from] BrokerError),

    #[error("platform error: {0}")]
    Platform(#[from] PlatformError),

    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    #[error("I/O error: {message}")]
    Io {
        kind: ErrorKind,
        message: String,
        path: Option<PathBuf>,
    },
}

impl Error {
    /// I/O failure on a known file
    pub fn io_with_path(err: &std::io::Error, path: impl Into<PathBuf>) -> Self {
        let path = path.into();
        Self::Io {
            kind: err.kind(),
            message: format!("{}: {err}", path.display()),
            path: Some(path),
        }
    }

    /// The registry answered that the package does not exist
    #[must_use]
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::Broker(err) if err.is_not_found())
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Self::Io {
            kind: err.kind(),
            message: err.to_string(),
            path: None,
        }
    }
}

pub type Result<T> = std::result::Result<T, Error>;

/// What the CLI and the event stream need to describe a failure
pub trait UserFacingError {
    fn user_message(&self) -> Cow<'_, str>;

    /// Something the user can do about it
    fn user_hint(&self) -> Option<&'static str> {
        None
    }

    /// Repeating the same request may succeed
    fn is_retryable(&self) -> bool {
        false
    }

    /// Dotted code such as `install.parse`
    fn user_code(&self) -> Option<&'static str> {
        None
    }
}

impl UserFacingError for Error {
    fn user_message(&self) -> Cow<'_, str> {
        match self {
            Error::Install(err) => err.user_message(),
            Error::Broker(err) => err.user_message(),
            Error::Platform(err) => err.user_message(),
            Error::Config(err) => err.user_message(),
            Error::Io { message, .. } => Cow::Borrowed(message),
        }
    }

    fn user_hint(&self) -> Option<&'static str> {
        match self {
            Error::Install(err) => err.user_hint(),
            Error::Broker(err) => err.user_hint(),
            Error::Platform(err) => err.user_hint(),
            Error::Config(err) => err.user_hint(),
            Error::Io {
                kind: ErrorKind::PermissionDenied,
                ..
            } => Some("The cache and archive directories must be writable by pkgi."),
            Error::Io { .. } => None,
        }
    }

    fn is_retryable(&self) -> bool {
        match self {
            Error::Install(err) => err.is_retryable(),
            Error::Broker(err) => err.is_retryable(),
            Error::Platform(err) => err.is_retryable(),
            Error::Config(_) => false,
            Error::Io { kind, .. } => !matches!(
                kind,
                ErrorKind::NotFound | ErrorKind::PermissionDenied | ErrorKind::InvalidData
            ),
        }
    }

    fn user_code(&self) -> Option<&'static str> {
        match self {
            Error::Install(err) => err.user_code(),
            Error::Broker(err) => err.user_code(),
            Error::Platform(err) => err.user_code(),
            Error::Config(err) => err.user_code(),
            Error::Io { .. } => Some("error.io"),
        }
    }
}

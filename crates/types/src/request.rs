//! Install-source requests
//!
//! A request is produced by whatever front end received the user's intent
//! to install something. It carries an optional locator (a URI), an optional
//! stream locator used when the primary locator is absent, an optional bare
//! package name and some origin metadata that is propagated into staged
//! sessions.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use url::Url;

/// Classified form of a locator string
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SourceLocator {
    /// `package:<name>`
    Package(String),
    /// `market://details?id=<name>`; `None` when the id is missing
    Market(Option<String>),
    /// `content://<authority>/<path>`
    Content(Url),
    /// `file:///<path>`
    File(PathBuf),
    /// Anything else, kept verbatim for error reporting
    Other(String),
}

impl SourceLocator {
    /// Classify a locator string
    #[must_use]
    pub fn parse(raw: &str) -> Self {
        let Ok(url) = Url::parse(raw) else {
            return Self::Other(raw.to_string());
        };
        match url.scheme() {
            "package" => Self::Package(url.path().to_string()),
            "market" if url.host_str() == Some("details") => Self::Market(
                url.query_pairs()
                    .find(|(key, _)| key == "id")
                    .map(|(_, value)| value.into_owned())
                    .filter(|id| !id.is_empty()),
            ),
            "content" => Self::Content(url),
            "file" => match url.to_file_path() {
                Ok(path) => Self::File(path),
                Err(()) => Self::Other(raw.to_string()),
            },
            _ => Self::Other(raw.to_string()),
        }
    }

    /// Locators whose bytes can be opened and staged directly
    #[must_use]
    pub fn is_openable(&self) -> bool {
        matches!(self, Self::Content(_) | Self::File(_))
    }

    /// Authority of a content locator
    #[must_use]
    pub fn authority(&self) -> Option<&str> {
        match self {
            Self::Content(url) => url.host_str(),
            _ => None,
        }
    }
}

/// Request to install something, as received from the front end
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceRequest {
    pub locator: Option<String>,
    /// Fallback locator consulted when `locator` is absent
    pub stream: Option<String>,
    /// Bare package name, used only when no locator is present at all
    pub package_name: Option<String>,
    pub referrer: Option<String>,
    pub originating_uri: Option<String>,
    pub originating_uid: Option<u32>,
}

impl SourceRequest {
    /// Request carrying a single locator
    pub fn from_locator(locator: impl Into<String>) -> Self {
        Self {
            locator: Some(locator.into()),
            ..Self::default()
        }
    }

    /// Request for a local file path
    #[must_use]
    pub fn from_path(path: &std::path::Path) -> Self {
        match Url::from_file_path(path) {
            Ok(url) => Self::from_locator(url.to_string()),
            Err(()) => Self::from_locator(path.display().to_string()),
        }
    }

    /// Request carrying only a package name
    pub fn from_package_name(name: impl Into<String>) -> Self {
        Self {
            package_name: Some(name.into()),
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_referrer(mut self, referrer: impl Into<String>) -> Self {
        self.referrer = Some(referrer.into());
        self
    }

    /// Promote the stream locator when the primary one is missing
    pub fn normalize(&mut self) {
        if self.locator.is_none() {
            self.locator = self.stream.take();
        }
    }

    /// The classified primary locator, if any
    #[must_use]
    pub fn classified(&self) -> Option<SourceLocator> {
        self.locator.as_deref().map(SourceLocator::parse)
    }
}

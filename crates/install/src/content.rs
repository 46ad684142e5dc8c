//! Opening install sources
//!
//! Content locators are opened through a [`ContentResolver`]. Callers run
//! these methods on blocking threads.

use pkgi_errors::{Error, InstallError};
use pkgi_types::SourceLocator;
use std::fs::File;
use std::path::PathBuf;

pub trait ContentResolver: Send + Sync {
    /// Open the bytes behind a content or file locator
    ///
    /// # Errors
    ///
    /// Returns an error if the locator cannot be mapped or opened.
    fn open(&self, locator: &SourceLocator) -> Result<File, Error>;

    /// Human-readable name of the resource, if the provider reports one
    fn display_name(&self, locator: &SourceLocator) -> Option<String>;
}

/// Resolver backed by the local filesystem
///
/// `file://` locators map to their path. `content://<authority>/<path>` maps
/// to `<root>/<authority>/<path>` when a content root is configured.
#[derive(Debug, Clone, Default)]
pub struct FsContentResolver {
    content_root: Option<PathBuf>,
}

impl FsContentResolver {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with_content_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.content_root = Some(root.into());
        self
    }

    /// Local path a locator maps to
    #[must_use]
    pub fn local_path(&self, locator: &SourceLocator) -> Option<PathBuf> {
        match locator {
            SourceLocator::File(path) => Some(path.clone()),
            SourceLocator::Content(url) => {
                let root = self.content_root.as_ref()?;
                let mut path = root.join(url.host_str()?);
                for segment in url.path_segments()?.filter(|s| !s.is_empty()) {
                    if segment == ".." {
                        return None;
                    }
                    path.push(segment);
                }
                Some(path)
            }
            _ => None,
        }
    }
}

impl ContentResolver for FsContentResolver {
    fn open(&self, locator: &SourceLocator) -> Result<File, Error> {
        let path = self
            .local_path(locator)
            .ok_or_else(|| InstallError::InvalidSource {
                source_ref: format!("{locator:?}"),
            })?;
        File::open(&path).map_err(|e| Error::io_with_path(&e, path))
    }

    fn display_name(&self, locator: &SourceLocator) -> Option<String> {
        self.local_path(locator)?
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
    }
}

//! Package descriptors and registry snapshots

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Opaque image handle (encoded image bytes) used for package icons
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Icon(pub Vec<u8>);

impl fmt::Debug for Icon {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Icon({} bytes)", self.0.len())
    }
}

/// Canonical description of the package an install request resolved to
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PackageDescriptor {
    pub package_id: String,
    pub version_code: i64,
    pub label: Option<String>,
    pub icon: Option<Icon>,
    /// Present iff the payload is one split of a multi-part package
    pub split_name: Option<String>,
    /// The source is a container holding several payloads
    pub is_bundle: bool,
}

impl PackageDescriptor {
    /// Create a descriptor for a single full payload
    pub fn new(package_id: impl Into<String>, version_code: i64) -> Self {
        Self {
            package_id: package_id.into(),
            version_code,
            label: None,
            icon: None,
            split_name: None,
            is_bundle: false,
        }
    }

    /// Builder helper marking the descriptor as a split
    #[must_use]
    pub fn with_split(mut self, split_name: impl Into<String>) -> Self {
        self.split_name = Some(split_name.into());
        self.is_bundle = false;
        self
    }

    /// Builder helper marking the descriptor as a bundle
    #[must_use]
    pub fn as_bundle(mut self) -> Self {
        self.is_bundle = true;
        self.split_name = None;
        self
    }

    /// Builder helper attaching a label
    #[must_use]
    pub fn with_label(mut self, label: impl Into<String>) -> Self {
        self.label = Some(label.into());
        self
    }

    /// Whether this payload extends an existing base rather than replacing it
    #[must_use]
    pub fn is_split(&self) -> bool {
        self.split_name.is_some() && !self.is_bundle
    }

    /// Multi-part installs carry label and icon in the session metadata
    #[must_use]
    pub fn is_multi_part(&self) -> bool {
        self.split_name.is_some() || self.is_bundle
    }

    /// Deterministic archive name for this package version
    #[must_use]
    pub fn archive_name(&self) -> String {
        archive_name(&self.package_id, self.version_code)
    }
}

impl fmt::Display for PackageDescriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.package_id, self.version_code)?;
        if let Some(split) = &self.split_name {
            write!(f, " split {split}")?;
        }
        Ok(())
    }
}

/// `{package}-{versionCode}.zip`
#[must_use]
pub fn archive_name(package_id: &str, version_code: i64) -> String {
    format!("{package_id}-{version_code}.zip")
}

/// Snapshot of the registry record for a package at decision time
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, Default)]
pub struct ExistingPackageInfo {
    pub package_id: String,
    pub version_code: i64,
    pub label: Option<String>,
    pub icon: Option<Icon>,
    /// Installer attribution currently recorded by the registry
    pub installer: Option<String>,
    /// Base payload path (`None` when the registry has no file for it)
    pub base_path: Option<PathBuf>,
    pub split_paths: Vec<PathBuf>,
    pub installed: bool,
    pub uid: u32,
}

impl ExistingPackageInfo {
    /// Base payload followed by every split payload
    #[must_use]
    pub fn payload_paths(&self) -> Vec<PathBuf> {
        self.base_path
            .iter()
            .cloned()
            .chain(self.split_paths.iter().cloned())
            .collect()
    }

    /// Whether the registered base payload is present on disk
    #[must_use]
    pub fn base_payload_exists(&self) -> bool {
        self.base_path.as_ref().is_some_and(|p| p.exists())
    }

    /// Host user the package's uid belongs to
    #[must_use]
    pub fn user_id(&self) -> u32 {
        self.uid / crate::PER_USER_RANGE
    }

    /// Convert the snapshot into a descriptor (full payload, no split)
    #[must_use]
    pub fn to_descriptor(&self) -> PackageDescriptor {
        PackageDescriptor {
            package_id: self.package_id.clone(),
            version_code: self.version_code,
            label: self.label.clone(),
            icon: self.icon.clone(),
            split_name: None,
            is_bundle: false,
        }
    }
}

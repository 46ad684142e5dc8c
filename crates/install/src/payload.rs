//! Payload containers
//!
//! A source is either a single payload (a zip with a top-level manifest) or
//! a bundle (a zip whose `*.apk` entries are each one payload). Everything
//! here is blocking and runs under `spawn_blocking`.

use pkgi_errors::{Error, InstallError};
use pkgi_types::{PackageDescriptor, MANIFEST_ENTRY, PAYLOAD_EXTENSION};
use std::fs::File;
use std::io::{self, Cursor, Read, Seek, Write};
use std::path::{Path, PathBuf};
use zip::ZipArchive;

use crate::broker::StagedSession;
use crate::manifest::{parse_manifest, ManifestInfo};

/// Name of the slot a single payload is written to
pub const BASE_PAYLOAD_NAME: &str = "base.apk";

const COPY_BUFFER: usize = 64 * 1024;

fn parse_failed(message: impl Into<String>) -> Error {
    InstallError::ParseFailed {
        message: message.into(),
    }
    .into()
}

fn read_manifest<R: Read + Seek>(archive: &mut ZipArchive<R>) -> Result<ManifestInfo, Error> {
    let mut entry = archive
        .by_name(MANIFEST_ENTRY)
        .map_err(|e| parse_failed(format!("{MANIFEST_ENTRY}: {e}")))?;
    let mut data = Vec::new();
    entry.read_to_end(&mut data)?;
    parse_manifest(&data)
}

/// Names of every payload entry in a bundle, in archive order
pub(crate) fn payload_entries<R: Read + Seek>(archive: &ZipArchive<R>) -> Vec<String> {
    archive
        .file_names()
        .filter(|name| !name.ends_with('/') && name.ends_with(PAYLOAD_EXTENSION))
        .map(str::to_string)
        .collect()
}

fn entry_basename(name: &str) -> &str {
    name.rsplit('/').next().unwrap_or(name)
}

/// Identify the package a source container holds
///
/// # Errors
///
/// Returns an error if the container is not a zip, has neither a manifest
/// nor payload entries, or a manifest cannot be decoded.
pub(crate) fn parse_container<R: Read + Seek>(reader: R) -> Result<PackageDescriptor, Error> {
    let mut archive = ZipArchive::new(reader).map_err(|e| parse_failed(e.to_string()))?;

    if archive.index_for_name(MANIFEST_ENTRY).is_some() {
        let info = read_manifest(&mut archive)?;
        return Ok(descriptor_from(info, false));
    }

    let entries = payload_entries(&archive);
    if entries.is_empty() {
        return Err(InstallError::NoPayloads {
            path: "source container".to_string(),
        }
        .into());
    }

    let mut first: Option<ManifestInfo> = None;
    for name in &entries {
        let mut bytes = Vec::new();
        archive
            .by_name(name)
            .map_err(|e| parse_failed(format!("{name}: {e}")))?
            .read_to_end(&mut bytes)?;
        let mut inner =
            ZipArchive::new(Cursor::new(bytes)).map_err(|e| parse_failed(format!("{name}: {e}")))?;
        let info = read_manifest(&mut inner)?;
        if info.split_name.is_none() {
            return Ok(descriptor_from(info, true));
        }
        first.get_or_insert(info);
    }

    first
        .map(|info| descriptor_from(info, true))
        .ok_or_else(|| parse_failed("bundle has no readable payload"))
}

fn descriptor_from(info: ManifestInfo, bundle: bool) -> PackageDescriptor {
    let mut descriptor = PackageDescriptor::new(info.package_id, info.version_code);
    descriptor.label = info.label;
    if bundle {
        descriptor.as_bundle()
    } else if let Some(split) = info.split_name {
        descriptor.with_split(split)
    } else {
        descriptor
    }
}

/// Percent-complete reporter that only fires on change
pub(crate) struct ProgressCounter<F: FnMut(u8)> {
    total: u64,
    done: u64,
    last: Option<u8>,
    report: F,
}

impl<F: FnMut(u8)> ProgressCounter<F> {
    pub(crate) fn new(total: u64, report: F) -> Self {
        Self {
            total,
            done: 0,
            last: None,
            report,
        }
    }

    pub(crate) fn advance(&mut self, bytes: u64) {
        self.done = self.done.saturating_add(bytes);
        let percent = if self.total == 0 {
            100
        } else {
            u8::try_from((self.done.min(self.total) * 100) / self.total).unwrap_or(100)
        };
        if self.last != Some(percent) {
            self.last = Some(percent);
            (self.report)(percent);
        }
    }

    pub(crate) fn finish(&mut self) {
        if self.last != Some(100) {
            self.last = Some(100);
            (self.report)(100);
        }
    }
}

/// Copy `reader` into `writer`, advancing `progress`
pub(crate) fn copy_with_progress<R: Read + ?Sized, W: Write + ?Sized, F: FnMut(u8)>(
    reader: &mut R,
    writer: &mut W,
    progress: &mut ProgressCounter<F>,
) -> io::Result<u64> {
    let mut buffer = vec![0u8; COPY_BUFFER];
    let mut copied = 0u64;
    loop {
        let n = match reader.read(&mut buffer) {
            Ok(0) => break,
            Ok(n) => n,
            Err(e) if e.kind() == io::ErrorKind::Interrupted => continue,
            Err(e) => return Err(e),
        };
        writer.write_all(&buffer[..n])?;
        copied += n as u64;
        progress.advance(n as u64);
    }
    writer.flush()?;
    Ok(copied)
}

/// Stream a single payload into the session as `base.apk`
pub(crate) fn stage_single<F: FnMut(u8)>(
    mut file: File,
    session: &mut dyn StagedSession,
    report: F,
) -> Result<Vec<(String, u64)>, Error> {
    let size = file.metadata()?.len();
    let mut progress = ProgressCounter::new(size, report);
    let mut writer = session.open_write(BASE_PAYLOAD_NAME, size)?;
    let written = copy_with_progress(&mut file, &mut writer, &mut progress)?;
    drop(writer);
    progress.finish();
    Ok(vec![(BASE_PAYLOAD_NAME.to_string(), written)])
}

/// Stream every payload entry of a bundle into the session
pub(crate) fn stage_bundle<F: FnMut(u8)>(
    file: File,
    session: &mut dyn StagedSession,
    report: F,
) -> Result<Vec<(String, u64)>, Error> {
    let mut archive = ZipArchive::new(file).map_err(|e| parse_failed(e.to_string()))?;
    let entries = payload_entries(&archive);
    if entries.is_empty() {
        return Err(InstallError::NoPayloads {
            path: "bundle".to_string(),
        }
        .into());
    }

    let mut total = 0u64;
    for name in &entries {
        total += archive
            .by_name(name)
            .map_err(|e| parse_failed(format!("{name}: {e}")))?
            .size();
    }

    let mut progress = ProgressCounter::new(total, report);
    let mut staged = Vec::with_capacity(entries.len());
    for name in &entries {
        let mut entry = archive
            .by_name(name)
            .map_err(|e| parse_failed(format!("{name}: {e}")))?;
        let slot = entry_basename(name).to_string();
        let mut writer = session.open_write(&slot, entry.size())?;
        let written = copy_with_progress(&mut entry, &mut writer, &mut progress)?;
        drop(writer);
        staged.push((slot, written));
    }
    progress.finish();
    Ok(staged)
}

/// Extract every payload entry of a bundle into `dest`
///
/// Entries are flattened to their base names.
pub(crate) fn extract_payloads(source: &Path, dest: &Path) -> Result<Vec<PathBuf>, Error> {
    let file = File::open(source).map_err(|e| Error::io_with_path(&e, source))?;
    let mut archive = ZipArchive::new(file).map_err(|e| parse_failed(e.to_string()))?;
    let entries = payload_entries(&archive);
    if entries.is_empty() {
        return Err(InstallError::NoPayloads {
            path: source.display().to_string(),
        }
        .into());
    }

    let mut extracted = Vec::with_capacity(entries.len());
    for name in &entries {
        let mut entry = archive
            .by_name(name)
            .map_err(|e| parse_failed(format!("{name}: {e}")))?;
        let out_path = dest.join(entry_basename(name));
        let mut out = File::create(&out_path).map_err(|e| Error::io_with_path(&e, &out_path))?;
        io::copy(&mut entry, &mut out)?;
        extracted.push(out_path);
    }
    Ok(extracted)
}

// src/packages/metadata.rs

//! Package metadata extraction
//!
//! Pulls the descriptor (`.PACKAGE`) and manifest (`.MTREE`) entries out of a
//! package archive and derives the package name from the descriptor.

use crate::error::{Error, Result};
use crate::packages::archive::open_archive;
use std::io::Read;
use std::path::{Path, PathBuf};
use tracing::debug;

/// Archive entry holding the package descriptor
pub const DESCRIPTOR_ENTRY: &str = ".PACKAGE";

/// Archive entry holding the package file manifest
pub const MANIFEST_ENTRY: &str = ".MTREE";

/// Descriptor key declaring the package name
const NAME_KEY: &str = "package";

/// Separator between a descriptor key and its value
const KEY_SEPARATOR: &str = " = ";

/// Metadata extracted from a single package archive
#[derive(Debug, Clone)]
pub struct PackageMetadata {
    /// Package name, used as the cache slot key
    pub name: String,
    /// Raw bytes of the descriptor entry
    pub descriptor: Vec<u8>,
    /// Raw bytes of the manifest entry
    pub manifest: Vec<u8>,
    /// Archive the metadata was read from
    pub source: PathBuf,
}

impl PackageMetadata {
    /// Read both metadata entries from the package archive at `path`
    ///
    /// Both entries are required. Nothing is returned for a package that lacks
    /// either one, so a caller can never stage a half-complete record.
    pub fn extract(path: &Path) -> Result<Self> {
        debug!("Extracting metadata from {}", path.display());

        let read_error = |what: &str, err: std::io::Error| Error::PackageRead {
            path: path.to_path_buf(),
            reason: format!("{}: {}", what, err),
        };

        let mut archive = open_archive(path)?;
        let mut descriptor: Option<Vec<u8>> = None;
        let mut manifest: Option<Vec<u8>> = None;

        for entry in archive
            .entries()
            .map_err(|e| read_error("failed to read archive", e))?
        {
            let mut entry = entry.map_err(|e| read_error("failed to read archive entry", e))?;

            let entry_path = entry
                .path()
                .map_err(|e| read_error("failed to get entry path", e))?
                .into_owned();

            let slot = match normalize_entry_name(&entry_path) {
                Some(DESCRIPTOR_ENTRY) if descriptor.is_none() => &mut descriptor,
                Some(MANIFEST_ENTRY) if manifest.is_none() => &mut manifest,
                _ => continue,
            };

            let mut content = Vec::new();
            entry
                .read_to_end(&mut content)
                .map_err(|e| read_error("failed to read metadata entry", e))?;
            *slot = Some(content);

            if descriptor.is_some() && manifest.is_some() {
                break;
            }
        }

        let descriptor = descriptor.ok_or_else(|| Error::MissingEntry {
            path: path.to_path_buf(),
            entry: DESCRIPTOR_ENTRY,
        })?;
        let manifest = manifest.ok_or_else(|| Error::MissingEntry {
            path: path.to_path_buf(),
            entry: MANIFEST_ENTRY,
        })?;

        let name = parse_package_name(&descriptor);
        if name.is_empty() {
            return Err(Error::MissingName(path.to_path_buf()));
        }
        validate_name(&name)?;

        debug!(
            "Extracted {} ({} byte descriptor, {} byte manifest)",
            name,
            descriptor.len(),
            manifest.len()
        );

        Ok(Self {
            name,
            descriptor,
            manifest,
            source: path.to_path_buf(),
        })
    }
}

/// Strip leading `./` components so `./.PACKAGE` and `.PACKAGE` compare equal
fn normalize_entry_name(path: &Path) -> Option<&str> {
    let mut name = path.to_str()?;
    while let Some(rest) = name.strip_prefix("./") {
        name = rest;
    }
    Some(name)
}

/// Parse the package name out of descriptor content
///
/// The first line whose leading token is `package` decides the name: it is
/// split on `" = "` and the second segment is taken. Returns an empty string
/// when there is no such line or it carries no value.
pub fn parse_package_name(descriptor: &[u8]) -> String {
    let content = String::from_utf8_lossy(descriptor);

    content
        .lines()
        .find(|line| is_name_line(line))
        .and_then(|line| line.split(KEY_SEPARATOR).nth(1))
        .map(|value| value.trim().to_string())
        .unwrap_or_default()
}

fn is_name_line(line: &str) -> bool {
    line.strip_prefix(NAME_KEY).is_some_and(|rest| {
        rest.is_empty() || rest.starts_with(|c: char| c.is_whitespace() || c == '=')
    })
}

/// Check that `name` can be used as a single directory name
pub fn validate_name(name: &str) -> Result<()> {
    let invalid = name.is_empty()
        || name == "."
        || name == ".."
        || name.contains(['/', '\\', '\0']);

    if invalid {
        return Err(Error::InvalidName(name.to_string()));
    }
    Ok(())
}

// src/db/mod.rs

//! Repository database archive
//!
//! This module rebuilds the repository database from the cache store:
//! - Enumerating every staged file and its path inside the archive
//! - Writing a zstd-compressed tarball into a temporary file
//! - Renaming it over the destination once it is complete
//!
//! The archive always reflects the whole cache store, never just the
//! packages registered by the current invocation.

use crate::cache::STAGING_SUFFIX;
use crate::error::{Error, Result};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::path::{Component, Path, PathBuf};
use tar::{Archive, Builder, EntryType, Header};
use tracing::{debug, info};
use walkdir::WalkDir;

/// Default database archive file name, relative to the working directory
pub const DEFAULT_DB_NAME: &str = "intg.db.tar.zst";

/// Default zstd compression level for the database archive
pub const DEFAULT_COMPRESSION_LEVEL: i32 = 19;

/// Result of a database rebuild
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BuildSummary {
    /// Location of the finished archive
    pub path: PathBuf,
    /// Number of files written into the archive
    pub entries: usize,
    /// Compressed size in bytes
    pub size: u64,
}

/// Convert a path relative to the cache root into an archive entry name
fn archive_name(relative: &Path) -> Result<String> {
    let mut parts = Vec::new();
    for component in relative.components() {
        match component {
            Component::Normal(part) => {
                let part = part.to_str().ok_or_else(|| {
                    Error::Archive(format!("Non UTF-8 path in cache: {}", relative.display()))
                })?;
                parts.push(part);
            }
            _ => {
                return Err(Error::Archive(format!(
                    "Unexpected path component in cache: {}",
                    relative.display()
                )))
            }
        }
    }

    if parts.is_empty() {
        return Err(Error::Archive("Empty archive entry path".to_string()));
    }
    Ok(parts.join("/"))
}

/// Map every regular file under `root` to its path inside the archive
///
/// Keys are the real paths as found under `root`, values are the same paths
/// with the `root` prefix removed, always `/`-separated. Directories and
/// symlinks are skipped, as are blobs the cache store never finished. Any
/// traversal error aborts the scan.
pub fn collect_files(root: &Path) -> Result<BTreeMap<PathBuf, String>> {
    let mut files = BTreeMap::new();

    for entry in WalkDir::new(root).follow_links(false).sort_by_file_name() {
        let entry = entry?;
        let file_type = entry.file_type();

        if file_type.is_dir() {
            continue;
        }
        if !file_type.is_file() {
            debug!("Skipping non-regular file {}", entry.path().display());
            continue;
        }
        if entry.file_name().to_string_lossy().ends_with(STAGING_SUFFIX) {
            debug!("Skipping unfinished blob {}", entry.path().display());
            continue;
        }

        let relative = entry.path().strip_prefix(root).map_err(|e| {
            Error::Archive(format!(
                "Failed to relativize {}: {}",
                entry.path().display(),
                e
            ))
        })?;
        let name = archive_name(relative)?;
        files.insert(entry.path().to_path_buf(), name);
    }

    debug!("Found {} files under {}", files.len(), root.display());
    Ok(files)
}

/// Rebuilds the database archive from a cache store directory
#[derive(Debug, Clone)]
pub struct DatabaseBuilder {
    cache_root: PathBuf,
    destination: PathBuf,
    level: i32,
}

impl DatabaseBuilder {
    pub fn new(cache_root: impl Into<PathBuf>, destination: impl Into<PathBuf>) -> Self {
        Self {
            cache_root: cache_root.into(),
            destination: destination.into(),
            level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Set the zstd compression level
    pub fn compression_level(mut self, level: i32) -> Self {
        self.level = level;
        self
    }

    /// Build the archive and move it into place
    ///
    /// The archive is written to a temporary file next to the destination and
    /// renamed over it only once complete, so a failed build leaves any
    /// previous archive untouched. Entry headers carry no timestamps or
    /// ownership, making the output depend on cache contents alone.
    pub fn build(&self) -> Result<BuildSummary> {
        let files = collect_files(&self.cache_root)?;

        let parent = match self.destination.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let temp = tempfile::Builder::new()
            .prefix(".repotool-")
            .suffix(".tmp")
            .tempfile_in(parent)?;
        // tempfile creates 0600; the database is read by clients and mirrors
        #[cfg(unix)]
        {
            use std::os::unix::fs::PermissionsExt;
            temp.as_file().set_permissions(fs::Permissions::from_mode(0o644))?;
        }

        let encoder = zstd::Encoder::new(temp.as_file(), self.level)
            .map_err(|e| Error::Archive(format!("Failed to create zstd encoder: {}", e)))?;
        let mut builder = Builder::new(encoder);

        for (real_path, name) in &files {
            let content = fs::read(real_path)?;

            let mut header = Header::new_gnu();
            header.set_entry_type(EntryType::Regular);
            header.set_size(content.len() as u64);
            header.set_mode(0o644);
            header.set_mtime(0);
            header.set_uid(0);
            header.set_gid(0);

            builder
                .append_data(&mut header, name, content.as_slice())
                .map_err(|e| Error::Archive(format!("Failed to append {}: {}", name, e)))?;
        }

        let encoder = builder
            .into_inner()
            .map_err(|e| Error::Archive(format!("Failed to finish tar stream: {}", e)))?;
        let file = encoder
            .finish()
            .map_err(|e| Error::Archive(format!("Failed to finish zstd stream: {}", e)))?;
        file.sync_all()?;

        temp.persist(&self.destination).map_err(|e| {
            Error::Archive(format!(
                "Failed to move archive into place at {}: {}",
                self.destination.display(),
                e.error
            ))
        })?;

        let size = fs::metadata(&self.destination)?.len();
        info!(
            "Rebuilt {} ({} files, {} bytes)",
            self.destination.display(),
            files.len(),
            size
        );

        Ok(BuildSummary {
            path: self.destination.clone(),
            entries: files.len(),
            size,
        })
    }
}

/// List the entry names of a database archive in stored order
pub fn list_archive(path: &Path) -> Result<Vec<String>> {
    let file = File::open(path)?;
    let decoder = zstd::Decoder::new(file)
        .map_err(|e| Error::Archive(format!("Failed to create zstd decoder: {}", e)))?;
    let mut archive = Archive::new(decoder);

    let mut names = Vec::new();
    for entry in archive.entries()? {
        let entry = entry?;
        names.push(entry.path()?.to_string_lossy().into_owned());
    }
    Ok(names)
}

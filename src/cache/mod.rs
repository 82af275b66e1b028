// src/cache/mod.rs

//! Cache store for staged package metadata
//!
//! The cache mirrors the logical contents of the repository database: one
//! directory per package name, each holding the raw descriptor and manifest
//! blobs. It is the source of truth for every database rebuild and persists
//! between invocations; slots are only dropped through [`CacheStore::remove`].
//!
//! All operations work on paths joined from the store root. The process
//! working directory is never changed.

use crate::error::{Error, Result};
use crate::packages::{DESCRIPTOR_ENTRY, MANIFEST_ENTRY, PackageMetadata, validate_name};
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};

/// Default cache store directory, relative to the working directory
pub const DEFAULT_CACHE_DIR: &str = "dbcache";

/// Suffix of blobs written but not yet moved into place
pub const STAGING_SUFFIX: &str = ".new";

/// Make sure `path` is a directory, creating it when absent
///
/// Idempotent. Fails with [`Error::NotADirectory`] when something other than
/// a directory already occupies `path`.
pub fn ensure_dir(path: &Path) -> Result<()> {
    match fs::metadata(path) {
        Ok(meta) if meta.is_dir() => Ok(()),
        Ok(_) => Err(Error::NotADirectory(path.to_path_buf())),
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("Creating directory {}", path.display());
            fs::create_dir_all(path)?;
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}

/// Clean up after a failed blob write
///
/// A slot created for this write is dropped altogether; an existing slot only
/// loses the half-written staging files.
fn discard_staged(slot: &Path, replacing: bool) {
    if !replacing {
        let _ = fs::remove_dir_all(slot);
        return;
    }
    for entry in [DESCRIPTOR_ENTRY, MANIFEST_ENTRY] {
        let _ = fs::remove_file(slot.join(format!("{}{}", entry, STAGING_SUFFIX)));
    }
}

/// A staged package slot in the cache store
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CacheEntry {
    pub name: String,
    pub path: PathBuf,
    pub has_descriptor: bool,
    pub has_manifest: bool,
}

impl CacheEntry {
    /// Whether both metadata blobs are present
    pub fn is_complete(&self) -> bool {
        self.has_descriptor && self.has_manifest
    }
}

/// On-disk staging area, one subdirectory per package name
#[derive(Debug, Clone)]
pub struct CacheStore {
    root: PathBuf,
}

impl CacheStore {
    /// Create a store rooted at `root`
    ///
    /// Nothing is touched on disk until the first write.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Directory holding the blobs for package `name`
    pub fn slot_path(&self, name: &str) -> PathBuf {
        self.root.join(name)
    }

    /// Whether a slot exists for package `name`
    pub fn contains(&self, name: &str) -> bool {
        self.slot_path(name).is_dir()
    }

    /// Stage a package's metadata under its name
    ///
    /// Existing blobs for the same name are replaced entirely (last write
    /// wins). Both blobs are written next to the old ones first; if that
    /// fails the previous record is left as it was. A slot is never left
    /// holding one old and one new blob. Returns the slot directory.
    pub fn stage(&self, metadata: &PackageMetadata) -> Result<PathBuf> {
        validate_name(&metadata.name)?;

        ensure_dir(&self.root)?;
        let slot = self.slot_path(&metadata.name);
        let replacing = slot.exists();
        ensure_dir(&slot)?;

        let blobs = [
            (DESCRIPTOR_ENTRY, metadata.descriptor.as_slice()),
            (MANIFEST_ENTRY, metadata.manifest.as_slice()),
        ];

        let mut pending = Vec::with_capacity(blobs.len());
        for (entry, content) in blobs {
            let target = slot.join(entry);
            let staging = slot.join(format!("{}{}", entry, STAGING_SUFFIX));
            if let Err(e) = fs::write(&staging, content) {
                discard_staged(&slot, replacing);
                return Err(e.into());
            }
            pending.push((staging, target));
        }

        for (staging, target) in &pending {
            if let Err(e) = fs::rename(staging, target) {
                warn!("Dropping cache slot {} after a partial update", slot.display());
                let _ = fs::remove_dir_all(&slot);
                return Err(e.into());
            }
        }

        if replacing {
            info!("Replaced cached metadata for {}", metadata.name);
        } else {
            info!("Cached metadata for {}", metadata.name);
        }

        Ok(slot)
    }

    /// List staged packages sorted by name
    ///
    /// A missing root is an empty store.
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        let read_dir = match fs::read_dir(&self.root) {
            Ok(read_dir) => read_dir,
            Err(e) if e.kind() == ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut entries = Vec::new();
        for dir_entry in read_dir {
            let dir_entry = dir_entry?;
            if !dir_entry.file_type()?.is_dir() {
                continue;
            }

            let path = dir_entry.path();
            let Some(name) = dir_entry.file_name().to_str().map(str::to_string) else {
                warn!("Skipping non UTF-8 cache entry {}", path.display());
                continue;
            };

            entries.push(CacheEntry {
                has_descriptor: path.join(DESCRIPTOR_ENTRY).is_file(),
                has_manifest: path.join(MANIFEST_ENTRY).is_file(),
                name,
                path,
            });
        }

        entries.sort_by(|a, b| a.name.cmp(&b.name));
        Ok(entries)
    }

    /// Drop the slot for package `name`
    ///
    /// Returns `false` when there was nothing to remove.
    pub fn remove(&self, name: &str) -> Result<bool> {
        validate_name(name)?;
        let slot = self.slot_path(name);

        match fs::symlink_metadata(&slot) {
            Ok(meta) if meta.is_dir() => {
                fs::remove_dir_all(&slot)?;
                info!("Removed cached metadata for {}", name);
                Ok(true)
            }
            Ok(_) => Err(Error::NotADirectory(slot)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

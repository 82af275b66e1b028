// src/config.rs

//! Invocation configuration
//!
//! repotool keeps no configuration files. Everything is resolved once from
//! command-line flags (or their environment fallbacks) into a [`RepoConfig`]
//! whose paths are absolute, so nothing downstream depends on the process
//! working directory.

use crate::cache::DEFAULT_CACHE_DIR;
use crate::db::{DEFAULT_COMPRESSION_LEVEL, DEFAULT_DB_NAME};
use crate::error::{Error, Result};
use crate::packages::validate_name;
use crate::publish::DEFAULT_PUBLISH_ROOT;
use std::ops::RangeInclusive;
use std::path::{Path, PathBuf};

/// zstd levels accepted for the database archive
pub const COMPRESSION_LEVELS: RangeInclusive<i32> = 1..=22;

/// Resolved settings for one invocation
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RepoConfig {
    /// Directory relative paths are resolved against
    pub work_dir: PathBuf,
    /// Cache store root, relative to `work_dir` unless absolute
    pub cache_dir: PathBuf,
    /// Database archive file name inside `work_dir`
    pub db_name: String,
    /// Directory holding published repositories, relative to `work_dir` unless absolute
    pub publish_root: PathBuf,
    /// zstd level for the database archive
    pub compression_level: i32,
}

impl RepoConfig {
    /// Default settings rooted at `work_dir`
    pub fn new(work_dir: impl Into<PathBuf>) -> Self {
        Self {
            work_dir: work_dir.into(),
            cache_dir: PathBuf::from(DEFAULT_CACHE_DIR),
            db_name: DEFAULT_DB_NAME.to_string(),
            publish_root: PathBuf::from(DEFAULT_PUBLISH_ROOT),
            compression_level: DEFAULT_COMPRESSION_LEVEL,
        }
    }

    /// Default settings rooted at the current directory
    pub fn from_current_dir() -> Result<Self> {
        let cwd = std::env::current_dir()
            .map_err(|e| Error::Config(format!("Failed to determine working directory: {}", e)))?;
        Ok(Self::new(cwd))
    }

    pub fn with_cache_dir(mut self, cache_dir: impl Into<PathBuf>) -> Self {
        self.cache_dir = cache_dir.into();
        self
    }

    pub fn with_db_name(mut self, db_name: impl Into<String>) -> Self {
        self.db_name = db_name.into();
        self
    }

    pub fn with_publish_root(mut self, publish_root: impl Into<PathBuf>) -> Self {
        self.publish_root = publish_root.into();
        self
    }

    pub fn with_compression_level(mut self, level: i32) -> Self {
        self.compression_level = level;
        self
    }

    /// Make `work_dir` absolute and check every setting
    pub fn resolve(mut self) -> Result<Self> {
        self.work_dir = std::path::absolute(&self.work_dir).map_err(|e| {
            Error::Config(format!(
                "Failed to resolve working directory {}: {}",
                self.work_dir.display(),
                e
            ))
        })?;
        self.validate()?;
        Ok(self)
    }

    /// Check settings without touching the filesystem
    pub fn validate(&self) -> Result<()> {
        if !self.work_dir.is_absolute() {
            return Err(Error::Config(format!(
                "Working directory {} is not absolute",
                self.work_dir.display()
            )));
        }
        if self.cache_dir.as_os_str().is_empty() {
            return Err(Error::Config("Cache directory must not be empty".to_string()));
        }
        validate_name(&self.db_name)
            .map_err(|_| Error::Config(format!("Invalid database file name '{}'", self.db_name)))?;
        if !COMPRESSION_LEVELS.contains(&self.compression_level) {
            return Err(Error::Config(format!(
                "Compression level {} outside {}..={}",
                self.compression_level,
                COMPRESSION_LEVELS.start(),
                COMPRESSION_LEVELS.end()
            )));
        }
        Ok(())
    }

    pub fn cache_root(&self) -> PathBuf {
        self.work_dir.join(&self.cache_dir)
    }

    pub fn db_path(&self) -> PathBuf {
        self.work_dir.join(&self.db_name)
    }

    pub fn publish_root(&self) -> PathBuf {
        self.work_dir.join(&self.publish_root)
    }

    /// Resolve a user-supplied path against `work_dir`
    pub fn resolve_path(&self, path: &Path) -> PathBuf {
        self.work_dir.join(path)
    }
}

// src/publish/mod.rs

//! Publishing packages and the database into a repository directory
//!
//! Lays out `<publish root>/<repo>/` the way pacman-style clients expect it:
//! every package file next to `<repo>.db.tar.zst` and a `<repo>.db` link.

use crate::error::{Error, Result};
use crate::packages::validate_name;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Default directory holding published repositories, relative to the working directory
pub const DEFAULT_PUBLISH_ROOT: &str = "root";

/// Result of a publish run
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PublishSummary {
    pub repo_dir: PathBuf,
    pub packages: Vec<PathBuf>,
    pub database: PathBuf,
}

/// Copies package files and the database archive into a named repository
#[derive(Debug, Clone)]
pub struct RepoPublisher {
    repo_name: String,
    repo_dir: PathBuf,
}

impl RepoPublisher {
    /// Create a publisher for repository `repo_name` under `publish_root`
    pub fn new(publish_root: &Path, repo_name: &str) -> Result<Self> {
        validate_name(repo_name)?;
        Ok(Self {
            repo_name: repo_name.to_string(),
            repo_dir: publish_root.join(repo_name),
        })
    }

    pub fn repo_dir(&self) -> &Path {
        &self.repo_dir
    }

    /// File name of the published database archive
    pub fn database_file_name(&self) -> String {
        format!("{}.db.tar.zst", self.repo_name)
    }

    /// Copy `packages` and the finished `database` archive into the repository
    ///
    /// Must only be called once the database rebuild has completed.
    pub fn publish(&self, packages: &[PathBuf], database: &Path) -> Result<PublishSummary> {
        if !database.is_file() {
            return Err(Error::Publish(format!(
                "Database archive {} does not exist",
                database.display()
            )));
        }

        fs::create_dir_all(&self.repo_dir).map_err(|e| {
            Error::Publish(format!(
                "Failed to create repository directory {}: {}",
                self.repo_dir.display(),
                e
            ))
        })?;

        let mut published = Vec::with_capacity(packages.len());
        for package in packages {
            let file_name = package.file_name().ok_or_else(|| {
                Error::Publish(format!("Package path {} has no file name", package.display()))
            })?;
            let destination = self.repo_dir.join(file_name);

            if is_same_file(package, &destination) {
                debug!("{} is already in the repository", package.display());
            } else {
                copy_file(package, &destination)?;
                info!("Published {}", destination.display());
            }
            published.push(destination);
        }

        let database_copy = self.repo_dir.join(self.database_file_name());
        copy_file(database, &database_copy)?;
        self.link_database()?;
        info!("Published database {}", database_copy.display());

        Ok(PublishSummary {
            repo_dir: self.repo_dir.clone(),
            packages: published,
            database: database_copy,
        })
    }

    /// Point `<repo>.db` at the compressed database
    #[cfg(unix)]
    fn link_database(&self) -> Result<()> {
        let link = self.repo_dir.join(format!("{}.db", self.repo_name));

        if fs::symlink_metadata(&link).is_ok() {
            fs::remove_file(&link).map_err(|e| {
                Error::Publish(format!("Failed to replace {}: {}", link.display(), e))
            })?;
        }

        std::os::unix::fs::symlink(self.database_file_name(), &link).map_err(|e| {
            Error::Publish(format!("Failed to create link {}: {}", link.display(), e))
        })
    }

    #[cfg(not(unix))]
    fn link_database(&self) -> Result<()> {
        Ok(())
    }
}

fn is_same_file(a: &Path, b: &Path) -> bool {
    match (fs::canonicalize(a), fs::canonicalize(b)) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

fn copy_file(source: &Path, destination: &Path) -> Result<()> {
    fs::copy(source, destination).map_err(|e| {
        Error::Publish(format!(
            "Failed to copy {} to {}: {}",
            source.display(),
            destination.display(),
            e
        ))
    })?;
    Ok(())
}

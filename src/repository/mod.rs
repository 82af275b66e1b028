// src/repository/mod.rs

//! Repository database maintenance
//!
//! This module ties the pipeline together for one invocation:
//! - Extracting metadata from each package archive, in the order given
//! - Staging it in the cache store under the package name
//! - Rebuilding the database archive from the whole cache store
//! - Optionally publishing packages and database into a repository directory
//!
//! Batches are not atomic. When a package fails, packages staged before it
//! stay in the cache store and the run stops.

use crate::cache::{CacheEntry, CacheStore, ensure_dir};
use crate::config::RepoConfig;
use crate::db::{BuildSummary, DatabaseBuilder};
use crate::error::{Error, Result};
use crate::packages::PackageMetadata;
use crate::publish::{PublishSummary, RepoPublisher};
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

/// A package repository rooted at a resolved configuration
#[derive(Debug, Clone)]
pub struct Repository {
    config: RepoConfig,
    cache: CacheStore,
}

impl Repository {
    /// Open the repository described by `config`
    ///
    /// The configuration is resolved and validated; the filesystem is not
    /// touched.
    pub fn open(config: RepoConfig) -> Result<Self> {
        let config = config.resolve()?;
        let cache = CacheStore::new(config.cache_root());
        Ok(Self { config, cache })
    }

    pub fn config(&self) -> &RepoConfig {
        &self.config
    }

    pub fn cache(&self) -> &CacheStore {
        &self.cache
    }

    pub fn db_path(&self) -> PathBuf {
        self.config.db_path()
    }

    /// Extract and stage every package in `packages`
    ///
    /// An empty list is rejected before anything is written. When two
    /// packages declare the same name, the later one replaces the earlier.
    pub fn register<P: AsRef<Path>>(&self, packages: &[P]) -> Result<Vec<PackageMetadata>> {
        if packages.is_empty() {
            return Err(Error::NoPackages);
        }

        let mut registered = Vec::with_capacity(packages.len());
        let mut seen: HashMap<String, PathBuf> = HashMap::new();

        for package in packages {
            let path = self.config.resolve_path(package.as_ref());
            info!("Adding {}", path.display());

            let metadata = PackageMetadata::extract(&path)?;
            self.cache.stage(&metadata)?;

            if let Some(previous) = seen.insert(metadata.name.clone(), path.clone()) {
                warn!(
                    "{} replaces {} as the source of package {}",
                    path.display(),
                    previous.display(),
                    metadata.name
                );
            }
            registered.push(metadata);
        }

        Ok(registered)
    }

    /// Rebuild the database archive from the full cache store
    pub fn rebuild(&self) -> Result<BuildSummary> {
        ensure_dir(self.cache.root())?;

        DatabaseBuilder::new(self.cache.root(), self.config.db_path())
            .compression_level(self.config.compression_level)
            .build()
    }

    /// Copy `packages` and the current database archive into repository `repo_name`
    pub fn publish<P: AsRef<Path>>(
        &self,
        packages: &[P],
        repo_name: &str,
    ) -> Result<PublishSummary> {
        let publisher = RepoPublisher::new(&self.config.publish_root(), repo_name)?;
        let packages: Vec<PathBuf> = packages
            .iter()
            .map(|p| self.config.resolve_path(p.as_ref()))
            .collect();

        publisher.publish(&packages, &self.config.db_path())
    }

    /// Drop the named packages from the cache store
    ///
    /// Returns how many slots were actually removed. Unknown names are
    /// reported and skipped.
    pub fn remove<S: AsRef<str>>(&self, names: &[S]) -> Result<usize> {
        if names.is_empty() {
            return Err(Error::NoPackages);
        }

        let mut removed = 0;
        for name in names {
            let name = name.as_ref();
            if self.cache.remove(name)? {
                removed += 1;
            } else {
                warn!("Package {} is not in the cache", name);
            }
        }
        Ok(removed)
    }

    /// Packages currently staged in the cache store
    pub fn list(&self) -> Result<Vec<CacheEntry>> {
        self.cache.list()
    }
}

// src/lib.rs

//! repotool
//!
//! Builds and maintains a package repository database from package archives.
//!
//! # Architecture
//!
//! - Extraction: each package's `.PACKAGE` descriptor and `.MTREE` manifest
//! - Cache store: one directory per package name, persisted between runs
//! - Database: a zstd-compressed tarball rebuilt from the whole cache store
//! - Publishing: packages and database copied into a repository directory

pub mod cache;
pub mod config;
pub mod db;
mod error;
pub mod packages;
pub mod publish;
pub mod repository;

pub use cache::{CacheEntry, CacheStore};
pub use config::RepoConfig;
pub use db::{BuildSummary, DatabaseBuilder};
pub use error::{Error, Result};
pub use packages::PackageMetadata;
pub use publish::{PublishSummary, RepoPublisher};
pub use repository::Repository;

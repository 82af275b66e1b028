// src/error.rs

use std::path::PathBuf;
use thiserror::Error;

/// Core error types for repotool
#[derive(Error, Debug)]
pub enum Error {
    /// I/O errors
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Nothing to register
    #[error("No packages specified")]
    NoPackages,

    /// Invalid or incomplete configuration
    #[error("Configuration error: {0}")]
    Config(String),

    /// Package archive could not be opened or read
    #[error("Failed to read package {path}: {reason}")]
    PackageRead { path: PathBuf, reason: String },

    /// A required metadata entry is absent from the package archive
    #[error("Package {path} has no {entry} entry")]
    MissingEntry { path: PathBuf, entry: &'static str },

    /// The descriptor entry does not declare a package name
    #[error("No package name declared in descriptor of {0}")]
    MissingName(PathBuf),

    /// A package or repository name cannot be used as a directory name
    #[error("Invalid name '{0}': must be a single path component")]
    InvalidName(String),

    /// Expected a directory, found something else
    #[error("{0} exists but is not a directory")]
    NotADirectory(PathBuf),

    /// Cache store traversal failed
    #[error("Failed to scan cache store: {0}")]
    Walk(#[from] walkdir::Error),

    /// Database archive creation failed
    #[error("Archive error: {0}")]
    Archive(String),

    /// Copying outputs into the repository directory failed
    #[error("Publish error: {0}")]
    Publish(String),
}

/// Result type alias using repotool's Error type
pub type Result<T> = std::result::Result<T, Error>;

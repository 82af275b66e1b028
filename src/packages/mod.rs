// src/packages/mod.rs

//! Package archive support
//!
//! Reads the metadata entries a repository database needs out of package
//! archives (plain, zstd, xz or gzip compressed tar).

pub mod archive;
pub mod metadata;

pub use archive::{Compression, detect_compression, open_archive};
pub use metadata::{
    DESCRIPTOR_ENTRY, MANIFEST_ENTRY, PackageMetadata, parse_package_name, validate_name,
};

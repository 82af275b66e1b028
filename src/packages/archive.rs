// src/packages/archive.rs

//! Opening package archives
//!
//! Packages are tar streams, either plain or wrapped in zstd, xz or gzip.
//! The wrapper is detected from magic bytes rather than the file name, so
//! renamed or extension-less packages still open.

use crate::error::{Error, Result};
use flate2::read::GzDecoder;
use std::fs::File;
use std::io::{Read, Seek, SeekFrom};
use std::path::Path;
use tar::Archive;
use tracing::debug;
use xz2::read::XzDecoder;

const ZSTD_MAGIC: [u8; 4] = [0x28, 0xB5, 0x2F, 0xFD];
const XZ_MAGIC: [u8; 6] = [0xFD, 0x37, 0x7A, 0x58, 0x5A, 0x00];
const GZIP_MAGIC: [u8; 2] = [0x1F, 0x8B];

/// Compression wrapped around a package's tar stream
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Compression {
    None,
    Zstd,
    Xz,
    Gzip,
}

impl Compression {
    /// Identify the compression from the first bytes of a file
    pub fn from_magic(magic: &[u8]) -> Self {
        if magic.starts_with(&ZSTD_MAGIC) {
            Compression::Zstd
        } else if magic.starts_with(&XZ_MAGIC) {
            Compression::Xz
        } else if magic.starts_with(&GZIP_MAGIC) {
            Compression::Gzip
        } else {
            Compression::None
        }
    }
}

fn read_error(path: &Path, what: &str, err: impl std::fmt::Display) -> Error {
    Error::PackageRead {
        path: path.to_path_buf(),
        reason: format!("{}: {}", what, err),
    }
}

fn read_magic(file: &mut File, path: &Path) -> Result<Vec<u8>> {
    let mut magic = Vec::with_capacity(XZ_MAGIC.len());
    file.take(XZ_MAGIC.len() as u64)
        .read_to_end(&mut magic)
        .map_err(|e| read_error(path, "failed to read package header", e))?;
    Ok(magic)
}

/// Detect the compression of the package at `path`
pub fn detect_compression(path: &Path) -> Result<Compression> {
    let mut file =
        File::open(path).map_err(|e| read_error(path, "failed to open package file", e))?;
    let magic = read_magic(&mut file, path)?;

    Ok(Compression::from_magic(&magic))
}

/// Open a package as a tar archive, decompressing on the fly
pub fn open_archive(path: &Path) -> Result<Archive<Box<dyn Read>>> {
    let mut file =
        File::open(path).map_err(|e| read_error(path, "failed to open package file", e))?;

    let magic = read_magic(&mut file, path)?;
    file.seek(SeekFrom::Start(0))
        .map_err(|e| read_error(path, "failed to rewind package file", e))?;

    let compression = Compression::from_magic(&magic);
    debug!("Opening {} ({:?})", path.display(), compression);

    let reader: Box<dyn Read> = match compression {
        Compression::Zstd => {
            let decoder = zstd::Decoder::new(file)
                .map_err(|e| read_error(path, "failed to create zstd decoder", e))?;
            Box::new(decoder)
        }
        Compression::Xz => Box::new(XzDecoder::new(file)),
        Compression::Gzip => Box::new(GzDecoder::new(file)),
        Compression::None => Box::new(file),
    };

    Ok(Archive::new(reader))
}

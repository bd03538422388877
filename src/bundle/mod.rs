// This module reads the manifest of a single-file application bundle: a packaging format
// that embeds many files (managed assemblies, native libraries, deps/runtimeconfig json,
// symbols) inside one executable. At startup the host positions a Reader at the manifest
// section and asks for exactly N file entries. Each entry records where its payload sits
// in the image, how large it is, what type of file it is and its path relative to the
// application root. While reading, the manifest ORs together every entry's "needs
// extraction" flag so the host knows in one check whether anything has to be written to
// disk before execution. A manifest that cannot be parsed completely cannot be trusted,
// so every short read or malformed entry is a hard ManifestError.

//! Single-file bundle manifest.

pub mod entry;
pub mod manifest;
pub mod reader;

pub use entry::{FileEntry, FileType, MIN_ENTRY_LEN};
pub use manifest::Manifest;
pub use reader::{write_7bit_length, Reader, MAX_PATH_LENGTH};

use thiserror::Error;

/// Errors raised while reading a bundle manifest.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ManifestError {
    #[error("Unexpected end of bundle at offset {offset} ({needed} bytes needed)")]
    UnexpectedEof {
        offset: usize,
        needed: usize,
    },

    #[error("Malformed length prefix at offset {offset}")]
    InvalidLength {
        offset: usize,
    },

    #[error("Invalid path length {len} at offset {offset}")]
    InvalidPathLength {
        offset: usize,
        len: usize,
    },

    #[error("Path at offset {offset} is not valid UTF-8")]
    InvalidUtf8 {
        offset: usize,
    },

    #[error("Unknown file type {0}")]
    InvalidFileType(u8),

    #[error("Invalid manifest entry '{path}': {reason}")]
    InvalidEntry {
        path: String,
        reason: &'static str,
    },

    #[error("Manifest entry {index} of {expected}: {source}")]
    Entry {
        index: usize,
        expected: usize,
        source: Box<ManifestError>,
    },
}

/// Result type alias for manifest operations.
pub type ManifestResult<T> = Result<T, ManifestError>;

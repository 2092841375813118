//! Error types for tile archive access.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur while opening or querying a tile archive.
#[derive(Debug, Error)]
pub enum ArchiveError {
    /// The byte stream is not an SQLite container.
    #[error("Tile archive is corrupt: {0}")]
    Corrupt(String),

    /// Failed to spool archive bytes to local storage.
    #[error("Failed to stage tile archive at {path}: {source}")]
    Staging {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A query against an opened archive failed.
    #[error("Tile archive query failed: {0}")]
    Query(#[from] rusqlite::Error),
}

//! MBTiles archive reader.
//!
//! An MBTiles archive is an SQLite database with two tables:
//!
//! ```text
//! metadata(name TEXT, value TEXT)
//! tiles(zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB)
//! ```
//!
//! Rows in `tiles` use the TMS convention (row 0 at the south), so every
//! lookup flips the renderer's XYZ row first.
//!
//! Archives fetched over the network arrive as bytes; they are spooled to a
//! temporary file owned by the archive and opened read-only from there.

use std::collections::BTreeMap;
use std::fs::File;
use std::io::{Read, Write};
use std::path::{Path, PathBuf};

use parking_lot::Mutex;
use rusqlite::types::ValueRef;
use rusqlite::{params, Connection, OpenFlags, OptionalExtension};
use tempfile::NamedTempFile;
use tracing::{debug, warn};

use super::error::ArchiveError;
use super::source::{TileSource, ZoomRange};
use crate::coord::{flip_row, tiles_per_axis, TileCoord, MAX_ZOOM};

/// Every SQLite 3 database starts with this header.
const SQLITE_HEADER: &[u8; 16] = b"SQLite format 3\0";

/// Idle connections kept for reuse.
const MAX_IDLE_CONNECTIONS: usize = 8;

const TILE_QUERY: &str = "SELECT tile_data FROM tiles \
     WHERE zoom_level = ?1 AND tile_column = ?2 AND tile_row = ?3 LIMIT 1";

/// A read-only MBTiles archive.
///
/// The archive is `Send + Sync`. Each query checks out its own connection
/// from a small pool, so concurrent lookups never share cursor state.
pub struct MbTilesArchive {
    path: PathBuf,
    pool: Mutex<Vec<Connection>>,
    has_tiles: bool,
    has_metadata: bool,
    zoom_range: ZoomRange,
    // Keeps a spooled archive alive for as long as the handle exists.
    _spool: Option<NamedTempFile>,
}

impl MbTilesArchive {
    /// Opens an archive from raw bytes, e.g. a fetched `.mbtiles` document.
    pub fn open_bytes(bytes: &[u8]) -> Result<Self, ArchiveError> {
        check_header(bytes)?;

        let mut spool = tempfile::Builder::new()
            .prefix("cadaview-")
            .suffix(".mbtiles")
            .tempfile()
            .map_err(|source| ArchiveError::Staging {
                path: std::env::temp_dir(),
                source,
            })?;
        spool
            .write_all(bytes)
            .and_then(|_| spool.flush())
            .map_err(|source| ArchiveError::Staging {
                path: spool.path().to_path_buf(),
                source,
            })?;

        let path = spool.path().to_path_buf();
        Self::open_validated(path, Some(spool))
    }

    /// Opens an archive stored on the local filesystem.
    pub fn open_path(path: impl AsRef<Path>) -> Result<Self, ArchiveError> {
        let path = path.as_ref().to_path_buf();

        let mut header = Vec::with_capacity(SQLITE_HEADER.len());
        File::open(&path)
            .and_then(|f| f.take(SQLITE_HEADER.len() as u64).read_to_end(&mut header))
            .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", path.display(), e)))?;
        check_header(&header)?;

        Self::open_validated(path, None)
    }

    fn open_validated(path: PathBuf, spool: Option<NamedTempFile>) -> Result<Self, ArchiveError> {
        let conn = connect(&path)?;

        // SQLite opens lazily; reading the schema forces it to validate the file.
        let has_tiles = has_relation(&conn, "tiles")
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;
        let has_metadata = has_relation(&conn, "metadata")
            .map_err(|e| ArchiveError::Corrupt(e.to_string()))?;

        if !has_tiles {
            warn!(path = %path.display(), "Archive has no tiles table; every lookup will miss");
        }

        let mut archive = Self {
            path,
            pool: Mutex::new(vec![conn]),
            has_tiles,
            has_metadata,
            zoom_range: ZoomRange::default(),
            _spool: spool,
        };

        archive.zoom_range = match archive.read_metadata() {
            Ok(metadata) => ZoomRange::from_metadata(&metadata),
            Err(e) => {
                warn!(error = %e, "Failed to read archive metadata, using default zoom range");
                ZoomRange::default()
            }
        };

        debug!(
            path = %archive.path.display(),
            min_zoom = archive.zoom_range.min,
            max_zoom = archive.zoom_range.max,
            "Opened MBTiles archive"
        );

        Ok(archive)
    }

    /// Path of the underlying database file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Every key/value pair of the `metadata` table.
    ///
    /// Returns an empty map when the table is missing or empty. Numeric
    /// values are rendered as strings.
    pub fn read_metadata(&self) -> Result<BTreeMap<String, String>, ArchiveError> {
        if !self.has_metadata {
            return Ok(BTreeMap::new());
        }

        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached("SELECT name, value FROM metadata")?;
            let mut rows = stmt.query([])?;
            let mut metadata = BTreeMap::new();
            while let Some(row) = rows.next()? {
                let Some(name) = value_to_string(row.get_ref(0)?) else {
                    continue;
                };
                let value = value_to_string(row.get_ref(1)?).unwrap_or_default();
                metadata.insert(name, value);
            }
            Ok(metadata)
        })
    }

    /// Zoom range declared by the archive, with defaults applied.
    pub fn zoom_range(&self) -> ZoomRange {
        self.zoom_range
    }

    /// Looks up the tile at an XYZ coordinate.
    ///
    /// Coordinates that cannot exist at `zoom`, or that the archive does not
    /// populate, resolve to `Ok(None)`.
    pub fn resolve_tile(
        &self,
        zoom: u8,
        column: u32,
        row: u32,
    ) -> Result<Option<Vec<u8>>, ArchiveError> {
        if !self.has_tiles || zoom > MAX_ZOOM {
            return Ok(None);
        }
        if column >= tiles_per_axis(zoom) {
            return Ok(None);
        }
        let Some(archive_row) = flip_row(zoom, row) else {
            return Ok(None);
        };
        self.with_connection(|conn| {
            let mut stmt = conn.prepare_cached(TILE_QUERY)?;
            let data: Option<Option<Vec<u8>>> = stmt
                .query_row(params![zoom, column, archive_row], |row| row.get(0))
                .optional()?;
            Ok(data.flatten())
        })
    }

    /// Number of rows in the `tiles` table.
    pub fn tile_count(&self) -> Result<u64, ArchiveError> {
        if !self.has_tiles {
            return Ok(0);
        }
        self.with_connection(|conn| {
            conn.query_row("SELECT COUNT(*) FROM tiles", [], |row| row.get::<_, i64>(0))
                .map(|n| n.max(0) as u64)
        })
    }

    fn with_connection<T>(
        &self,
        f: impl FnOnce(&Connection) -> rusqlite::Result<T>,
    ) -> Result<T, ArchiveError> {
        let pooled = self.pool.lock().pop();
        let conn = match pooled {
            Some(conn) => conn,
            None => connect(&self.path)?,
        };

        let result = f(&conn);

        let mut pool = self.pool.lock();
        if pool.len() < MAX_IDLE_CONNECTIONS {
            pool.push(conn);
        }

        result.map_err(ArchiveError::from)
    }
}

impl TileSource for MbTilesArchive {
    fn resolve(&self, coord: TileCoord) -> Result<Option<Vec<u8>>, ArchiveError> {
        self.resolve_tile(coord.zoom, coord.column, coord.row)
    }

    fn zoom_range(&self) -> ZoomRange {
        self.zoom_range
    }
}

impl std::fmt::Debug for MbTilesArchive {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MbTilesArchive")
            .field("path", &self.path)
            .field("has_tiles", &self.has_tiles)
            .field("has_metadata", &self.has_metadata)
            .field("zoom_range", &self.zoom_range)
            .finish()
    }
}

fn check_header(bytes: &[u8]) -> Result<(), ArchiveError> {
    if bytes.len() < SQLITE_HEADER.len() || &bytes[..SQLITE_HEADER.len()] != SQLITE_HEADER {
        return Err(ArchiveError::Corrupt(
            "missing SQLite header".to_string(),
        ));
    }
    Ok(())
}

fn connect(path: &Path) -> Result<Connection, ArchiveError> {
    Connection::open_with_flags(
        path,
        OpenFlags::SQLITE_OPEN_READ_ONLY | OpenFlags::SQLITE_OPEN_NO_MUTEX,
    )
    .map_err(|e| ArchiveError::Corrupt(format!("{}: {}", path.display(), e)))
}

fn has_relation(conn: &Connection, name: &str) -> rusqlite::Result<bool> {
    conn.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type IN ('table', 'view') AND name = ?1",
        params![name],
        |row| row.get::<_, i64>(0),
    )
    .map(|n| n > 0)
}

fn value_to_string(value: ValueRef<'_>) -> Option<String> {
    match value {
        ValueRef::Null => None,
        ValueRef::Integer(i) => Some(i.to_string()),
        ValueRef::Real(f) => Some(f.to_string()),
        ValueRef::Text(t) | ValueRef::Blob(t) => Some(String::from_utf8_lossy(t).into_owned()),
    }
}

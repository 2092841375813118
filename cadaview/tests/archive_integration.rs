//! Integration tests for MBTiles overlays.
//!
//! These tests build real SQLite archives in a scratch directory and check:
//! - Metadata and zoom range defaults
//! - XYZ → TMS row flipping on lookup
//! - Concurrent lookups through a shared `Arc<dyn TileSource>`
//! - Overlays fetched as bytes through a session
//!
//! Run with: `cargo test --test archive_integration`

use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::thread;

use rusqlite::{params, Connection};
use tempfile::TempDir;

use cadaview::archive::{MbTilesArchive, TileSource, ZoomRange};
use cadaview::config::{ConfigFile, OverlayConfig};
use cadaview::coord::{flip_row, TileCoord};
use cadaview::layer::TileResponse;
use cadaview::testing::{MockDocumentClient, RecordingView};
use cadaview::MapSession;

// ============================================================================
// Helper Functions
// ============================================================================

/// Create an archive at `path` with the given metadata and XYZ tiles.
///
/// Tiles are stored with TMS rows, as real MBTiles archives are.
fn build_archive(path: &Path, metadata: Option<&[(&str, &str)]>, tiles: &[(u8, u32, u32, &[u8])]) {
    let conn = Connection::open(path).unwrap();
    conn.execute_batch(
        "CREATE TABLE tiles (zoom_level INTEGER, tile_column INTEGER, tile_row INTEGER, tile_data BLOB);",
    )
    .unwrap();

    if let Some(metadata) = metadata {
        conn.execute_batch("CREATE TABLE metadata (name TEXT, value TEXT);")
            .unwrap();
        for (name, value) in metadata {
            conn.execute(
                "INSERT INTO metadata (name, value) VALUES (?1, ?2)",
                params![name, value],
            )
            .unwrap();
        }
    }

    for (zoom, column, row, data) in tiles {
        conn.execute(
            "INSERT INTO tiles VALUES (?1, ?2, ?3, ?4)",
            params![zoom, column, flip_row(*zoom, *row).unwrap(), data],
        )
        .unwrap();
    }
}

fn archive_in(temp: &TempDir, metadata: Option<&[(&str, &str)]>, tiles: &[(u8, u32, u32, &[u8])]) -> PathBuf {
    let path = temp.path().join("overlay.mbtiles");
    build_archive(&path, metadata, tiles);
    path
}

fn overlay(url: &str) -> OverlayConfig {
    OverlayConfig {
        id: "ortho".to_string(),
        name: "Orthophoto".to_string(),
        overlay_type: "mbtiles".to_string(),
        url: url.to_string(),
        attribution: String::new(),
        opacity: 0.8,
    }
}

// ============================================================================
// Archive Tests
// ============================================================================

#[test]
fn test_archive_without_metadata_uses_defaults() {
    let temp = TempDir::new().unwrap();
    let path = archive_in(&temp, None, &[]);

    let archive = MbTilesArchive::open_path(&path).unwrap();

    assert!(archive.read_metadata().unwrap().is_empty());
    assert_eq!(archive.zoom_range(), ZoomRange { min: 14, max: 19 });
}

#[test]
fn test_archive_reads_declared_zoom_range() {
    let temp = TempDir::new().unwrap();
    let path = archive_in(
        &temp,
        Some(&[("name", "ortho"), ("minzoom", "12"), ("maxzoom", "18")]),
        &[],
    );

    let archive = MbTilesArchive::open_path(&path).unwrap();

    assert_eq!(archive.zoom_range(), ZoomRange { min: 12, max: 18 });
    assert_eq!(
        archive.read_metadata().unwrap().get("name").map(String::as_str),
        Some("ortho")
    );
}

#[test]
fn test_lookup_flips_rows() {
    let temp = TempDir::new().unwrap();
    let path = archive_in(&temp, None, &[(3, 2, 1, b"tile-3-2-1")]);
    let archive = MbTilesArchive::open_path(&path).unwrap();

    assert_eq!(archive.resolve_tile(3, 2, 1).unwrap(), Some(b"tile-3-2-1".to_vec()));
    // The stored TMS row is a different XYZ row and must not match
    assert_eq!(archive.resolve_tile(3, 2, flip_row(3, 1).unwrap()).unwrap(), None);
}

#[test]
fn test_missing_tile_is_none_not_error() {
    let temp = TempDir::new().unwrap();
    let path = archive_in(&temp, None, &[(3, 2, 1, b"x")]);
    let archive = MbTilesArchive::open_path(&path).unwrap();

    assert_eq!(archive.resolve_tile(3, 0, 0).unwrap(), None);
    assert_eq!(archive.resolve_tile(3, 100, 0).unwrap(), None);
    assert_eq!(archive.resolve_tile(30, 0, 0).unwrap(), None);
}

#[test]
fn test_open_bytes_matches_open_path() {
    let temp = TempDir::new().unwrap();
    let path = archive_in(&temp, Some(&[("maxzoom", "17")]), &[(5, 10, 11, b"abc")]);
    let bytes = std::fs::read(&path).unwrap();

    let archive = MbTilesArchive::open_bytes(&bytes).unwrap();

    assert_eq!(archive.zoom_range().max, 17);
    assert_eq!(archive.tile_count().unwrap(), 1);
    assert_eq!(archive.resolve_tile(5, 10, 11).unwrap(), Some(b"abc".to_vec()));
}

#[test]
fn test_concurrent_lookups_are_independent() {
    let temp = TempDir::new().unwrap();
    let tiles: Vec<(u8, u32, u32, Vec<u8>)> = (0..16u32)
        .map(|i| (4u8, i, i, format!("tile-{}", i).into_bytes()))
        .collect();
    let borrowed: Vec<(u8, u32, u32, &[u8])> = tiles
        .iter()
        .map(|(z, x, y, d)| (*z, *x, *y, d.as_slice()))
        .collect();
    let path = archive_in(&temp, None, &borrowed);

    let source: Arc<dyn TileSource> = Arc::new(MbTilesArchive::open_path(&path).unwrap());

    let handles: Vec<_> = (0..16u32)
        .map(|i| {
            let source = Arc::clone(&source);
            thread::spawn(move || {
                let hit = source.resolve(TileCoord::new(4, i, i).unwrap()).unwrap();
                let miss = source
                    .resolve(TileCoord::new(4, i, (i + 1) % 16).unwrap())
                    .unwrap();
                (i, hit, miss)
            })
        })
        .collect();

    for handle in handles {
        let (i, hit, miss) = handle.join().unwrap();
        assert_eq!(hit, Some(format!("tile-{}", i).into_bytes()));
        assert_eq!(miss, None);
    }
}

// ============================================================================
// Session Tests
// ============================================================================

#[tokio::test]
async fn test_session_serves_overlay_tiles() {
    let temp = TempDir::new().unwrap();
    let path = archive_in(&temp, None, &[(16, 33000, 22000, b"png")]);
    let bytes = std::fs::read(&path).unwrap();

    let mut config = ConfigFile::default();
    config.layers.clear();
    config.overlays = vec![overlay("data/ortho.mbtiles")];
    let client = MockDocumentClient::new().with_document("data/ortho.mbtiles", bytes);

    let mut session = MapSession::new(config, RecordingView::new());
    let report = session.start(&client).await;

    assert_eq!(report.loaded, vec!["ortho"]);
    assert_eq!(session.view().attached(), vec!["ortho"]);
    assert_eq!(
        session.tile("ortho", 16, 33000, 22000),
        TileResponse::Tile(b"png".to_vec())
    );
    assert_eq!(session.tile("ortho", 16, 0, 0), TileResponse::Unavailable);
    assert_eq!(session.tile("ortho", 40, 0, 0), TileResponse::Unavailable);
}

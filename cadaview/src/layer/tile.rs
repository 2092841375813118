//! Raster overlay layers backed by a [`TileSource`].

use std::sync::Arc;

use tracing::{debug, warn};

use crate::archive::{TileSource, ZoomRange};
use crate::config::OverlayConfig;
use crate::coord::TileCoord;

/// What a renderer gets back for one tile request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TileResponse {
    /// Raw image bytes as stored in the archive.
    Tile(Vec<u8>),
    /// Nothing to draw: the tile is missing, out of range, or could not be read.
    Unavailable,
}

impl TileResponse {
    pub fn is_available(&self) -> bool {
        matches!(self, TileResponse::Tile(_))
    }
}

/// A raster overlay composed over a shared tile source.
///
/// Tile failures stop here: they are logged and turned into
/// [`TileResponse::Unavailable`] so a bad tile never reaches the user as
/// an error.
#[derive(Clone)]
pub struct TileLayer {
    config: OverlayConfig,
    source: Arc<dyn TileSource>,
}

impl TileLayer {
    pub fn new(config: OverlayConfig, source: Arc<dyn TileSource>) -> Self {
        Self { config, source }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &OverlayConfig {
        &self.config
    }

    /// Shared handle to the underlying source, for renderers that fetch
    /// tiles from their own worker threads.
    pub fn source(&self) -> Arc<dyn TileSource> {
        Arc::clone(&self.source)
    }

    pub fn zoom_range(&self) -> ZoomRange {
        self.source.zoom_range()
    }

    /// Serves the tile at an XYZ coordinate.
    pub fn tile(&self, coord: TileCoord) -> TileResponse {
        match self.source.resolve(coord) {
            Ok(Some(bytes)) => TileResponse::Tile(bytes),
            Ok(None) => {
                debug!(layer = %self.config.id, tile = %coord, "No tile stored");
                TileResponse::Unavailable
            }
            Err(e) => {
                warn!(layer = %self.config.id, tile = %coord, error = %e, "Tile read failed");
                TileResponse::Unavailable
            }
        }
    }

    /// Serves a tile from raw renderer coordinates.
    ///
    /// Coordinates outside the `2^zoom` grid are unavailable, not errors.
    pub fn tile_at(&self, zoom: u8, column: u32, row: u32) -> TileResponse {
        match TileCoord::new(zoom, column, row) {
            Ok(coord) => self.tile(coord),
            Err(e) => {
                debug!(layer = %self.config.id, error = %e, "Tile request outside grid");
                TileResponse::Unavailable
            }
        }
    }
}

impl std::fmt::Debug for TileLayer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TileLayer")
            .field("id", &self.config.id)
            .field("zoom_range", &self.source.zoom_range())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::archive::ArchiveError;
    use crate::config::OVERLAY_TYPE_MBTILES;

    struct FixedSource;

    impl TileSource for FixedSource {
        fn resolve(&self, coord: TileCoord) -> Result<Option<Vec<u8>>, ArchiveError> {
            match coord.zoom {
                1 => Ok(Some(vec![coord.column as u8, coord.row as u8])),
                2 => Err(ArchiveError::Corrupt("broken page".to_string())),
                _ => Ok(None),
            }
        }

        fn zoom_range(&self) -> ZoomRange {
            ZoomRange { min: 1, max: 2 }
        }
    }

    fn overlay() -> TileLayer {
        TileLayer::new(
            OverlayConfig {
                id: "ortho".to_string(),
                name: "Orthophoto".to_string(),
                overlay_type: OVERLAY_TYPE_MBTILES.to_string(),
                url: "ortho.mbtiles".to_string(),
                attribution: String::new(),
                opacity: 1.0,
            },
            Arc::new(FixedSource),
        )
    }

    #[test]
    fn test_tile_found() {
        assert_eq!(overlay().tile_at(1, 1, 0), TileResponse::Tile(vec![1, 0]));
    }

    #[test]
    fn test_missing_tile_is_unavailable() {
        assert_eq!(overlay().tile_at(3, 0, 0), TileResponse::Unavailable);
    }

    #[test]
    fn test_source_error_is_unavailable() {
        assert_eq!(overlay().tile_at(2, 0, 0), TileResponse::Unavailable);
    }

    #[test]
    fn test_outside_grid_is_unavailable() {
        assert_eq!(overlay().tile_at(1, 2, 0), TileResponse::Unavailable);
    }

    #[test]
    fn test_zoom_range_comes_from_source() {
        assert_eq!(overlay().zoom_range(), ZoomRange { min: 1, max: 2 });
    }
}

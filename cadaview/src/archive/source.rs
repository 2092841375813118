//! Renderer-facing tile source abstraction.

use std::collections::BTreeMap;

use super::error::ArchiveError;
use crate::coord::TileCoord;

/// Zoom level used when an archive does not declare `minzoom`.
pub const DEFAULT_MIN_ZOOM: u8 = 14;

/// Zoom level used when an archive does not declare `maxzoom`.
pub const DEFAULT_MAX_ZOOM: u8 = 19;

/// Inclusive zoom range served by a tile source.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ZoomRange {
    pub min: u8,
    pub max: u8,
}

impl Default for ZoomRange {
    fn default() -> Self {
        Self {
            min: DEFAULT_MIN_ZOOM,
            max: DEFAULT_MAX_ZOOM,
        }
    }
}

impl ZoomRange {
    /// Reads `minzoom`/`maxzoom` from archive metadata.
    ///
    /// Each bound falls back to its default independently when the key is
    /// absent or not a number.
    pub fn from_metadata(metadata: &BTreeMap<String, String>) -> Self {
        let parse = |key: &str| {
            metadata
                .get(key)
                .and_then(|v| v.trim().parse::<u8>().ok())
        };
        Self {
            min: parse("minzoom").unwrap_or(DEFAULT_MIN_ZOOM),
            max: parse("maxzoom").unwrap_or(DEFAULT_MAX_ZOOM),
        }
    }

    pub fn contains(&self, zoom: u8) -> bool {
        (self.min..=self.max).contains(&zoom)
    }
}

/// A coordinate-addressable source of raw tile bytes.
///
/// Implementations must be safe to call from many threads at once: map
/// renderers request tiles in parallel while the user pans and zooms.
pub trait TileSource: Send + Sync {
    /// Returns the tile stored at `coord`, or `None` when nothing is stored
    /// there. Missing tiles are not errors.
    fn resolve(&self, coord: TileCoord) -> Result<Option<Vec<u8>>, ArchiveError>;

    /// Zoom levels this source serves.
    fn zoom_range(&self) -> ZoomRange;
}

#[cfg(test)]
mod tests {
    use super::*;

    fn metadata(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_zoom_range_defaults_when_missing() {
        assert_eq!(
            ZoomRange::from_metadata(&BTreeMap::new()),
            ZoomRange { min: 14, max: 19 }
        );
    }

    #[test]
    fn test_zoom_range_defaults_when_not_numeric() {
        let range = ZoomRange::from_metadata(&metadata(&[("minzoom", "low"), ("maxzoom", "17")]));
        assert_eq!(range, ZoomRange { min: 14, max: 17 });
    }

    #[test]
    fn test_zoom_range_trims_values() {
        let range = ZoomRange::from_metadata(&metadata(&[("minzoom", " 12 "), ("maxzoom", "20")]));
        assert_eq!(range, ZoomRange { min: 12, max: 20 });
        assert!(range.contains(12));
        assert!(!range.contains(21));
    }
}

//! Coordinate conversion module
//!
//! Provides conversions between geographic coordinates (latitude/longitude)
//! and Web Mercator tile coordinates, and between the two row numbering
//! conventions in use:
//!
//! - **XYZ**: row 0 is the northernmost row. Used by map renderers.
//! - **TMS**: row 0 is the southernmost row. Used by MBTiles archives.
//!
//! The conversion `2^zoom - row - 1` is its own inverse, so the same
//! function maps in both directions.

mod types;

pub use types::{
    tiles_per_axis, Bounds, CoordError, TileCoord, MAX_LAT, MAX_LON, MAX_ZOOM, MIN_LAT, MIN_LON,
    MIN_ZOOM,
};

use std::f64::consts::PI;

/// Flips a row between the XYZ and TMS conventions.
///
/// Returns `None` when `row` is not below `2^zoom`.
#[inline]
pub fn flip_row(zoom: u8, row: u32) -> Option<u32> {
    1u32.checked_shl(u32::from(zoom))?
        .checked_sub(row)?
        .checked_sub(1)
}

/// Converts geographic coordinates to tile coordinates.
///
/// # Arguments
///
/// * `lat` - Latitude in degrees (-85.05112878 to 85.05112878)
/// * `lon` - Longitude in degrees (-180.0 to 180.0)
/// * `zoom` - Zoom level (0 to 30)
#[inline]
pub fn to_tile_coords(lat: f64, lon: f64, zoom: u8) -> Result<TileCoord, CoordError> {
    if !(MIN_LAT..=MAX_LAT).contains(&lat) {
        return Err(CoordError::InvalidLatitude(lat));
    }
    if !(MIN_LON..=MAX_LON).contains(&lon) {
        return Err(CoordError::InvalidLongitude(lon));
    }
    if zoom > MAX_ZOOM {
        return Err(CoordError::InvalidZoom(zoom));
    }

    let n = 2.0_f64.powi(zoom as i32);
    let max_index = tiles_per_axis(zoom) - 1;

    // lon = 180 and lat = MIN_LAT land exactly on the far edge
    let column = (((lon + 180.0) / 360.0 * n) as u32).min(max_index);

    let lat_rad = lat * PI / 180.0;
    let row = (((1.0 - lat_rad.tan().asinh() / PI) / 2.0 * n) as u32).min(max_index);

    TileCoord::new(zoom, column, row)
}

/// Converts tile coordinates back to geographic coordinates.
///
/// Returns the latitude/longitude of the tile's northwest corner.
#[inline]
pub fn tile_to_lat_lon(tile: &TileCoord) -> (f64, f64) {
    let n = 2.0_f64.powi(tile.zoom as i32);

    let lon = tile.column as f64 / n * 360.0 - 180.0;

    let y = tile.row as f64 / n;
    let lat_rad = (PI * (1.0 - 2.0 * y)).sinh().atan();
    let lat = lat_rad * 180.0 / PI;

    (lat, lon)
}

/// Geographic extent covered by a tile.
pub fn tile_bounds(tile: &TileCoord) -> Bounds {
    let (north, west) = tile_to_lat_lon(tile);
    let n = 2.0_f64.powi(tile.zoom as i32);
    let east = (tile.column as f64 + 1.0) / n * 360.0 - 180.0;
    let y = (tile.row as f64 + 1.0) / n;
    let south = (PI * (1.0 - 2.0 * y)).sinh().atan() * 180.0 / PI;
    Bounds::new(west, south, east, north)
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn test_flip_row_at_zoom_zero() {
        assert_eq!(flip_row(0, 0), Some(0));
    }

    #[test]
    fn test_flip_row_known_values() {
        // zoom 2 has rows 0..=3
        assert_eq!(flip_row(2, 0), Some(3));
        assert_eq!(flip_row(2, 3), Some(0));
        assert_eq!(flip_row(2, 1), Some(2));
        assert_eq!(flip_row(19, 0), Some((1 << 19) - 1));
    }

    #[test]
    fn test_flip_row_out_of_range_is_none() {
        assert_eq!(flip_row(2, 4), None);
        assert_eq!(flip_row(0, 1), None);
        assert_eq!(flip_row(3, u32::MAX), None);
        assert_eq!(flip_row(40, 0), None);
    }

    #[test]
    fn test_tile_coord_rejects_out_of_range() {
        assert!(TileCoord::new(2, 3, 3).is_ok());
        assert!(matches!(
            TileCoord::new(2, 4, 0),
            Err(CoordError::OutOfRange { .. })
        ));
        assert!(matches!(
            TileCoord::new(2, 0, 4),
            Err(CoordError::OutOfRange { .. })
        ));
        assert!(matches!(
            TileCoord::new(31, 0, 0),
            Err(CoordError::InvalidZoom(31))
        ));
    }

    #[test]
    fn test_archive_row_uses_flip() {
        let tile = TileCoord::new(16, 20000, 30000).unwrap();
        assert_eq!(tile.archive_row(), Some(65536 - 30000 - 1));

        let unchecked = TileCoord {
            zoom: 2,
            column: 0,
            row: 7,
        };
        assert_eq!(unchecked.archive_row(), None);
    }

    #[test]
    fn test_new_york_city_at_zoom_16() {
        let tile = to_tile_coords(40.7128, -74.0060, 16).unwrap();
        assert_eq!(tile.row, 24640);
        assert_eq!(tile.column, 19295);
        assert_eq!(tile.zoom, 16);
    }

    #[test]
    fn test_invalid_latitude() {
        let result = to_tile_coords(90.0, 0.0, 10);
        assert!(matches!(result, Err(CoordError::InvalidLatitude(_))));
    }

    #[test]
    fn test_far_edges_clamp_to_last_tile() {
        let tile = to_tile_coords(MIN_LAT, 180.0, 3).unwrap();
        assert_eq!(tile.column, 7);
        assert_eq!(tile.row, 7);
    }

    #[test]
    fn test_tile_bounds_contains_source_point() {
        let (lat, lon) = (14.6415, -61.0242);
        let tile = to_tile_coords(lat, lon, 16).unwrap();
        let bounds = tile_bounds(&tile);

        assert!(bounds.min_lon <= lon && lon <= bounds.max_lon);
        assert!(bounds.min_lat <= lat && lat <= bounds.max_lat);
    }

    #[test]
    fn test_bounds_union() {
        let a = Bounds::new(0.0, 0.0, 1.0, 1.0);
        let b = Bounds::new(-1.0, 0.5, 0.5, 2.0);
        assert_eq!(a.union(&b), Bounds::new(-1.0, 0.0, 1.0, 2.0));
    }

    proptest! {
        #[test]
        fn flip_row_is_self_inverse(zoom in 0u8..=MAX_ZOOM, seed in any::<u32>()) {
            let row = seed % tiles_per_axis(zoom);
            let flipped = flip_row(zoom, row);
            prop_assert_eq!(flipped.and_then(|f| flip_row(zoom, f)), Some(row));
        }

        #[test]
        fn flip_row_stays_in_range(zoom in 0u8..=MAX_ZOOM, seed in any::<u32>()) {
            let row = seed % tiles_per_axis(zoom);
            let flipped = flip_row(zoom, row);
            prop_assert!(flipped.is_some_and(|f| f < tiles_per_axis(zoom)));
        }
    }
}

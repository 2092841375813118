//! Tile archive adapter.
//!
//! Presents a byte-addressed MBTiles archive as a coordinate-addressable
//! [`TileSource`]. Renderers hold the source behind `Arc<dyn TileSource>`
//! and compose it into a [`crate::layer::TileLayer`]; nothing here knows
//! about the renderer.
//!
//! # Example
//!
//! ```ignore
//! use cadaview::archive::{MbTilesArchive, TileSource};
//!
//! let archive = MbTilesArchive::open_bytes(&bytes)?;
//! let range = archive.zoom_range();
//! let tile = archive.resolve_tile(16, 21290, 30640)?;
//! ```

mod error;
mod mbtiles;
mod source;

pub use error::ArchiveError;
pub use mbtiles::MbTilesArchive;
pub use source::{TileSource, ZoomRange, DEFAULT_MAX_ZOOM, DEFAULT_MIN_ZOOM};

//! Cadaview - Cadastral map viewer core
//!
//! This library loads the layers of a cadastral map (MBTiles raster overlays
//! and GeoJSON parcel layers), drives feature interaction, lot search,
//! attribute filtering and GeoJSON export, and prepares the published data
//! from raw exports.
//!
//! The rendering surface is abstracted behind [`session::MapView`]; a
//! [`session::MapSession`] owns the layers and issues view commands.

pub mod archive;
pub mod config;
pub mod coord;
pub mod export;
pub mod layer;
pub mod loader;
pub mod logging;
pub mod popup;
pub mod process;
pub mod search;
pub mod session;
pub mod style;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use config::ConfigFile;
pub use coord::{Bounds, TileCoord};
pub use layer::{LayerRegistry, LoadedLayer};
pub use session::{MapSession, MapView};

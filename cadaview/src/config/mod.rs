//! Viewer configuration.
//!
//! The configuration lives in an INI file (`~/.cadaview/config.ini` by
//! default). Each concern is split into its own file:
//!
//! - [`settings`]: one plain struct per section
//! - [`defaults`]: default values
//! - `parser` / `writer`: INI → `ConfigFile` and back
//! - [`keys`]: `section.key` access for the CLI
//!
//! # Example
//!
//! ```
//! use cadaview::config::ConfigFile;
//!
//! let config = ConfigFile::from_ini_str("[layer.lots]\nurl = lots.geojson\n").unwrap();
//! assert_eq!(config.layers.len(), 1);
//! assert_eq!(config.search.identifier_attribute, "num_lot");
//! ```

pub mod defaults;
mod file;
pub mod keys;
mod parser;
pub mod settings;
mod writer;

pub use file::{config_directory, config_file_path, ConfigFileError};
pub use keys::{ConfigKey, ConfigKeyError};
pub use settings::{
    BaseLayerConfig, ConfigFile, LayerConfig, LoaderSettings, LoggingSettings, MapSettings,
    OverlayConfig, PopupSettings, ProcessJob, ProcessSettings, SearchSettings,
    OVERLAY_TYPE_MBTILES,
};

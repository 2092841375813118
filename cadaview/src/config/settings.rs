//! Settings structs for all configuration sections.
//!
//! Each struct represents one `[section]` (or one family of
//! `[prefix.id]` sections) of the INI config file. These are pure data types
//! with no parsing or serialization logic.

use std::path::PathBuf;

use crate::popup::{NumberLocale, PopupOptions};
use crate::style::PathStyle;

/// Complete viewer configuration loaded from config.ini.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    /// Initial view and zoom bounds
    pub map: MapSettings,
    /// Vector layer fetching
    pub loader: LoaderSettings,
    /// Popup presentation
    pub popup: PopupSettings,
    /// Search behavior
    pub search: SearchSettings,
    /// Base imagery layers, in declaration order
    pub base_layers: Vec<BaseLayerConfig>,
    /// Raster overlays, in declaration order
    pub overlays: Vec<OverlayConfig>,
    /// Vector data layers, in declaration order
    pub layers: Vec<LayerConfig>,
    /// Data preparation pipeline
    pub process: ProcessSettings,
    /// Logging settings
    pub logging: LoggingSettings,
}

impl ConfigFile {
    /// Looks up a data layer by id.
    pub fn layer(&self, id: &str) -> Option<&LayerConfig> {
        self.layers.iter().find(|l| l.id == id)
    }
}

/// Map view settings.
#[derive(Debug, Clone, PartialEq)]
pub struct MapSettings {
    pub center_lat: f64,
    pub center_lon: f64,
    pub zoom: u8,
    pub min_zoom: u8,
    pub max_zoom: u8,
}

/// Vector layer loader settings.
#[derive(Debug, Clone, PartialEq)]
pub struct LoaderSettings {
    /// Append a changing query parameter so documents are never served stale
    pub cache_buster: bool,
    /// HTTP request timeout in seconds
    pub timeout: u64,
    /// Prefix for relative layer URLs; `None` resolves them against the
    /// working directory
    pub base_url: Option<String>,
}

/// Popup settings.
#[derive(Debug, Clone, PartialEq)]
pub struct PopupSettings {
    pub max_width: u32,
    pub class_name: String,
    pub locale: NumberLocale,
}

impl PopupSettings {
    pub fn options(&self) -> PopupOptions {
        PopupOptions {
            max_width: self.max_width,
            class_name: self.class_name.clone(),
            locale: self.locale,
        }
    }
}

/// Search settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SearchSettings {
    /// Attribute holding the feature identifier searched by lot number
    pub identifier_attribute: String,
}

/// A base imagery layer (`[basemap.<id>]`).
#[derive(Debug, Clone, PartialEq)]
pub struct BaseLayerConfig {
    pub id: String,
    pub name: String,
    /// URL template with `{z}`, `{x}`, `{y}` placeholders
    pub url: String,
    pub attribution: String,
}

/// Overlay kind handled by the viewer.
pub const OVERLAY_TYPE_MBTILES: &str = "mbtiles";

/// A raster overlay (`[overlay.<id>]`).
#[derive(Debug, Clone, PartialEq)]
pub struct OverlayConfig {
    pub id: String,
    pub name: String,
    /// Discriminator; only `mbtiles` is handled
    pub overlay_type: String,
    pub url: String,
    pub attribution: String,
    pub opacity: f64,
}

impl OverlayConfig {
    pub fn is_mbtiles(&self) -> bool {
        self.overlay_type.eq_ignore_ascii_case(OVERLAY_TYPE_MBTILES)
    }
}

/// A vector data layer (`[layer.<id>]`).
#[derive(Debug, Clone, PartialEq)]
pub struct LayerConfig {
    /// Registry key; the section suffix
    pub id: String,
    /// Display name
    pub name: String,
    pub url: String,
    pub style: PathStyle,
    /// Attach to the map as soon as the layer loads
    pub visible: bool,
    pub attribution: String,
}

impl LayerConfig {
    pub fn new(id: impl Into<String>, url: impl Into<String>) -> Self {
        let id = id.into();
        Self {
            name: id.clone(),
            id,
            url: url.into(),
            style: PathStyle::default(),
            visible: true,
            attribution: String::new(),
        }
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    pub fn with_style(mut self, style: PathStyle) -> Self {
        self.style = style;
        self
    }

    pub fn with_visible(mut self, visible: bool) -> Self {
        self.visible = visible;
        self
    }
}

/// Data preparation settings (`[process]` plus `[process.<layer>]` jobs).
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessSettings {
    pub raw_dir: PathBuf,
    pub processed_dir: PathBuf,
    pub backup_dir: PathBuf,
    /// Simplification tolerance in degrees
    pub simplify_tolerance: f64,
    /// Decimal places kept on coordinates
    pub precision: u32,
    /// Backups kept per output file
    pub keep_backups: usize,
    /// Attributes kept on output; empty keeps all
    pub attributes_to_keep: Vec<String>,
    pub jobs: Vec<ProcessJob>,
}

/// One source → output conversion.
#[derive(Debug, Clone, PartialEq)]
pub struct ProcessJob {
    pub layer: String,
    /// File name inside `raw_dir`
    pub source: String,
    /// File name inside `processed_dir`
    pub output: String,
    pub description: String,
}

/// Logging configuration.
#[derive(Debug, Clone, PartialEq)]
pub struct LoggingSettings {
    /// Log file path
    pub file: PathBuf,
}

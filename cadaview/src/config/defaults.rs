//! Default configuration values.

use std::path::PathBuf;

use super::file::config_directory;
use super::settings::*;
use crate::popup::NumberLocale;
use crate::style::PathStyle;

pub const DEFAULT_CENTER_LAT: f64 = 46.603354;
pub const DEFAULT_CENTER_LON: f64 = 1.888334;
pub const DEFAULT_ZOOM: u8 = 16;
pub const DEFAULT_MIN_ZOOM: u8 = 10;
pub const DEFAULT_MAX_ZOOM: u8 = 20;

/// Default HTTP timeout in seconds.
pub const DEFAULT_LOADER_TIMEOUT_SECS: u64 = 30;

pub const DEFAULT_POPUP_MAX_WIDTH: u32 = 300;
pub const DEFAULT_POPUP_CLASS: &str = "custom-popup";

/// Attribute holding the lot number.
pub const DEFAULT_IDENTIFIER_ATTRIBUTE: &str = "num_lot";

/// Roughly one metre at the equator.
pub const DEFAULT_SIMPLIFY_TOLERANCE: f64 = 0.00001;
pub const DEFAULT_PRECISION: u32 = 6;
/// Beyond this many decimal places `f64` coordinates stop changing.
pub const MAX_PRECISION: u32 = 15;
pub const DEFAULT_KEEP_BACKUPS: usize = 3;

impl Default for MapSettings {
    fn default() -> Self {
        Self {
            center_lat: DEFAULT_CENTER_LAT,
            center_lon: DEFAULT_CENTER_LON,
            zoom: DEFAULT_ZOOM,
            min_zoom: DEFAULT_MIN_ZOOM,
            max_zoom: DEFAULT_MAX_ZOOM,
        }
    }
}

impl Default for LoaderSettings {
    fn default() -> Self {
        Self {
            cache_buster: true,
            timeout: DEFAULT_LOADER_TIMEOUT_SECS,
            base_url: None,
        }
    }
}

impl Default for PopupSettings {
    fn default() -> Self {
        Self {
            max_width: DEFAULT_POPUP_MAX_WIDTH,
            class_name: DEFAULT_POPUP_CLASS.to_string(),
            locale: NumberLocale::default(),
        }
    }
}

impl Default for SearchSettings {
    fn default() -> Self {
        Self {
            identifier_attribute: DEFAULT_IDENTIFIER_ATTRIBUTE.to_string(),
        }
    }
}

impl Default for ProcessSettings {
    fn default() -> Self {
        Self {
            raw_dir: PathBuf::from("data/raw"),
            processed_dir: PathBuf::from("data/processed"),
            backup_dir: PathBuf::from("backup"),
            simplify_tolerance: DEFAULT_SIMPLIFY_TOLERANCE,
            precision: DEFAULT_PRECISION,
            keep_backups: DEFAULT_KEEP_BACKUPS,
            attributes_to_keep: Vec::new(),
            jobs: default_jobs(),
        }
    }
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            file: config_directory().join("cadaview.log"),
        }
    }
}

impl Default for ConfigFile {
    fn default() -> Self {
        Self {
            map: MapSettings::default(),
            loader: LoaderSettings::default(),
            popup: PopupSettings::default(),
            search: SearchSettings::default(),
            base_layers: vec![BaseLayerConfig {
                id: "osm".to_string(),
                name: "OpenStreetMap".to_string(),
                url: "https://{s}.tile.openstreetmap.org/{z}/{x}/{y}.png".to_string(),
                attribution: "© OpenStreetMap contributors".to_string(),
            }],
            overlays: Vec::new(),
            layers: default_layers(),
            process: ProcessSettings::default(),
            logging: LoggingSettings::default(),
        }
    }
}

fn default_layers() -> Vec<LayerConfig> {
    vec![
        LayerConfig::new("lots", "data/processed/lots.geojson").with_name("Lots"),
        LayerConfig::new("ilots", "data/processed/ilots.geojson")
            .with_name("Îlots")
            .with_style(PathStyle {
                color: "#ff7800".to_string(),
                fill_color: "#ff7800".to_string(),
                fill_opacity: 0.1,
                ..PathStyle::default()
            }),
        LayerConfig::new("polygonale", "data/processed/polygonale.geojson")
            .with_name("Polygonale")
            .with_style(PathStyle {
                color: "#e31a1c".to_string(),
                weight: 3.0,
                fill_color: "#e31a1c".to_string(),
                fill_opacity: 0.0,
                ..PathStyle::default()
            }),
    ]
}

fn default_jobs() -> Vec<ProcessJob> {
    let job = |layer: &str, source: &str, description: &str| ProcessJob {
        layer: layer.to_string(),
        source: source.to_string(),
        output: format!("{}.geojson", layer),
        description: description.to_string(),
    };
    vec![
        job("lots", "LOTS.gpkg", "Parcelles de lots"),
        job("ilots", "ILOTS.gpkg", "Îlots urbains"),
        job("polygonale", "POLYGONALE_ZONE_ETUDE.gpkg", "Polygonale cadastrale"),
    ]
}

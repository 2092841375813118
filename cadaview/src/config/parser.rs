//! INI parsing logic for converting `Ini` → `ConfigFile`.
//!
//! This module contains the `parse_ini()` function and its helpers.
//! It is the single place where INI key names are mapped to struct fields.

use ini::{Ini, Properties};
use std::path::PathBuf;
use std::str::FromStr;

use super::defaults::MAX_PRECISION;
use super::file::ConfigFileError;
use super::settings::*;
use crate::coord::MAX_ZOOM;
use crate::style::PathStyle;

const LAYER_PREFIX: &str = "layer.";
const OVERLAY_PREFIX: &str = "overlay.";
const BASEMAP_PREFIX: &str = "basemap.";
const PROCESS_JOB_PREFIX: &str = "process.";

const PRECISION_REASON: &str = "must be an integer between 0 and 15";

/// Parse an `Ini` object into a `ConfigFile`.
///
/// Starts from `ConfigFile::default()` and overlays any values found in the INI.
/// A file that declares at least one `[layer.*]`, `[overlay.*]`,
/// `[basemap.*]` or `[process.*]` section replaces the default list of that
/// kind instead of extending it.
pub(super) fn parse_ini(ini: &Ini) -> Result<ConfigFile, ConfigFileError> {
    let mut config = ConfigFile::default();

    // [map] section
    if let Some(section) = ini.section(Some("map")) {
        let map = &mut config.map;
        if let Some(v) = section.get("center_lat") {
            map.center_lat = parse_number(v, "map", "center_lat", "must be a latitude in degrees")?;
        }
        if let Some(v) = section.get("center_lon") {
            map.center_lon =
                parse_number(v, "map", "center_lon", "must be a longitude in degrees")?;
        }
        if let Some(v) = section.get("zoom") {
            map.zoom = parse_zoom(v, "zoom")?;
        }
        if let Some(v) = section.get("min_zoom") {
            map.min_zoom = parse_zoom(v, "min_zoom")?;
        }
        if let Some(v) = section.get("max_zoom") {
            map.max_zoom = parse_zoom(v, "max_zoom")?;
        }
        if map.min_zoom > map.max_zoom {
            return Err(ConfigFileError::InvalidValue {
                section: "map".to_string(),
                key: "min_zoom".to_string(),
                value: map.min_zoom.to_string(),
                reason: format!("must not exceed max_zoom ({})", map.max_zoom),
            });
        }
        if map.zoom < map.min_zoom || map.zoom > map.max_zoom {
            return Err(ConfigFileError::InvalidValue {
                section: "map".to_string(),
                key: "zoom".to_string(),
                value: map.zoom.to_string(),
                reason: format!(
                    "must lie between min_zoom ({}) and max_zoom ({})",
                    map.min_zoom, map.max_zoom
                ),
            });
        }
    }

    // [loader] section
    if let Some(section) = ini.section(Some("loader")) {
        if let Some(v) = section.get("cache_buster") {
            config.loader.cache_buster = parse_bool(v, "loader", "cache_buster")?;
        }
        if let Some(v) = section.get("timeout") {
            config.loader.timeout =
                parse_number(v, "loader", "timeout", "must be a positive integer (seconds)")?;
        }
        if let Some(v) = section.get("base_url") {
            config.loader.base_url = optional_string(v);
        }
    }

    // [popup] section
    if let Some(section) = ini.section(Some("popup")) {
        if let Some(v) = section.get("max_width") {
            config.popup.max_width =
                parse_number(v, "popup", "max_width", "must be a positive integer (pixels)")?;
        }
        if let Some(v) = section.get("class_name") {
            config.popup.class_name = v.trim().to_string();
        }
        if let Some(v) = section.get("locale") {
            config.popup.locale = v.parse().map_err(|_| ConfigFileError::InvalidValue {
                section: "popup".to_string(),
                key: "locale".to_string(),
                value: v.to_string(),
                reason: "must be one of: fr, en, de".to_string(),
            })?;
        }
    }

    // [search] section
    if let Some(section) = ini.section(Some("search")) {
        if let Some(v) = section.get("identifier_attribute") {
            let v = v.trim();
            if v.is_empty() {
                return Err(ConfigFileError::InvalidValue {
                    section: "search".to_string(),
                    key: "identifier_attribute".to_string(),
                    value: v.to_string(),
                    reason: "must not be empty".to_string(),
                });
            }
            config.search.identifier_attribute = v.to_string();
        }
    }

    // [process] section
    if let Some(section) = ini.section(Some("process")) {
        let process = &mut config.process;
        if let Some(v) = section.get("raw_dir") {
            process.raw_dir = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("processed_dir") {
            process.processed_dir = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("backup_dir") {
            process.backup_dir = expand_tilde(v.trim());
        }
        if let Some(v) = section.get("simplify_tolerance") {
            process.simplify_tolerance = parse_number(
                v,
                "process",
                "simplify_tolerance",
                "must be a non-negative number (degrees)",
            )?;
            if process.simplify_tolerance < 0.0 {
                return Err(invalid(
                    "process",
                    "simplify_tolerance",
                    v,
                    "must be a non-negative number (degrees)",
                ));
            }
        }
        if let Some(v) = section.get("precision") {
            process.precision =
                parse_number(v, "process", "precision", PRECISION_REASON)?;
            if process.precision > MAX_PRECISION {
                return Err(invalid("process", "precision", v, PRECISION_REASON));
            }
        }
        if let Some(v) = section.get("keep_backups") {
            process.keep_backups =
                parse_number(v, "process", "keep_backups", "must be a positive integer")?;
        }
        if let Some(v) = section.get("attributes_to_keep") {
            process.attributes_to_keep = v
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(str::to_string)
                .collect();
        }
    }

    // [logging] section
    if let Some(section) = ini.section(Some("logging")) {
        if let Some(v) = section.get("file") {
            let v = v.trim();
            if !v.is_empty() {
                config.logging.file = expand_tilde(v);
            }
        }
    }

    // Repeated sections, kept in file order
    let mut layers = Vec::new();
    let mut overlays = Vec::new();
    let mut base_layers = Vec::new();
    let mut jobs = Vec::new();

    for (name, section) in ini.iter() {
        let Some(name) = name else { continue };
        if let Some(id) = name.strip_prefix(LAYER_PREFIX) {
            layers.push(parse_layer(id, name, section)?);
        } else if let Some(id) = name.strip_prefix(OVERLAY_PREFIX) {
            overlays.push(parse_overlay(id, name, section)?);
        } else if let Some(id) = name.strip_prefix(BASEMAP_PREFIX) {
            base_layers.push(parse_base_layer(id, name, section)?);
        } else if let Some(layer) = name.strip_prefix(PROCESS_JOB_PREFIX) {
            jobs.push(parse_job(layer, name, section)?);
        }
    }

    if !layers.is_empty() {
        config.layers = layers;
    }
    if !overlays.is_empty() {
        config.overlays = overlays;
    }
    if !base_layers.is_empty() {
        config.base_layers = base_layers;
    }
    if !jobs.is_empty() {
        config.process.jobs = jobs;
    }

    Ok(config)
}

fn parse_layer(id: &str, section_name: &str, section: &Properties) -> Result<LayerConfig, ConfigFileError> {
    let url = required(section, section_name, "url")?;
    let mut layer = LayerConfig::new(id, url);

    if let Some(v) = section.get("name") {
        layer.name = v.trim().to_string();
    }
    if let Some(v) = section.get("visible") {
        layer.visible = parse_bool(v, section_name, "visible")?;
    }
    if let Some(v) = section.get("attribution") {
        layer.attribution = v.trim().to_string();
    }
    layer.style = parse_style(section_name, section)?;

    Ok(layer)
}

fn parse_style(section_name: &str, section: &Properties) -> Result<PathStyle, ConfigFileError> {
    let mut style = PathStyle::default();
    let mut fill_color_set = false;

    if let Some(v) = section.get("color") {
        style.color = v.trim().to_string();
    }
    if let Some(v) = section.get("weight") {
        style.weight = parse_number(v, section_name, "weight", "must be a number (pixels)")?;
    }
    if let Some(v) = section.get("opacity") {
        style.opacity = parse_opacity(v, section_name, "opacity")?;
    }
    if let Some(v) = section.get("fill_color") {
        style.fill_color = v.trim().to_string();
        fill_color_set = true;
    }
    if let Some(v) = section.get("fill_opacity") {
        style.fill_opacity = parse_opacity(v, section_name, "fill_opacity")?;
    }

    // Fill follows the outline color unless set explicitly
    if !fill_color_set {
        style.fill_color = style.color.clone();
    }

    Ok(style)
}

fn parse_overlay(id: &str, section_name: &str, section: &Properties) -> Result<OverlayConfig, ConfigFileError> {
    let url = required(section, section_name, "url")?;
    let overlay_type = section
        .get("type")
        .map(|v| v.trim().to_lowercase())
        .unwrap_or_else(|| OVERLAY_TYPE_MBTILES.to_string());

    let opacity = match section.get("opacity") {
        Some(v) => parse_opacity(v, section_name, "opacity")?,
        None => 1.0,
    };

    Ok(OverlayConfig {
        id: id.to_string(),
        name: section
            .get("name")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| id.to_string()),
        overlay_type,
        url,
        attribution: section
            .get("attribution")
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
        opacity,
    })
}

fn parse_base_layer(
    id: &str,
    section_name: &str,
    section: &Properties,
) -> Result<BaseLayerConfig, ConfigFileError> {
    let url = required(section, section_name, "url")?;
    Ok(BaseLayerConfig {
        id: id.to_string(),
        name: section
            .get("name")
            .map(|v| v.trim().to_string())
            .unwrap_or_else(|| id.to_string()),
        url,
        attribution: section
            .get("attribution")
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
    })
}

fn parse_job(layer: &str, section_name: &str, section: &Properties) -> Result<ProcessJob, ConfigFileError> {
    let source = required(section, section_name, "source")?;
    Ok(ProcessJob {
        layer: layer.to_string(),
        source,
        output: section
            .get("output")
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .unwrap_or_else(|| format!("{}.geojson", layer)),
        description: section
            .get("description")
            .map(|v| v.trim().to_string())
            .unwrap_or_default(),
    })
}

fn required(section: &Properties, section_name: &str, key: &str) -> Result<String, ConfigFileError> {
    match section.get(key).map(str::trim) {
        Some(v) if !v.is_empty() => Ok(v.to_string()),
        other => Err(invalid(
            section_name,
            key,
            other.unwrap_or(""),
            "is required",
        )),
    }
}

fn parse_zoom(value: &str, key: &str) -> Result<u8, ConfigFileError> {
    let reason = format!("must be an integer between 0 and {}", MAX_ZOOM);
    let zoom: u8 = parse_number(value, "map", key, &reason)?;
    if zoom > MAX_ZOOM {
        return Err(invalid("map", key, value, &reason));
    }
    Ok(zoom)
}

fn parse_number<T: FromStr>(
    value: &str,
    section: &str,
    key: &str,
    reason: &str,
) -> Result<T, ConfigFileError> {
    value
        .trim()
        .parse()
        .map_err(|_| invalid(section, key, value, reason))
}

fn parse_opacity(value: &str, section: &str, key: &str) -> Result<f64, ConfigFileError> {
    let reason = "must be a number between 0.0 and 1.0";
    let opacity: f64 = parse_number(value, section, key, reason)?;
    if !(0.0..=1.0).contains(&opacity) {
        return Err(invalid(section, key, value, reason));
    }
    Ok(opacity)
}

pub(super) fn parse_bool_str(value: &str) -> Option<bool> {
    match value.trim().to_lowercase().as_str() {
        "true" | "yes" | "1" | "on" => Some(true),
        "false" | "no" | "0" | "off" => Some(false),
        _ => None,
    }
}

fn parse_bool(value: &str, section: &str, key: &str) -> Result<bool, ConfigFileError> {
    parse_bool_str(value).ok_or_else(|| invalid(section, key, value, "must be true or false"))
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigFileError {
    ConfigFileError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

pub(super) fn optional_string(value: &str) -> Option<String> {
    let v = value.trim();
    if v.is_empty() {
        None
    } else {
        Some(v.to_string())
    }
}

/// Expand a leading `~` to the user's home directory.
pub(super) fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    } else if path == "~" {
        if let Some(home) = dirs::home_dir() {
            return home;
        }
    }
    PathBuf::from(path)
}

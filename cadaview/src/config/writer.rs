//! INI serialization logic for converting `ConfigFile` → INI string.
//!
//! This module contains the `to_config_string()` function that produces
//! the commented INI representation written to `config.ini`.

use std::fmt::Write;
use std::path::Path;

use super::settings::{BaseLayerConfig, ConfigFile, LayerConfig, OverlayConfig, ProcessJob};

/// Convert a `ConfigFile` to a commented INI string for saving.
pub(super) fn to_config_string(config: &ConfigFile) -> String {
    let base_url = config.loader.base_url.as_deref().unwrap_or("");

    let mut out = format!(
        r#"[map]
; Initial view center in degrees (WGS84)
center_lat = {}
center_lon = {}
; Initial zoom level, replaced by the extent of the first loaded layer
zoom = {}
; Zoom bounds of the map view (0-30)
min_zoom = {}
max_zoom = {}

[loader]
; Append a changing query parameter to every layer request so documents
; are never served stale by intermediate caches
cache_buster = {}
; Timeout in seconds for HTTP requests (default: 30)
timeout = {}
; Prefix for relative layer URLs. If empty, relative URLs are read from
; the local filesystem
base_url = {}

[popup]
; Maximum popup width in pixels
max_width = {}
; CSS class applied to the popup container
class_name = {}
; Number formatting of numeric attributes: fr, en, de
locale = {}

[search]
; Attribute holding the lot identifier
identifier_attribute = {}

[process]
; Directory holding the raw exports
raw_dir = {}
; Directory receiving the processed layers
processed_dir = {}
; Directory receiving timestamped backups of replaced outputs
backup_dir = {}
; Simplification tolerance in degrees (0 disables simplification)
simplify_tolerance = {}
; Decimal places kept on coordinates
precision = {}
; Number of backups kept per output file
keep_backups = {}
; Comma separated attribute names kept on output. If empty, all are kept
attributes_to_keep = {}

[logging]
; Log file path
file = {}
"#,
        config.map.center_lat,
        config.map.center_lon,
        config.map.zoom,
        config.map.min_zoom,
        config.map.max_zoom,
        config.loader.cache_buster,
        config.loader.timeout,
        base_url,
        config.popup.max_width,
        config.popup.class_name,
        config.popup.locale,
        config.search.identifier_attribute,
        path_to_string(&config.process.raw_dir),
        path_to_string(&config.process.processed_dir),
        path_to_string(&config.process.backup_dir),
        config.process.simplify_tolerance,
        config.process.precision,
        config.process.keep_backups,
        config.process.attributes_to_keep.join(", "),
        path_to_string(&config.logging.file),
    );

    if !config.base_layers.is_empty() {
        out.push_str("\n; Base imagery. URL templates use {s}, {z}, {x} and {y}\n");
    }
    for base in &config.base_layers {
        write_base_layer(&mut out, base);
    }

    if !config.overlays.is_empty() {
        out.push_str("\n; Raster overlays. Only type = mbtiles is served\n");
    }
    for overlay in &config.overlays {
        write_overlay(&mut out, overlay);
    }

    if !config.layers.is_empty() {
        out.push_str("\n; Vector data layers, loaded concurrently and registered in this order\n");
    }
    for layer in &config.layers {
        write_layer(&mut out, layer);
    }

    if !config.process.jobs.is_empty() {
        out.push_str("\n; Processing jobs: raw source file -> processed output file\n");
    }
    for job in &config.process.jobs {
        write_job(&mut out, job);
    }

    out
}

fn write_base_layer(out: &mut String, base: &BaseLayerConfig) {
    let _ = write!(
        out,
        "\n[basemap.{}]\nname = {}\nurl = {}\nattribution = {}\n",
        base.id, base.name, base.url, base.attribution
    );
}

fn write_overlay(out: &mut String, overlay: &OverlayConfig) {
    let _ = write!(
        out,
        "\n[overlay.{}]\ntype = {}\nname = {}\nurl = {}\nattribution = {}\nopacity = {}\n",
        overlay.id,
        overlay.overlay_type,
        overlay.name,
        overlay.url,
        overlay.attribution,
        overlay.opacity
    );
}

fn write_layer(out: &mut String, layer: &LayerConfig) {
    let style = &layer.style;
    let _ = write!(
        out,
        "\n[layer.{}]\nname = {}\nurl = {}\nvisible = {}\nattribution = {}\n\
         color = {}\nweight = {}\nopacity = {}\nfill_color = {}\nfill_opacity = {}\n",
        layer.id,
        layer.name,
        layer.url,
        layer.visible,
        layer.attribution,
        style.color,
        style.weight,
        style.opacity,
        style.fill_color,
        style.fill_opacity
    );
}

fn write_job(out: &mut String, job: &ProcessJob) {
    let _ = write!(
        out,
        "\n[process.{}]\nsource = {}\noutput = {}\ndescription = {}\n",
        job.layer, job.source, job.output, job.description
    );
}

/// Convert path to string, collapsing home dir to ~.
fn path_to_string(path: &Path) -> String {
    if let Some(home) = dirs::home_dir() {
        if let Ok(stripped) = path.strip_prefix(&home) {
            return format!("~/{}", stripped.display());
        }
    }
    path.display().to_string()
}

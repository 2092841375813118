//! Layer export.

use std::fmt;
use std::str::FromStr;

use thiserror::Error;

use crate::layer::VectorLayer;

/// Requested export format.
///
/// Only GeoJSON is written today; any other name is accepted and kept so
/// callers can report it, but produces GeoJSON output as well.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum ExportFormat {
    #[default]
    GeoJson,
    Other(String),
}

impl ExportFormat {
    pub fn as_str(&self) -> &str {
        match self {
            ExportFormat::GeoJson => "geojson",
            ExportFormat::Other(name) => name,
        }
    }
}

impl FromStr for ExportFormat {
    type Err = std::convert::Infallible;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let name = s.trim().to_lowercase();
        Ok(match name.as_str() {
            "geojson" | "json" => ExportFormat::GeoJson,
            _ => ExportFormat::Other(name),
        })
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Errors that can occur while serializing an export.
#[derive(Debug, Error)]
pub enum ExportError {
    #[error("Failed to serialize layer '{layer}': {source}")]
    Serialize {
        layer: String,
        #[source]
        source: serde_json::Error,
    },
}

/// A serialized layer ready to be offered for download.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportDocument {
    pub filename: String,
    pub bytes: Vec<u8>,
    pub feature_count: usize,
}

/// File name of a layer export.
pub fn export_filename(layer_id: &str) -> String {
    format!("{}_export.geojson", layer_id)
}

/// Serializes every feature of `layer`, whatever its current style.
pub fn export_layer(layer: &VectorLayer, format: &ExportFormat) -> Result<ExportDocument, ExportError> {
    if let ExportFormat::Other(name) = format {
        tracing::debug!(layer = %layer.id(), format = %name, "Format not supported, writing GeoJSON");
    }

    let collection = layer.to_feature_collection();
    let feature_count = collection.features.len();
    let bytes = serde_json::to_vec_pretty(&collection).map_err(|source| ExportError::Serialize {
        layer: layer.id().to_string(),
        source,
    })?;

    Ok(ExportDocument {
        filename: export_filename(layer.id()),
        bytes,
        feature_count,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::popup::PopupOptions;
    use crate::style::PathStyle;
    use geojson::{FeatureCollection, GeoJson};
    use serde_json::json;

    fn layer() -> VectorLayer {
        let fc: FeatureCollection = serde_json::from_value(json!({
            "type": "FeatureCollection",
            "features": [
                {"type": "Feature", "properties": {"num_lot": "1"}, "geometry": null},
                {"type": "Feature", "properties": {"num_lot": "2"},
                 "geometry": {"type": "Point", "coordinates": [1.5, 2.5]}}
            ]
        }))
        .unwrap();
        VectorLayer::new(LayerConfig::new("lots", "x"), fc, &PopupOptions::default())
    }

    #[test]
    fn test_export_keeps_every_feature() {
        let mut layer = layer();
        layer.set_style(0, PathStyle::default().filter_dimmed());

        let doc = export_layer(&layer, &ExportFormat::GeoJson).unwrap();
        assert_eq!(doc.filename, "lots_export.geojson");
        assert_eq!(doc.feature_count, 2);

        let text = String::from_utf8(doc.bytes).unwrap();
        assert!(text.contains('\n'), "export should be pretty printed");
        match text.parse::<GeoJson>().unwrap() {
            GeoJson::FeatureCollection(fc) => assert_eq!(fc.features.len(), 2),
            other => panic!("expected FeatureCollection, got {:?}", other),
        }
    }

    #[test]
    fn test_other_format_still_writes_geojson() {
        let format: ExportFormat = "shapefile".parse().unwrap();
        assert_eq!(format, ExportFormat::Other("shapefile".to_string()));

        let doc = export_layer(&layer(), &format).unwrap();
        assert_eq!(doc.filename, "lots_export.geojson");
    }

    #[test]
    fn test_format_parsing() {
        assert_eq!("GeoJSON".parse::<ExportFormat>().unwrap(), ExportFormat::GeoJson);
        assert_eq!(ExportFormat::default().to_string(), "geojson");
    }
}

//! Attribute search and filtering over loaded vector layers.
//!
//! These functions work on a [`LayerRegistry`] or a single [`VectorLayer`]
//! and only change feature styles. Viewport and popup side effects are
//! driven by [`crate::session::MapSession`].

use std::collections::BTreeSet;

use thiserror::Error;

use crate::layer::{LayerRegistry, VectorLayer};
use crate::style::PathStyle;

/// Errors returned by a search.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SearchError {
    /// The term was empty after trimming; nothing was searched.
    #[error("Search term is empty")]
    EmptyTerm,

    /// No feature carries a matching identifier.
    #[error("No feature matches '{0}'")]
    NotFound(String),
}

/// Location of a feature inside the registry.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct FeatureRef {
    pub layer_id: String,
    pub index: usize,
}

/// Whether an identifier value matches a search term.
///
/// The value is trimmed; the term is expected trimmed already.
pub fn identifier_matches(value: &str, term: &str) -> bool {
    let value = value.trim();
    value == term || value.contains(term)
}

/// First feature whose `attribute` matches `term`.
///
/// Layers are scanned in registration order, tile layers skipped, features
/// in document order; the scan stops at the first match. Features where
/// the attribute is missing or null are skipped.
pub fn find_feature(registry: &LayerRegistry, attribute: &str, term: &str) -> Option<FeatureRef> {
    registry.vector_layers().find_map(|layer| {
        layer
            .features()
            .iter()
            .position(|feature| {
                feature
                    .attribute_string(attribute)
                    .is_some_and(|value| identifier_matches(&value, term))
            })
            .map(|index| FeatureRef {
                layer_id: layer.id().to_string(),
                index,
            })
    })
}

/// Restores every feature of every vector layer to its base style.
pub fn reset_all(registry: &mut LayerRegistry) {
    for layer in registry.vector_layers_mut() {
        layer.reset_styles();
    }
}

/// Result of applying a filter to one layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FilterOutcome {
    /// Features painted with the match style.
    pub matched: usize,
    /// Features painted with the dimmed style.
    pub dimmed: usize,
}

/// Highlights features whose `attribute` equals `value` and dims the rest.
///
/// An empty `value` clears the filter: every feature returns to its base
/// style at full opacity.
pub fn apply_filter(layer: &mut VectorLayer, attribute: &str, value: &str) -> FilterOutcome {
    let mut outcome = FilterOutcome::default();

    if value.is_empty() {
        layer.restyle_with(|base, _| base.opaque());
        return outcome;
    }

    layer.restyle_with(|base: &PathStyle, feature| {
        if feature.attribute_string(attribute).as_deref() == Some(value) {
            outcome.matched += 1;
            base.filter_match()
        } else {
            outcome.dimmed += 1;
            base.filter_dimmed()
        }
    });
    outcome
}

/// Sorted distinct values of one attribute across a layer.
///
/// Missing and null values are left out.
pub fn attribute_values(layer: &VectorLayer, attribute: &str) -> Vec<String> {
    layer
        .features()
        .iter()
        .filter_map(|feature| feature.attribute_string(attribute))
        .collect::<BTreeSet<_>>()
        .into_iter()
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::layer::LoadedLayer;
    use crate::popup::PopupOptions;
    use crate::style::{FILTER_DIMMED_OPACITY, FILTER_MATCH_OPACITY};
    use serde_json::json;

    fn layer(id: &str, props: Vec<serde_json::Value>) -> VectorLayer {
        let features: Vec<_> = props
            .into_iter()
            .map(|p| json!({"type": "Feature", "properties": p, "geometry": null}))
            .collect();
        let fc = serde_json::from_value(json!({"type": "FeatureCollection", "features": features}))
            .unwrap();
        VectorLayer::new(LayerConfig::new(id, "x"), fc, &PopupOptions::default())
    }

    fn lots() -> VectorLayer {
        layer(
            "lots",
            vec![
                json!({"num_lot": "120", "zone": "A"}),
                json!({"num_lot": "12", "zone": "B"}),
                json!({"num_lot": "5", "zone": "A"}),
            ],
        )
    }

    #[test]
    fn test_first_match_in_feature_order_wins() {
        let mut registry = LayerRegistry::new();
        registry.register(LoadedLayer::Vector(lots()));

        // "120" contains "12" and comes first
        let found = find_feature(&registry, "num_lot", "12").unwrap();
        assert_eq!(found, FeatureRef { layer_id: "lots".to_string(), index: 0 });
    }

    #[test]
    fn test_exact_value_found() {
        let mut registry = LayerRegistry::new();
        registry.register(LoadedLayer::Vector(lots()));
        assert_eq!(find_feature(&registry, "num_lot", "5").unwrap().index, 2);
    }

    #[test]
    fn test_scan_continues_into_later_layers() {
        let mut registry = LayerRegistry::new();
        registry.register(LoadedLayer::Vector(layer("zones", vec![json!({"other": 1})])));
        registry.register(LoadedLayer::Vector(lots()));
        let found = find_feature(&registry, "num_lot", "5").unwrap();
        assert_eq!(found.layer_id, "lots");
    }

    #[test]
    fn test_null_and_missing_identifiers_are_skipped() {
        let mut registry = LayerRegistry::new();
        registry.register(LoadedLayer::Vector(layer(
            "x",
            vec![json!({"num_lot": null}), json!({}), json!({"num_lot": 77})],
        )));
        assert_eq!(find_feature(&registry, "num_lot", "77").unwrap().index, 2);
        assert_eq!(find_feature(&registry, "num_lot", "null"), None);
    }

    #[test]
    fn test_identifier_value_is_trimmed() {
        assert!(identifier_matches("  A12 ", "A12"));
        assert!(!identifier_matches("A1", "A12"));
    }

    #[test]
    fn test_filter_match_and_dim() {
        let mut layer = lots();
        let outcome = apply_filter(&mut layer, "zone", "A");
        assert_eq!(outcome, FilterOutcome { matched: 2, dimmed: 1 });
        assert_eq!(layer.feature(0).unwrap().style().opacity, FILTER_MATCH_OPACITY);
        assert_eq!(layer.feature(1).unwrap().style().opacity, FILTER_DIMMED_OPACITY);
    }

    #[test]
    fn test_empty_filter_restores_full_opacity() {
        let mut layer = lots();
        apply_filter(&mut layer, "zone", "A");
        let outcome = apply_filter(&mut layer, "zone", "");
        assert_eq!(outcome, FilterOutcome::default());
        for feature in layer.features() {
            assert_eq!(feature.style().opacity, 1.0);
            assert_eq!(feature.style().fill_opacity, layer.base_style().fill_opacity);
        }
    }

    #[test]
    fn test_numeric_attribute_filter_uses_string_form() {
        let mut layer = layer("x", vec![json!({"n": 3}), json!({"n": "3"}), json!({"n": 4})]);
        let outcome = apply_filter(&mut layer, "n", "3");
        assert_eq!(outcome.matched, 2);
    }

    #[test]
    fn test_whole_number_float_matches_integer_text() {
        let mut layer = layer("x", vec![json!({"surface": 120.0}), json!({"surface": 95.5})]);
        let outcome = apply_filter(&mut layer, "surface", "120");
        assert_eq!(outcome.matched, 1);
        assert_eq!(attribute_values(&layer, "surface"), vec!["120", "95.5"]);
    }

    #[test]
    fn test_attribute_values_sorted_distinct() {
        assert_eq!(attribute_values(&lots(), "zone"), vec!["A", "B"]);
        assert!(attribute_values(&lots(), "missing").is_empty());
    }

    #[test]
    fn test_reset_all() {
        let mut registry = LayerRegistry::new();
        registry.register(LoadedLayer::Vector(lots()));
        registry
            .vector_mut("lots")
            .unwrap()
            .set_style(1, PathStyle::highlight());
        reset_all(&mut registry);
        let layer = registry.vector("lots").unwrap();
        assert_eq!(layer.feature(1).unwrap().style(), layer.base_style());
    }
}

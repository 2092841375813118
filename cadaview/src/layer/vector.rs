//! Interactive GeoJSON layers.

use geo::BoundingRect;
use geojson::{Feature, FeatureCollection};
use serde_json::{Map, Value};
use tracing::debug;

use crate::config::LayerConfig;
use crate::coord::Bounds;
use crate::popup::{render_popup, PopupOptions};
use crate::style::PathStyle;

/// One feature of a vector layer together with its interactive state.
#[derive(Debug, Clone)]
pub struct FeatureState {
    feature: Feature,
    bounds: Option<Bounds>,
    popup: String,
    style: PathStyle,
    hovered: bool,
}

impl FeatureState {
    fn new(feature: Feature, base: &PathStyle, popup_options: &PopupOptions) -> Self {
        let bounds = feature_bounds(&feature);
        let popup = match &feature.properties {
            Some(properties) => render_popup(properties, popup_options),
            None => render_popup(&Map::new(), popup_options),
        };
        Self {
            feature,
            bounds,
            popup,
            style: base.clone(),
            hovered: false,
        }
    }

    pub fn feature(&self) -> &Feature {
        &self.feature
    }

    /// Attribute value, or `None` when the feature has no such attribute.
    pub fn attribute(&self, name: &str) -> Option<&Value> {
        self.feature.properties.as_ref()?.get(name)
    }

    /// Attribute coerced to a string the way search and filter compare it.
    ///
    /// Strings are taken as-is; other scalars use their JSON text, except
    /// whole-number floats which print without a fractional part (`120.0`
    /// reads as `"120"`). Null and missing attributes yield `None`.
    pub fn attribute_string(&self, name: &str) -> Option<String> {
        match self.attribute(name)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(number_string(n)),
            other => Some(other.to_string()),
        }
    }

    /// Geographic extent; `None` for features without geometry.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Popup HTML bound to this feature.
    pub fn popup(&self) -> &str {
        &self.popup
    }

    /// Style currently painted.
    pub fn style(&self) -> &PathStyle {
        &self.style
    }

    pub fn is_hovered(&self) -> bool {
        self.hovered
    }
}

/// A loaded GeoJSON layer.
///
/// Features keep document order. Every feature carries its popup, its
/// bounds and the style it is currently painted with; the configured base
/// style is what every reset returns to.
#[derive(Debug, Clone)]
pub struct VectorLayer {
    config: LayerConfig,
    features: Vec<FeatureState>,
    bounds: Option<Bounds>,
    foreign_members: Option<Map<String, Value>>,
}

impl VectorLayer {
    pub fn new(
        config: LayerConfig,
        collection: FeatureCollection,
        popup_options: &PopupOptions,
    ) -> Self {
        let features: Vec<FeatureState> = collection
            .features
            .into_iter()
            .map(|feature| FeatureState::new(feature, &config.style, popup_options))
            .collect();

        let bounds = features
            .iter()
            .filter_map(FeatureState::bounds)
            .reduce(|acc, b| acc.union(&b));

        debug!(
            layer = %config.id,
            features = features.len(),
            "Built vector layer"
        );

        Self {
            config,
            features,
            bounds,
            foreign_members: collection.foreign_members,
        }
    }

    pub fn id(&self) -> &str {
        &self.config.id
    }

    pub fn name(&self) -> &str {
        &self.config.name
    }

    pub fn config(&self) -> &LayerConfig {
        &self.config
    }

    pub fn base_style(&self) -> &PathStyle {
        &self.config.style
    }

    pub fn features(&self) -> &[FeatureState] {
        &self.features
    }

    pub fn feature(&self, index: usize) -> Option<&FeatureState> {
        self.features.get(index)
    }

    pub fn len(&self) -> usize {
        self.features.len()
    }

    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Union of all feature extents; `None` when no feature has geometry.
    pub fn bounds(&self) -> Option<Bounds> {
        self.bounds
    }

    /// Applies the hover emphasis. Returns the new style.
    pub fn hover(&mut self, index: usize) -> Option<&PathStyle> {
        let base = self.config.style.hovered();
        let state = self.features.get_mut(index)?;
        state.hovered = true;
        state.style = base;
        Some(&state.style)
    }

    /// Reverts a hovered feature to the configured base style.
    pub fn unhover(&mut self, index: usize) -> Option<&PathStyle> {
        let base = self.config.style.clone();
        let state = self.features.get_mut(index)?;
        state.hovered = false;
        state.style = base;
        Some(&state.style)
    }

    /// Extent the viewport should fit when the feature is clicked.
    pub fn click(&self, index: usize) -> Option<Bounds> {
        self.features.get(index)?.bounds
    }

    pub fn set_style(&mut self, index: usize, style: PathStyle) -> bool {
        match self.features.get_mut(index) {
            Some(state) => {
                state.style = style;
                true
            }
            None => false,
        }
    }

    /// Repaints every feature with `style_for(base, feature)`.
    pub fn restyle_with<F>(&mut self, mut style_for: F)
    where
        F: FnMut(&PathStyle, &FeatureState) -> PathStyle,
    {
        let base = &self.config.style;
        for state in &mut self.features {
            state.style = style_for(base, state);
            state.hovered = false;
        }
    }

    /// Restores every feature to the configured base style.
    pub fn reset_styles(&mut self) {
        self.restyle_with(|base, _| base.clone());
    }

    /// Every feature, regardless of visual state, as a collection.
    pub fn to_feature_collection(&self) -> FeatureCollection {
        FeatureCollection {
            bbox: None,
            features: self.features.iter().map(|s| s.feature.clone()).collect(),
            foreign_members: self.foreign_members.clone(),
        }
    }
}

/// Bounding box of a feature's geometry.
fn feature_bounds(feature: &Feature) -> Option<Bounds> {
    let geometry = feature.geometry.as_ref()?;
    let geometry: geo_types::Geometry<f64> = geometry.value.clone().try_into().ok()?;
    let rect = geometry.bounding_rect()?;
    Some(Bounds::new(
        rect.min().x,
        rect.min().y,
        rect.max().x,
        rect.max().y,
    ))
}

/// Largest magnitude below which every whole `f64` is exact.
const EXACT_INTEGER_LIMIT: f64 = 9_007_199_254_740_992.0;

fn number_string(n: &serde_json::Number) -> String {
    if n.is_f64() {
        if let Some(f) = n.as_f64() {
            if f.is_finite() && f.fract() == 0.0 && f.abs() < EXACT_INTEGER_LIMIT {
                return (f as i64).to_string();
            }
        }
    }
    n.to_string()
}

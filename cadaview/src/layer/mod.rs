//! Loaded map layers and the registry that owns them.
//!
//! A session holds two kinds of layers:
//!
//! - [`VectorLayer`]: GeoJSON features with popups, hover and click state
//! - [`TileLayer`]: raster overlays served from a [`crate::archive::TileSource`]
//!
//! Both live in one [`LayerRegistry`], keyed by configured layer id and kept
//! in registration order. Layers are only ever added.

mod tile;
mod vector;

pub use tile::{TileLayer, TileResponse};
pub use vector::{FeatureState, VectorLayer};

use indexmap::map::Entry;
use indexmap::IndexMap;
use tracing::warn;

use crate::coord::Bounds;

/// A layer that finished loading.
#[derive(Debug, Clone)]
pub enum LoadedLayer {
    Vector(VectorLayer),
    Tile(TileLayer),
}

impl LoadedLayer {
    pub fn id(&self) -> &str {
        match self {
            LoadedLayer::Vector(layer) => layer.id(),
            LoadedLayer::Tile(layer) => layer.id(),
        }
    }

    pub fn name(&self) -> &str {
        match self {
            LoadedLayer::Vector(layer) => layer.name(),
            LoadedLayer::Tile(layer) => layer.name(),
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            LoadedLayer::Vector(_) => "vector",
            LoadedLayer::Tile(_) => "tile",
        }
    }

    pub fn as_vector(&self) -> Option<&VectorLayer> {
        match self {
            LoadedLayer::Vector(layer) => Some(layer),
            LoadedLayer::Tile(_) => None,
        }
    }

    pub fn as_vector_mut(&mut self) -> Option<&mut VectorLayer> {
        match self {
            LoadedLayer::Vector(layer) => Some(layer),
            LoadedLayer::Tile(_) => None,
        }
    }

    pub fn as_tile(&self) -> Option<&TileLayer> {
        match self {
            LoadedLayer::Tile(layer) => Some(layer),
            LoadedLayer::Vector(_) => None,
        }
    }

    /// Extent of the layer's data. Tile layers report none.
    pub fn bounds(&self) -> Option<Bounds> {
        self.as_vector().and_then(VectorLayer::bounds)
    }
}

/// Layers of one session, in registration order.
#[derive(Debug, Default)]
pub struct LayerRegistry {
    layers: IndexMap<String, LoadedLayer>,
}

impl LayerRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Appends a layer.
    ///
    /// Returns `false` and keeps the existing entry when the id is already
    /// registered.
    pub fn register(&mut self, layer: LoadedLayer) -> bool {
        match self.layers.entry(layer.id().to_string()) {
            Entry::Occupied(existing) => {
                warn!(
                    layer = %existing.key(),
                    "Layer id already registered, ignoring duplicate"
                );
                false
            }
            Entry::Vacant(slot) => {
                slot.insert(layer);
                true
            }
        }
    }

    pub fn get(&self, id: &str) -> Option<&LoadedLayer> {
        self.layers.get(id)
    }

    pub fn get_mut(&mut self, id: &str) -> Option<&mut LoadedLayer> {
        self.layers.get_mut(id)
    }

    pub fn vector(&self, id: &str) -> Option<&VectorLayer> {
        self.get(id)?.as_vector()
    }

    pub fn vector_mut(&mut self, id: &str) -> Option<&mut VectorLayer> {
        self.get_mut(id)?.as_vector_mut()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.layers.contains_key(id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &LoadedLayer> {
        self.layers.values()
    }

    /// Vector layers in registration order.
    pub fn vector_layers(&self) -> impl Iterator<Item = &VectorLayer> {
        self.layers.values().filter_map(LoadedLayer::as_vector)
    }

    pub fn vector_layers_mut(&mut self) -> impl Iterator<Item = &mut VectorLayer> {
        self.layers.values_mut().filter_map(LoadedLayer::as_vector_mut)
    }

    pub fn ids(&self) -> impl Iterator<Item = &str> {
        self.layers.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.layers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.layers.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LayerConfig;
    use crate::popup::PopupOptions;
    use geojson::FeatureCollection;

    fn empty_layer(id: &str) -> LoadedLayer {
        let fc = FeatureCollection {
            bbox: None,
            features: vec![],
            foreign_members: None,
        };
        LoadedLayer::Vector(VectorLayer::new(
            LayerConfig::new(id, format!("{}.geojson", id)),
            fc,
            &PopupOptions::default(),
        ))
    }

    #[test]
    fn test_registration_order_is_kept() {
        let mut registry = LayerRegistry::new();
        for id in ["zones", "lots", "ilots"] {
            assert!(registry.register(empty_layer(id)));
        }
        assert_eq!(registry.ids().collect::<Vec<_>>(), vec!["zones", "lots", "ilots"]);
    }

    #[test]
    fn test_duplicate_id_is_rejected() {
        let mut registry = LayerRegistry::new();
        assert!(registry.register(empty_layer("lots")));
        assert!(!registry.register(empty_layer("lots")));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_lookup_by_kind() {
        let mut registry = LayerRegistry::new();
        registry.register(empty_layer("lots"));
        assert!(registry.vector("lots").is_some());
        assert!(registry.vector("unknown").is_none());
        assert_eq!(registry.get("lots").map(LoadedLayer::kind), Some("vector"));
    }
}

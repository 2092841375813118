//! Map session orchestration.
//!
//! A [`MapSession`] owns the configuration, the registry of loaded layers
//! and the renderer-facing [`MapView`]. It decides everything the renderer
//! is told: which layers to attach, where to fit the viewport, which popup
//! to open and which failures to report.
//!
//! Sessions hold no global state; several can run side by side.

use std::collections::HashSet;
use std::sync::Arc;

use futures::future::join_all;
use tracing::{debug, error, info, warn};

use crate::archive::MbTilesArchive;
use crate::config::{BaseLayerConfig, ConfigFile, MapSettings, OverlayConfig};
use crate::coord::Bounds;
use crate::export::{export_layer, ExportDocument, ExportFormat};
use crate::layer::{LayerRegistry, LoadedLayer, TileLayer, TileResponse};
use crate::loader::{DocumentClient, VectorLoader};
use crate::search::{self, FeatureRef, FilterOutcome, SearchError};
use crate::style::PathStyle;

/// Padding in pixels around a feature located by search.
pub const SEARCH_FIT_PADDING_PX: u32 = 50;

/// Padding in pixels for clicked features and the initial extent.
pub const DEFAULT_FIT_PADDING_PX: u32 = 0;

/// Prompt shown when a search is attempted with an empty term.
pub const EMPTY_TERM_PROMPT: &str = "Please enter a lot number to search for.";

/// The renderer a session drives.
///
/// Implementations draw; they make no decisions. Every method is a
/// one-way instruction.
pub trait MapView {
    /// Initial center and zoom bounds.
    fn set_map_options(&mut self, options: &MapSettings);

    fn add_base_layer(&mut self, layer: &BaseLayerConfig);

    /// Show a layer. Called at most once per layer until it is detached.
    fn attach_layer(&mut self, layer: &LoadedLayer);

    fn detach_layer(&mut self, layer_id: &str);

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32);

    fn open_popup(&mut self, layer_id: &str, index: usize, html: &str);

    /// A blocking user-facing message.
    fn notify(&mut self, message: &str);

    fn offer_download(&mut self, filename: &str, bytes: &[u8]);
}

/// Outcome of [`MapSession::start`].
#[derive(Debug, Clone, Default, PartialEq)]
pub struct StartReport {
    /// Ids of layers registered, in registration order.
    pub loaded: Vec<String>,
    /// Ids of layers and overlays that failed, in configuration order.
    pub failed: Vec<String>,
    /// Extent the viewport was fitted to, if any layer provided one.
    pub initial_extent: Option<Bounds>,
}

/// One map session.
pub struct MapSession<V: MapView> {
    config: ConfigFile,
    loader: VectorLoader,
    registry: LayerRegistry,
    attached: HashSet<String>,
    view: V,
}

impl<V: MapView> MapSession<V> {
    pub fn new(config: ConfigFile, view: V) -> Self {
        let loader = VectorLoader::new(config.loader.clone(), config.popup.options());
        Self {
            config,
            loader,
            registry: LayerRegistry::new(),
            attached: HashSet::new(),
            view,
        }
    }

    pub fn config(&self) -> &ConfigFile {
        &self.config
    }

    pub fn registry(&self) -> &LayerRegistry {
        &self.registry
    }

    pub fn view(&self) -> &V {
        &self.view
    }

    pub fn view_mut(&mut self) -> &mut V {
        &mut self.view
    }

    pub fn into_view(self) -> V {
        self.view
    }

    pub fn is_attached(&self, layer_id: &str) -> bool {
        self.attached.contains(layer_id)
    }

    /// Sets up the map and loads every configured layer.
    ///
    /// Overlays are opened first, then all vector layers are fetched
    /// concurrently. Successful layers are registered in configuration
    /// order; each failure is reported once through [`MapView::notify`].
    /// The viewport is then fitted to the first configured layer that
    /// loaded with a non-empty extent.
    pub async fn start<C: DocumentClient>(&mut self, client: &C) -> StartReport {
        info!(
            overlays = self.config.overlays.len(),
            layers = self.config.layers.len(),
            "Starting map session"
        );
        let mut report = StartReport::default();

        self.view.set_map_options(&self.config.map);
        for base in &self.config.base_layers {
            self.view.add_base_layer(base);
        }

        self.open_overlays(client, &mut report).await;
        self.load_vector_layers(client, &mut report).await;

        report.initial_extent = self.initial_extent();
        if let Some(bounds) = report.initial_extent {
            self.view.fit_bounds(bounds, DEFAULT_FIT_PADDING_PX);
        }

        info!(
            loaded = report.loaded.len(),
            failed = report.failed.len(),
            "Map session ready"
        );
        report
    }

    async fn open_overlays<C: DocumentClient>(&mut self, client: &C, report: &mut StartReport) {
        let overlays: Vec<OverlayConfig> = self
            .config
            .overlays
            .iter()
            .filter(|overlay| {
                if overlay.is_mbtiles() {
                    true
                } else {
                    debug!(
                        overlay = %overlay.id,
                        overlay_type = %overlay.overlay_type,
                        "Ignoring unsupported overlay type"
                    );
                    false
                }
            })
            .cloned()
            .collect();

        let loader = &self.loader;
        let fetches = overlays.iter().map(|overlay| {
            let url = loader.resolve_url(&overlay.url);
            async move { client.get(&url).await }
        });
        let bodies = join_all(fetches).await;

        for (overlay, body) in overlays.into_iter().zip(bodies) {
            let opened = body
                .map_err(|e| e.to_string())
                .and_then(|bytes| MbTilesArchive::open_bytes(&bytes).map_err(|e| e.to_string()));

            match opened {
                Ok(archive) => {
                    info!(
                        overlay = %overlay.id,
                        zoom_range = ?archive.zoom_range(),
                        "Tile overlay opened"
                    );
                    let id = overlay.id.clone();
                    let layer = LoadedLayer::Tile(TileLayer::new(overlay, Arc::new(archive)));
                    if self.registry.register(layer) {
                        self.attach(&id);
                        report.loaded.push(id);
                    }
                }
                Err(reason) => {
                    error!(overlay = %overlay.id, error = %reason, "Failed to open tile overlay");
                    self.view.notify(&format!(
                        "Failed to load overlay '{}': {}",
                        overlay.name, reason
                    ));
                    report.failed.push(overlay.id);
                }
            }
        }
    }

    async fn load_vector_layers<C: DocumentClient>(&mut self, client: &C, report: &mut StartReport) {
        let configs = self.config.layers.clone();

        let loader = &self.loader;
        let results = join_all(configs.iter().map(|config| loader.load(client, config))).await;

        for (config, result) in configs.iter().zip(results) {
            match result {
                Ok(layer) => {
                    if self.registry.register(LoadedLayer::Vector(layer)) {
                        if config.visible {
                            self.attach(&config.id);
                        }
                        report.loaded.push(config.id.clone());
                    }
                }
                Err(e) => {
                    error!(layer = %config.id, error = %e, "Failed to load vector layer");
                    self.view
                        .notify(&format!("Failed to load layer '{}': {}", config.name, e));
                    report.failed.push(config.id.clone());
                }
            }
        }
    }

    /// Extent of the first configured layer that loaded with features.
    fn initial_extent(&self) -> Option<Bounds> {
        self.config
            .layers
            .iter()
            .find_map(|config| self.registry.get(&config.id)?.bounds())
    }

    fn attach(&mut self, layer_id: &str) {
        if let Some(layer) = self.registry.get(layer_id) {
            if self.attached.insert(layer_id.to_string()) {
                self.view.attach_layer(layer);
            }
        }
    }

    /// Shows or hides a registered layer.
    ///
    /// Returns `false` when no layer with this id is registered.
    pub fn set_layer_visible(&mut self, layer_id: &str, visible: bool) -> bool {
        if !self.registry.contains(layer_id) {
            return false;
        }
        if visible {
            self.attach(layer_id);
        } else if self.attached.remove(layer_id) {
            self.view.detach_layer(layer_id);
        }
        true
    }

    /// Pointer entered a feature.
    pub fn hover_feature(&mut self, layer_id: &str, index: usize) -> Option<PathStyle> {
        self.registry.vector_mut(layer_id)?.hover(index).cloned()
    }

    /// Pointer left a feature.
    pub fn unhover_feature(&mut self, layer_id: &str, index: usize) -> Option<PathStyle> {
        self.registry.vector_mut(layer_id)?.unhover(index).cloned()
    }

    /// Feature clicked: fit the viewport to it and open its popup.
    pub fn click_feature(&mut self, layer_id: &str, index: usize) -> bool {
        let Some(feature) = self
            .registry
            .vector(layer_id)
            .and_then(|layer| layer.feature(index))
        else {
            return false;
        };

        if let Some(bounds) = feature.bounds() {
            self.view.fit_bounds(bounds, DEFAULT_FIT_PADDING_PX);
        }
        self.view.open_popup(layer_id, index, feature.popup());
        true
    }

    /// Serves one tile of a registered overlay.
    pub fn tile(&self, layer_id: &str, zoom: u8, column: u32, row: u32) -> TileResponse {
        match self.registry.get(layer_id).and_then(LoadedLayer::as_tile) {
            Some(layer) => layer.tile_at(zoom, column, row),
            None => TileResponse::Unavailable,
        }
    }

    /// Locates a feature by identifier and brings it into view.
    ///
    /// Every feature is reset to its base style first; the match is then
    /// highlighted, the viewport fitted to it and its popup opened.
    pub fn search(&mut self, term: &str) -> Result<FeatureRef, SearchError> {
        let term = term.trim();
        if term.is_empty() {
            self.view.notify(EMPTY_TERM_PROMPT);
            return Err(SearchError::EmptyTerm);
        }

        let attribute = self.config.search.identifier_attribute.clone();
        let found = search::find_feature(&self.registry, &attribute, term);
        search::reset_all(&mut self.registry);

        let Some(found) = found else {
            info!(term = term, "Search found nothing");
            self.view.notify(&format!("No lot found matching '{}'.", term));
            return Err(SearchError::NotFound(term.to_string()));
        };

        let Some(layer) = self.registry.vector_mut(&found.layer_id) else {
            return Err(SearchError::NotFound(term.to_string()));
        };
        layer.set_style(found.index, PathStyle::highlight());

        if let Some(feature) = layer.feature(found.index) {
            let popup = feature.popup().to_string();
            if let Some(bounds) = feature.bounds() {
                self.view.fit_bounds(bounds, SEARCH_FIT_PADDING_PX);
            }
            self.view.open_popup(&found.layer_id, found.index, &popup);
        }

        info!(term = term, layer = %found.layer_id, index = found.index, "Search matched");
        Ok(found)
    }

    /// Highlights the features of one layer whose attribute equals `value`.
    ///
    /// An empty value clears the filter. Unknown ids and tile layers are
    /// ignored and return `None`.
    pub fn filter(&mut self, layer_id: &str, attribute: &str, value: &str) -> Option<FilterOutcome> {
        let layer = self.registry.vector_mut(layer_id)?;
        let outcome = search::apply_filter(layer, attribute, value);
        debug!(
            layer = layer_id,
            attribute = attribute,
            matched = outcome.matched,
            dimmed = outcome.dimmed,
            "Filter applied"
        );
        Some(outcome)
    }

    /// Restores every vector feature to its base style.
    pub fn reset_styles(&mut self) {
        search::reset_all(&mut self.registry);
    }

    /// Distinct values of an attribute, for building a filter choice list.
    pub fn attribute_values(&self, layer_id: &str, attribute: &str) -> Vec<String> {
        self.registry
            .vector(layer_id)
            .map(|layer| search::attribute_values(layer, attribute))
            .unwrap_or_default()
    }

    /// Serializes a layer and offers it for download.
    ///
    /// Unknown ids and tile layers are ignored and return `None`.
    pub fn export(&mut self, layer_id: &str, format: &ExportFormat) -> Option<ExportDocument> {
        let layer = self.registry.vector(layer_id)?;
        match export_layer(layer, format) {
            Ok(document) => {
                info!(
                    layer = layer_id,
                    features = document.feature_count,
                    filename = %document.filename,
                    "Layer exported"
                );
                self.view.offer_download(&document.filename, &document.bytes);
                Some(document)
            }
            Err(e) => {
                warn!(layer = layer_id, error = %e, "Export failed");
                self.view.notify(&format!("Export of '{}' failed: {}", layer_id, e));
                None
            }
        }
    }
}

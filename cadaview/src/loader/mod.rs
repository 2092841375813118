//! Vector layer loading.
//!
//! Fetches a layer's GeoJSON document through a [`DocumentClient`], parses
//! it and binds popups and interaction state to every feature. A failed
//! load is reported as a [`LoadError`] naming the layer; it never affects
//! other layers.

mod cache_buster;
mod client;

pub use cache_buster::{append_token, CacheBuster, CACHE_BUSTER_PARAM};
pub use client::{
    is_remote, AnyDocumentClient, DocumentClient, FetchError, FileDocumentClient,
    HttpDocumentClient,
};

use geojson::GeoJson;
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{LayerConfig, LoaderSettings};
use crate::layer::VectorLayer;
use crate::popup::PopupOptions;

/// Errors that can occur while loading a vector layer.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum LoadError {
    /// The server answered with a non-success status.
    #[error("Layer '{layer}': HTTP {status} from {url}")]
    Status {
        layer: String,
        url: String,
        status: u16,
    },

    /// The document could not be fetched.
    #[error("Layer '{layer}': {reason}")]
    Fetch { layer: String, reason: String },

    /// The document is not a GeoJSON FeatureCollection.
    #[error("Layer '{layer}': invalid GeoJSON: {reason}")]
    Parse { layer: String, reason: String },
}

impl LoadError {
    /// Id of the layer that failed.
    pub fn layer(&self) -> &str {
        match self {
            LoadError::Status { layer, .. }
            | LoadError::Fetch { layer, .. }
            | LoadError::Parse { layer, .. } => layer,
        }
    }

    fn from_fetch(layer: &str, error: FetchError) -> Self {
        match error {
            FetchError::Status { url, status } => LoadError::Status {
                layer: layer.to_string(),
                url,
                status,
            },
            other => LoadError::Fetch {
                layer: layer.to_string(),
                reason: other.to_string(),
            },
        }
    }
}

/// Fetches and parses vector layers.
#[derive(Debug)]
pub struct VectorLoader {
    settings: LoaderSettings,
    popup: PopupOptions,
    cache_buster: CacheBuster,
}

impl VectorLoader {
    pub fn new(settings: LoaderSettings, popup: PopupOptions) -> Self {
        Self {
            settings,
            popup,
            cache_buster: CacheBuster::new(),
        }
    }

    pub fn settings(&self) -> &LoaderSettings {
        &self.settings
    }

    /// URL a layer is fetched from, before cache busting.
    ///
    /// Relative URLs are prefixed with the configured base URL, if any.
    pub fn resolve_url(&self, url: &str) -> String {
        match &self.settings.base_url {
            Some(base) if !is_remote(url) && !url.starts_with('/') && !url.starts_with("file://") => {
                format!(
                    "{}/{}",
                    base.trim_end_matches('/'),
                    url.trim_start_matches("./")
                )
            }
            _ => url.to_string(),
        }
    }

    /// URL of the next request for `url`, with a fresh token when cache
    /// busting is enabled.
    pub fn request_url(&self, url: &str) -> String {
        let resolved = self.resolve_url(url);
        if self.settings.cache_buster {
            self.cache_buster.apply(&resolved)
        } else {
            resolved
        }
    }

    /// Fetches, parses and builds one layer.
    pub async fn load<C: DocumentClient>(
        &self,
        client: &C,
        config: &LayerConfig,
    ) -> Result<VectorLayer, LoadError> {
        let url = self.request_url(&config.url);
        debug!(layer = %config.id, url = %url, "Loading vector layer");

        let body = client
            .get(&url)
            .await
            .map_err(|e| LoadError::from_fetch(&config.id, e))?;

        let layer = self.parse(config, &body)?;
        info!(
            layer = %config.id,
            features = layer.len(),
            "Vector layer loaded"
        );
        Ok(layer)
    }

    /// Builds a layer from an already fetched document.
    pub fn parse(&self, config: &LayerConfig, body: &[u8]) -> Result<VectorLayer, LoadError> {
        let parse_error = |reason: String| LoadError::Parse {
            layer: config.id.clone(),
            reason,
        };

        let geojson: GeoJson =
            serde_json::from_slice(body).map_err(|e| parse_error(e.to_string()))?;

        match geojson {
            GeoJson::FeatureCollection(collection) => {
                Ok(VectorLayer::new(config.clone(), collection, &self.popup))
            }
            GeoJson::Feature(_) => Err(parse_error(
                "expected a FeatureCollection, found a Feature".to_string(),
            )),
            GeoJson::Geometry(_) => Err(parse_error(
                "expected a FeatureCollection, found a Geometry".to_string(),
            )),
        }
    }
}

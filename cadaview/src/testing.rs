//! Test doubles for the session's external collaborators.
//!
//! [`MockDocumentClient`] serves in-memory documents and records every URL
//! requested. [`RecordingView`] records every instruction a session sends
//! to the renderer.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;

use crate::config::{BaseLayerConfig, MapSettings};
use crate::coord::Bounds;
use crate::layer::LoadedLayer;
use crate::loader::{DocumentClient, FetchError};
use crate::session::MapView;

/// In-memory [`DocumentClient`].
///
/// Documents are keyed by URL without its query string, so cache-busting
/// tokens do not affect lookups. Unknown URLs answer HTTP 404.
#[derive(Clone, Default)]
pub struct MockDocumentClient {
    responses: HashMap<String, Result<Vec<u8>, FetchError>>,
    requests: Arc<Mutex<Vec<String>>>,
}

impl MockDocumentClient {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_document(self, url: &str, body: impl AsRef<[u8]>) -> Self {
        self.with_response(url, Ok(body.as_ref().to_vec()))
    }

    pub fn with_status(self, url: &str, status: u16) -> Self {
        let error = FetchError::Status {
            url: url.to_string(),
            status,
        };
        self.with_response(url, Err(error))
    }

    pub fn with_response(mut self, url: &str, response: Result<Vec<u8>, FetchError>) -> Self {
        self.responses.insert(url.to_string(), response);
        self
    }

    /// Every URL requested so far, in request order.
    pub fn requests(&self) -> Vec<String> {
        self.requests.lock().clone()
    }
}

impl DocumentClient for MockDocumentClient {
    async fn get(&self, url: &str) -> Result<Vec<u8>, FetchError> {
        self.requests.lock().push(url.to_string());
        let key = url.split('?').next().unwrap_or(url);
        match self.responses.get(key) {
            Some(response) => response.clone(),
            None => Err(FetchError::Status {
                url: url.to_string(),
                status: 404,
            }),
        }
    }
}

/// One instruction received by a [`RecordingView`].
#[derive(Debug, Clone, PartialEq)]
pub enum ViewEvent {
    MapOptions(MapSettings),
    BaseLayer(String),
    Attach(String),
    Detach(String),
    FitBounds { bounds: Bounds, padding: u32 },
    Popup { layer_id: String, index: usize, html: String },
    Notify(String),
    Download { filename: String, bytes: Vec<u8> },
}

/// A [`MapView`] that records everything it is told.
#[derive(Debug, Clone, Default)]
pub struct RecordingView {
    pub events: Vec<ViewEvent>,
}

impl RecordingView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn notifications(&self) -> Vec<&str> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Notify(message) => Some(message.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Ids of layers currently attached.
    pub fn attached(&self) -> Vec<&str> {
        let mut attached: Vec<&str> = Vec::new();
        for event in &self.events {
            match event {
                ViewEvent::Attach(id) => attached.push(id.as_str()),
                ViewEvent::Detach(id) => attached.retain(|a| *a != id.as_str()),
                _ => {}
            }
        }
        attached
    }

    pub fn fits(&self) -> Vec<(Bounds, u32)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::FitBounds { bounds, padding } => Some((*bounds, *padding)),
                _ => None,
            })
            .collect()
    }

    pub fn popups(&self) -> Vec<(&str, usize)> {
        self.events
            .iter()
            .filter_map(|e| match e {
                ViewEvent::Popup {
                    layer_id, index, ..
                } => Some((layer_id.as_str(), *index)),
                _ => None,
            })
            .collect()
    }

    pub fn clear(&mut self) {
        self.events.clear();
    }
}

impl MapView for RecordingView {
    fn set_map_options(&mut self, options: &MapSettings) {
        self.events.push(ViewEvent::MapOptions(options.clone()));
    }

    fn add_base_layer(&mut self, layer: &BaseLayerConfig) {
        self.events.push(ViewEvent::BaseLayer(layer.id.clone()));
    }

    fn attach_layer(&mut self, layer: &LoadedLayer) {
        self.events.push(ViewEvent::Attach(layer.id().to_string()));
    }

    fn detach_layer(&mut self, layer_id: &str) {
        self.events.push(ViewEvent::Detach(layer_id.to_string()));
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32) {
        self.events.push(ViewEvent::FitBounds { bounds, padding });
    }

    fn open_popup(&mut self, layer_id: &str, index: usize, html: &str) {
        self.events.push(ViewEvent::Popup {
            layer_id: layer_id.to_string(),
            index,
            html: html.to_string(),
        });
    }

    fn notify(&mut self, message: &str) {
        self.events.push(ViewEvent::Notify(message.to_string()));
    }

    fn offer_download(&mut self, filename: &str, bytes: &[u8]) {
        self.events.push(ViewEvent::Download {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        });
    }
}

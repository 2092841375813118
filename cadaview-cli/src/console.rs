//! Terminal map view.
//!
//! Prints the session's user-facing messages and viewport changes, and
//! keeps downloads so the command can write them to disk.

use cadaview::config::{BaseLayerConfig, MapSettings};
use cadaview::coord::Bounds;
use cadaview::layer::LoadedLayer;
use cadaview::MapView;
use tracing::debug;

/// A file offered for download.
pub struct Download {
    pub filename: String,
    pub bytes: Vec<u8>,
}

/// [`MapView`] for the terminal.
#[derive(Default)]
pub struct ConsoleView {
    /// Suppress viewport output
    quiet: bool,
    notifications: usize,
    downloads: Vec<Download>,
}

impl ConsoleView {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn quiet() -> Self {
        Self {
            quiet: true,
            ..Self::default()
        }
    }

    pub fn notification_count(&self) -> usize {
        self.notifications
    }

    pub fn take_downloads(&mut self) -> Vec<Download> {
        std::mem::take(&mut self.downloads)
    }
}

impl MapView for ConsoleView {
    fn set_map_options(&mut self, options: &MapSettings) {
        debug!(
            lat = options.center_lat,
            lon = options.center_lon,
            zoom = options.zoom,
            "Map options"
        );
    }

    fn add_base_layer(&mut self, layer: &BaseLayerConfig) {
        debug!(layer = %layer.id, "Base layer");
    }

    fn attach_layer(&mut self, layer: &LoadedLayer) {
        if !self.quiet {
            println!("Layer ready: {} ({})", layer.name(), layer.kind());
        }
    }

    fn detach_layer(&mut self, layer_id: &str) {
        debug!(layer = layer_id, "Layer detached");
    }

    fn fit_bounds(&mut self, bounds: Bounds, padding: u32) {
        if !self.quiet {
            let (lat, lon) = bounds.center();
            println!(
                "View: [{:.6}, {:.6}] - [{:.6}, {:.6}] (center {:.6}, {:.6}; padding {}px)",
                bounds.min_lon,
                bounds.min_lat,
                bounds.max_lon,
                bounds.max_lat,
                lat,
                lon,
                padding
            );
        }
    }

    fn open_popup(&mut self, layer_id: &str, index: usize, _html: &str) {
        debug!(layer = layer_id, index = index, "Popup opened");
    }

    fn notify(&mut self, message: &str) {
        self.notifications += 1;
        eprintln!("{}", message);
    }

    fn offer_download(&mut self, filename: &str, bytes: &[u8]) {
        self.downloads.push(Download {
            filename: filename.to_string(),
            bytes: bytes.to_vec(),
        });
    }
}

//! Turn batches of geolocated radiological measurements into what a map needs: a color per
//! marker, a recentered view, a heat overlay that follows the layer toggle, and the spectrum of
//! the point the user clicked last.
//!
//! [`MapView`] is the entry point. It owns one batch at a time and the overlay attached to the
//! rendering [`Surface`](overlay::Surface).
extern crate geojson;
extern crate imagefmt;
extern crate num;
extern crate rayon;
extern crate serde;
extern crate serde_json;
#[macro_use]
extern crate serde_derive;
extern crate thiserror;
extern crate tracing;

use std::rc::Rc;

use tracing::{info, warn};

mod types;
pub use types::*;
pub mod color;
pub mod config;
pub mod error;
pub mod heat;
pub mod normalize;
pub mod overlay;
pub mod selection;
pub mod source;
pub mod util;

pub use color::ColorScale;
pub use config::ViewConfig;
pub use error::{Error, Result};
pub use heat::{HeatGrid, HeatLayer, HeatSample};
pub use normalize::{normalize, Normalized};
pub use overlay::{LayerEvent, OverlayLifecycle, OverlayState, Surface, SurfaceSlot};
pub use selection::{DetailRequest, DetailStatus, DetailTracker, RequestToken, SelectionSet};
pub use source::{BatchSource, DirSource, FetchQueue, SpectrumSource};


/// Where the current batch stands.
#[derive(Debug, Clone, PartialEq)]
pub enum BatchStatus {
    /// Nothing requested yet.
    Idle,
    Loading { flight: String },
    Ready { count: usize },
    Failed { reason: String },
}

/// One map component: the loaded batch, its derived domain and center, highlighted points, the
/// detail view and the heat overlay.
pub struct MapView<S: Surface> {
    config: ViewConfig,
    batch: Rc<Vec<Measurement>>,
    generation: u64,
    status: BatchStatus,
    normalized: Normalized,
    selection: SelectionSet,
    detail: DetailTracker,
    overlay: OverlayLifecycle<S>,
}

impl<S: Surface> MapView<S> {
    pub fn new(surface: S, config: ViewConfig) -> MapView<S> {
        let overlay = OverlayLifecycle::new(surface, config.heat_layer_name.clone(), config.heat_radius);
        MapView {
            normalized: Normalized {
                domain: None,
                center: config.fallback_center,
                bounds: None,
            },
            config: config,
            batch: Rc::new(Vec::new()),
            generation: 0,
            status: BatchStatus::Idle,
            selection: SelectionSet::new(),
            detail: DetailTracker::new(),
            overlay: overlay,
        }
    }

    /// A new batch was requested. Detail of the previous batch is dropped right away.
    pub fn begin_load(&mut self, flight: &str) {
        self.detail.reset();
        self.status = BatchStatus::Loading { flight: flight.to_owned() };
    }

    /// Replace the batch. Recomputes domain and center, clears selection and detail, and takes
    /// the heat overlay down; it is rebuilt from the new batch on the next add.
    pub fn load_batch(&mut self, measurements: Vec<Measurement>) {
        self.generation += 1;
        let normalized = normalize(&measurements, self.normalized.center);
        info!(count = measurements.len(),
              generation = self.generation,
              domain = ?normalized.domain,
              center = ?normalized.center,
              "batch loaded");
        self.status = BatchStatus::Ready { count: measurements.len() };
        self.normalized = normalized;
        self.batch = Rc::new(measurements);
        self.selection.clear();
        self.detail.reset();
        self.overlay.invalidate();
        self.overlay.set_source(self.batch.clone(), self.normalized.domain, self.generation);
    }

    /// The batch fetch failed. The previous batch stays on the map.
    pub fn load_failed<R: Into<String>>(&mut self, reason: R) {
        let reason = reason.into();
        warn!(%reason, "batch load failed");
        self.status = BatchStatus::Failed { reason: reason };
    }

    /// Load `flight` from `source`, recording failure in the batch status.
    pub fn load_from<B: BatchSource + ?Sized>(&mut self, source: &B, flight: &str) -> Result<()> {
        self.begin_load(flight);
        match source.load(flight) {
            Ok(batch) => {
                self.load_batch(batch);
                Ok(())
            }
            Err(e) => {
                self.load_failed(e.to_string());
                Err(e)
            }
        }
    }

    pub fn status(&self) -> &BatchStatus {
        &self.status
    }

    pub fn measurements(&self) -> &[Measurement] {
        &self.batch
    }

    pub fn domain(&self) -> Option<ValueDomain> {
        self.normalized.domain
    }

    pub fn center(&self) -> GeoCenter {
        self.normalized.center
    }

    pub fn bounds(&self) -> Option<Bounds> {
        self.normalized.bounds
    }

    pub fn config(&self) -> &ViewConfig {
        &self.config
    }

    pub fn selection(&self) -> &SelectionSet {
        &self.selection
    }

    pub fn detail(&self) -> &DetailTracker {
        &self.detail
    }

    pub fn overlay(&self) -> &OverlayLifecycle<S> {
        &self.overlay
    }

    /// Marker of each measurement. Selected points are drawn red and larger.
    pub fn markers(&self) -> Vec<Marker> {
        let scale = self.normalized.domain.map(ColorScale::new);
        self.batch
            .iter()
            .map(|m| {
                let selected = self.selection.is_selected(&m.id);
                let color = match (selected, scale) {
                    (true, _) => Rgb::RED,
                    (false, Some(s)) => s.color(m.spectrum_value),
                    (false, None) => color::ramp(1.0),
                };
                Marker {
                    id: m.id.clone(),
                    lat: m.lat,
                    lon: m.lon,
                    color: color,
                    radius: if selected {
                        self.config.selected_radius
                    } else {
                        self.config.marker_radius
                    },
                    selected: selected,
                }
            })
            .collect()
    }

    /// A marker was clicked: highlight it and request its spectrum. Ids not in the current
    /// batch are ignored.
    pub fn on_select(&mut self, id: MeasurementId) -> Option<DetailRequest> {
        if !self.batch.iter().any(|m| m.id == id) {
            warn!(%id, "selected id is not in the current batch");
            return None;
        }
        self.selection.select(id.clone());
        Some(self.detail.request(id))
    }

    /// A spectrum fetch finished. Returns whether it is now displayed.
    pub fn on_detail(&mut self, token: RequestToken, result: Result<Spectrum>) -> bool {
        self.detail.resolve(token, result)
    }

    /// Queue a layer toggle from the surface.
    pub fn push_layer_event(&mut self, event: LayerEvent) {
        self.overlay.push(event)
    }

    /// Apply queued layer toggles in order.
    pub fn pump_events(&mut self) -> usize {
        self.overlay.pump()
    }

    /// Rasterize the heat representation of the current batch. Uses the overlay's layer when
    /// one is built, otherwise derives a throwaway one.
    pub fn heat_grid(&self) -> Option<HeatGrid> {
        let domain = self.normalized.domain?;
        let grid = match self.overlay.layer() {
            Some(layer) if layer.generation() == self.generation => {
                HeatGrid::from_layer(layer, self.config.raster_resolution, true)
            }
            _ => {
                let layer = HeatLayer::new(heat::heat_samples(&self.batch, domain),
                                           self.config.heat_radius,
                                           self.generation);
                HeatGrid::from_layer(&layer, self.config.raster_resolution, true)
            }
        };
        Some(grid)
    }

    /// Unmount: stop taking layer events and release the overlay. Also runs on drop.
    pub fn teardown(&mut self) {
        self.overlay.teardown();
        self.detail.reset();
    }
}

use std::env;
use std::str::FromStr;

use tracing::warn;

use crate::heat::DEFAULT_RADIUS;
use crate::types::GeoCenter;

/// Where the map starts before any batch with a fix has been loaded.
pub const FALLBACK_CENTER: GeoCenter = GeoCenter {
    lat: 55.704034038232834,
    lng: 37.62119540524117,
};

pub const HEAT_LAYER_NAME: &str = "Heat map";

/// Settings for a [`MapView`](crate::MapView). Values can be overridden through `RADMAP_*`
/// environment variables.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ViewConfig {
    pub fallback_center: GeoCenter,
    /// Overlay name whose toggles drive the heat layer.
    pub heat_layer_name: String,
    pub heat_radius: u32,
    pub marker_radius: u32,
    pub selected_radius: u32,
    /// (height, width) in pixels of exported heat rasters.
    pub raster_resolution: (usize, usize),
}

impl Default for ViewConfig {
    fn default() -> Self {
        ViewConfig {
            fallback_center: FALLBACK_CENTER,
            heat_layer_name: HEAT_LAYER_NAME.to_owned(),
            heat_radius: DEFAULT_RADIUS,
            marker_radius: 5,
            selected_radius: 7,
            raster_resolution: (512, 512),
        }
    }
}

fn var<T: FromStr>(name: &str) -> Option<T> {
    let raw = env::var(name).ok()?;
    match raw.parse() {
        Ok(v) => Some(v),
        Err(_) => {
            warn!(var = name, value = %raw, "ignoring unparsable setting");
            None
        }
    }
}

impl ViewConfig {
    /// Defaults, overridden by `RADMAP_CENTER_LAT`, `RADMAP_CENTER_LNG`, `RADMAP_HEAT_LAYER`,
    /// `RADMAP_HEAT_RADIUS`, `RADMAP_MARKER_RADIUS`, `RADMAP_SELECTED_RADIUS` and
    /// `RADMAP_RASTER_SIZE`.
    pub fn from_env() -> Self {
        let mut config = ViewConfig::default();
        if let Some(lat) = var("RADMAP_CENTER_LAT") {
            config.fallback_center.lat = lat;
        }
        if let Some(lng) = var("RADMAP_CENTER_LNG") {
            config.fallback_center.lng = lng;
        }
        if let Ok(name) = env::var("RADMAP_HEAT_LAYER") {
            config.heat_layer_name = name;
        }
        if let Some(r) = var("RADMAP_HEAT_RADIUS") {
            config.heat_radius = r;
        }
        if let Some(r) = var("RADMAP_MARKER_RADIUS") {
            config.marker_radius = r;
        }
        if let Some(r) = var("RADMAP_SELECTED_RADIUS") {
            config.selected_radius = r;
        }
        if let Some(size) = var::<usize>("RADMAP_RASTER_SIZE") {
            config.raster_resolution = (size, size);
        }
        config
    }
}

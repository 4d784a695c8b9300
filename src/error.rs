//! Error types for radmap.

use thiserror::Error;

use crate::types::MeasurementId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("GeoJSON error: {0}")]
    GeoJson(#[from] geojson::Error),

    #[error("Feature {index} is not a usable measurement: {reason}")]
    BadFeature { index: usize, reason: String },

    #[error("Spectrum fetch for {id} failed: {reason}")]
    Fetch { id: MeasurementId, reason: String },

    #[error("Batch load for {flight} failed: {reason}")]
    BatchLoad { flight: String, reason: String },

    #[error("Empty grid, nothing to write")]
    EmptyGrid,

    #[error("Image write failed: {0}")]
    Image(String),
}

pub type Result<T> = std::result::Result<T, Error>;

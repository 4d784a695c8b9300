//! Value domain and view center of a measurement batch.
//!
//! The two are derived from different subsets on purpose: every measurement contributes to the
//! value domain since intensity does not depend on having a fix, while only measurements with a
//! fix move the center.

use tracing::warn;

use crate::types::{Bounds, GeoCenter, Measurement, ValueDomain};
use crate::util::measurement_bounds;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Normalized {
    /// `None` for an empty batch.
    pub domain: Option<ValueDomain>,
    pub center: GeoCenter,
    /// Bounding region of the measurements with a fix.
    pub bounds: Option<Bounds>,
}

/// Min and max spectrum value over all measurements, fix or not.
pub fn value_domain(measurements: &[Measurement]) -> Option<ValueDomain> {
    let mut iter = measurements.iter().map(|m| m.spectrum_value);
    let first = iter.next()?;
    let (low, high) = iter.fold((first, first), |(lo, hi), v| (f64::min(lo, v), f64::max(hi, v)));
    Some(ValueDomain {
        low: low,
        high: high,
    })
}

/// Derive the color domain and recenter. `fallback` is kept as the center when no measurement
/// has a fix.
pub fn normalize(measurements: &[Measurement], fallback: GeoCenter) -> Normalized {
    let domain = value_domain(measurements);
    match domain {
        None => warn!("empty batch, using fallback center"),
        Some(d) if d.is_degenerate() => {
            warn!(value = d.low, "all measurements share one value, coloring at full intensity")
        }
        Some(_) => (),
    }
    let bounds = measurement_bounds(measurements.iter());
    if bounds.is_none() && !measurements.is_empty() {
        warn!(count = measurements.len(), "no measurement has a fix, keeping center");
    }
    Normalized {
        domain: domain,
        center: bounds.map(|b| b.center()).unwrap_or(fallback),
        bounds: bounds,
    }
}

//! Four band blue, green, yellow, red ramp used to tint markers and heat rasters.

use crate::types::{Rgb, ValueDomain};

const BAND_WIDTH: f64 = 0.25;

/// Segment of the ramp a normalized value falls into. Ordered from cold to hot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Band {
    /// [0, 0.25]: blue fades out while green rises.
    BlueGreen,
    /// (0.25, 0.5]: green held, red rises.
    GreenYellow,
    /// (0.5, 0.75]: flat yellow.
    Yellow,
    /// (0.75, 1]: red held, green falls.
    YellowRed,
}

impl Band {
    pub fn start(&self) -> f64 {
        match *self {
            Band::BlueGreen => 0.0,
            Band::GreenYellow => 0.25,
            Band::Yellow => 0.5,
            Band::YellowRed => 0.75,
        }
    }
}

/// Normalized position of `value` in the domain, `1 - (high - value) / (high - low)`.
///
/// Clamped to [0, 1] so points colored against another batch's domain stay on the ramp. A
/// degenerate domain yields 1 and a NaN value yields 0.
pub fn diff(value: f64, domain: ValueDomain) -> f64 {
    if domain.is_degenerate() {
        return 1.0;
    }
    let d = 1.0 - (domain.high - value) / domain.span();
    if d.is_nan() {
        0.0
    } else {
        d.max(0.0).min(1.0)
    }
}

/// Band of an already normalized `diff`. Band edges belong to the lower band.
pub fn band(diff: f64) -> Band {
    if diff <= 0.25 {
        Band::BlueGreen
    } else if diff <= 0.5 {
        Band::GreenYellow
    } else if diff <= 0.75 {
        Band::Yellow
    } else {
        Band::YellowRed
    }
}

#[inline]
fn channel(v: f64) -> u8 {
    v.round().max(0.0).min(255.0) as u8
}

/// Ramp color at normalized position `diff` in [0, 1].
pub fn ramp(diff: f64) -> Rgb {
    let b = band(diff);
    let t = (diff - b.start()) / BAND_WIDTH;
    match b {
        Band::BlueGreen => Rgb::new(0, channel(255.0 * t), channel(255.0 * (1.0 - t))),
        Band::GreenYellow => Rgb::new(channel(255.0 * t), 255, 0),
        Band::Yellow => Rgb::new(255, 255, 0),
        Band::YellowRed => Rgb::new(255, channel(255.0 * (1.0 - t)), 0),
    }
}

/// Color for `value` given the batch's observed `[low, high]`.
pub fn color(value: f64, low: f64, high: f64) -> Rgb {
    ramp(diff(value, ValueDomain { low: low, high: high }))
}

/// A ramp bound to one domain.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColorScale {
    pub domain: ValueDomain,
}

impl ColorScale {
    pub fn new(domain: ValueDomain) -> ColorScale {
        ColorScale { domain: domain }
    }

    pub fn color(&self, value: f64) -> Rgb {
        ramp(diff(value, self.domain))
    }

    pub fn band(&self, value: f64) -> Band {
        band(diff(value, self.domain))
    }
}

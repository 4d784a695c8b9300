use std::fmt;

/// Identifier of a measurement as handed out by the batch source. Either a JSON number or string.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MeasurementId {
    Num(i64),
    Text(String),
}

impl fmt::Display for MeasurementId {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match *self {
            MeasurementId::Num(n) => write!(f, "{}", n),
            MeasurementId::Text(ref s) => f.write_str(s),
        }
    }
}

impl From<i64> for MeasurementId {
    fn from(n: i64) -> MeasurementId {
        MeasurementId::Num(n)
    }
}

impl From<i32> for MeasurementId {
    fn from(n: i32) -> MeasurementId {
        MeasurementId::Num(n as i64)
    }
}

impl<'a> From<&'a str> for MeasurementId {
    fn from(s: &'a str) -> MeasurementId {
        MeasurementId::Text(s.to_owned())
    }
}

/// One geolocated spectral intensity sample, in degrees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Measurement {
    pub id: MeasurementId,
    pub lat: f64,
    pub lon: f64,
    #[serde(rename = "spectrumValue")]
    pub spectrum_value: f64,
}

impl Measurement {
    pub fn new<I: Into<MeasurementId>>(id: I, lat: f64, lon: f64, spectrum_value: f64) -> Measurement {
        Measurement {
            id: id.into(),
            lat: lat,
            lon: lon,
            spectrum_value: spectrum_value,
        }
    }

    /// Whether the coordinates are a real position. Receivers report a zero coordinate when they
    /// have no fix.
    pub fn has_fix(&self) -> bool {
        self.lat != 0.0 && self.lon != 0.0
    }
}

/// Range of spectrum values observed in a batch. Always `low <= high`.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct ValueDomain {
    pub low: f64,
    pub high: f64,
}

impl ValueDomain {
    pub fn new(a: f64, b: f64) -> ValueDomain {
        ValueDomain {
            low: f64::min(a, b),
            high: f64::max(a, b),
        }
    }

    pub fn span(&self) -> f64 {
        self.high - self.low
    }

    /// Single-valued domain, where the usual normalization would divide by zero.
    pub fn is_degenerate(&self) -> bool {
        !(self.span() > 0.0)
    }

    /// Position of `value` inside the domain, 0 at `low` and 1 at `high`. Not clamped.
    /// A degenerate domain maps everything to 1.
    pub fn normalize(&self, value: f64) -> f64 {
        if self.is_degenerate() {
            1.0
        } else {
            (value - self.low) / self.span()
        }
    }
}

/// Map view center.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct GeoCenter {
    pub lat: f64,
    pub lng: f64,
}

/// Represent some map bounds, in degrees.
#[derive(Debug, PartialEq, Clone, Copy, Serialize, Deserialize)]
pub struct Bounds {
    pub north: f64,
    pub south: f64,
    pub east: f64,
    pub west: f64,
}

impl Bounds {
    pub fn range_lat(&self) -> f64 {
        self.north - self.south
    }
    pub fn range_lon(&self) -> f64 {
        self.east - self.west
    }
    /// Midpoint of the latitude and longitude extents.
    pub fn center(&self) -> GeoCenter {
        GeoCenter {
            lat: (self.south + self.north) / 2.0,
            lng: (self.west + self.east) / 2.0,
        }
    }
    pub fn contains(&self, lat: f64, lon: f64) -> bool {
        self.south <= lat && lat <= self.north && self.west <= lon && lon <= self.east
    }
}

/// 8-bit RGB color.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Rgb {
    pub r: u8,
    pub g: u8,
    pub b: u8,
}

impl Rgb {
    pub const RED: Rgb = Rgb { r: 255, g: 0, b: 0 };
    pub const BLUE: Rgb = Rgb { r: 0, g: 0, b: 255 };

    pub fn new(r: u8, g: u8, b: u8) -> Rgb {
        Rgb { r: r, g: g, b: b }
    }

    pub fn to_hex(&self) -> String {
        format!("#{:02x}{:02x}{:02x}", self.r, self.g, self.b)
    }
}

/// CSS functional notation, `rgb(r, g, b)`.
impl fmt::Display for Rgb {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "rgb({}, {}, {})", self.r, self.g, self.b)
    }
}

/// Per-channel counts of one measurement, fetched on selection.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Spectrum {
    pub spectrum: Vec<f64>,
}

impl Spectrum {
    pub fn new(values: Vec<f64>) -> Spectrum {
        Spectrum { spectrum: values }
    }

    /// (channel, value) pairs, ready for a line chart.
    pub fn channels<'a>(&'a self) -> impl Iterator<Item = (usize, f64)> + 'a {
        self.spectrum.iter().cloned().enumerate()
    }

    pub fn len(&self) -> usize {
        self.spectrum.len()
    }

    pub fn is_empty(&self) -> bool {
        self.spectrum.is_empty()
    }
}

/// A point marker as drawn on the map.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Marker {
    pub id: MeasurementId,
    pub lat: f64,
    pub lon: f64,
    pub color: Rgb,
    pub radius: u32,
    pub selected: bool,
}

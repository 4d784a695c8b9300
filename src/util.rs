use std::f64;
use std::io::Read;
use std::path::Path;

use geojson::{feature, Feature, FeatureCollection, GeoJson, Geometry, JsonObject, Value};
use imagefmt::{ColFmt, ColType};
use num::ToPrimitive;
use serde_json::Value as JsonValue;

use crate::color;
use crate::error::{Error, Result};
use crate::types::{Bounds, Marker, Measurement, MeasurementId};


/// Compute the length in meters of one degree latitude and longitude at given latitude degree.
pub fn lat_lon(lat: f64) -> (f64, f64) {
    // Port of http://msi.nga.mil/MSISiteContent/StaticFiles/Calculators/degree.html
    let lat = lat * f64::consts::PI * 2.0 / 360.0;
    let m1 = 111132.92;
    let m2 = -559.82;
    let m3 = 1.175;
    let m4 = -0.0023;
    let p1 = 111412.84;
    let p2 = -93.5;
    let p3 = 0.118;

    // Calculate the length of a degree of latitude and longitude in meters
    let latlen = m1 + (m2 * (2.0 * lat).cos()) + (m3 * (4.0 * lat).cos()) +
                 (m4 * (6.0 * lat).cos());
    let longlen = (p1 * lat.cos()) + (p2 * (3.0 * lat).cos()) + (p3 * (5.0 * lat).cos());
    (latlen, longlen)
}


/// Find the bounds over an iterator of measurements. Only points with a fix count, so the result
/// is `None` when nothing has a real position.
pub fn measurement_bounds<'a, I: Iterator<Item = &'a Measurement>>(iter: I) -> Option<Bounds> {
    iter.filter(|m| m.has_fix()).fold(None, |acc, m| {
        Some(match acc {
            None => {
                Bounds {
                    north: m.lat,
                    south: m.lat,
                    east: m.lon,
                    west: m.lon,
                }
            }
            Some(b) => {
                Bounds {
                    north: f64::max(b.north, m.lat),
                    south: f64::min(b.south, m.lat),
                    east: f64::max(b.east, m.lon),
                    west: f64::min(b.west, m.lon),
                }
            }
        })
    })
}


fn feature_id(f: &Feature) -> Option<MeasurementId> {
    match f.id {
        Some(feature::Id::String(ref s)) => return Some(MeasurementId::Text(s.clone())),
        Some(feature::Id::Number(ref n)) => {
            if let Some(n) = n.as_i64() {
                return Some(MeasurementId::Num(n));
            }
        }
        None => (),
    }
    f.property("id").and_then(|v| ::serde_json::from_value(v.clone()).ok())
}

fn feature_to_measurement(index: usize, f: &Feature) -> Result<Measurement> {
    let bad = |reason: &str| {
        Error::BadFeature {
            index: index,
            reason: reason.to_owned(),
        }
    };
    let position = match f.geometry {
        Some(Geometry { value: Value::Point(ref pos), .. }) if pos.len() >= 2 => pos,
        _ => return Err(bad("geometry is not a point")),
    };
    let spectrum_value = f.property("spectrumValue")
        .and_then(JsonValue::as_f64)
        .ok_or_else(|| bad("missing numeric spectrumValue"))?;
    let id = feature_id(f).ok_or_else(|| bad("missing id"))?;
    Ok(Measurement {
        id: id,
        lat: position[1],
        lon: position[0],
        spectrum_value: spectrum_value,
    })
}

/// Read a measurement batch. Accepts the plain record array served by the data API, or a GeoJSON
/// FeatureCollection of points carrying `id` and `spectrumValue`.
pub fn measurements_from_json<R: Read>(reader: R) -> Result<Vec<Measurement>> {
    let json: JsonValue = ::serde_json::from_reader(reader)?;
    if json.is_array() {
        return Ok(::serde_json::from_value(json)?);
    }
    match GeoJson::from_json_value(json)? {
        GeoJson::FeatureCollection(ref fc) => {
            fc.features
                .iter()
                .enumerate()
                .map(|(i, f)| feature_to_measurement(i, f))
                .collect()
        }
        GeoJson::Feature(ref f) => Ok(vec![feature_to_measurement(0, f)?]),
        GeoJson::Geometry(_) => {
            Err(Error::BadFeature {
                index: 0,
                reason: "bare geometry has no spectrumValue".to_owned(),
            })
        }
    }
}


/// Export markers as a FeatureCollection of points with `color`, `radius` and `selected`
/// properties.
pub fn markers_to_geojson(markers: &[Marker]) -> GeoJson {
    let features = markers.iter()
        .map(|m| {
            let mut props = JsonObject::new();
            props.insert("color".to_owned(), JsonValue::from(m.color.to_string()));
            props.insert("radius".to_owned(), JsonValue::from(m.radius));
            props.insert("selected".to_owned(), JsonValue::from(m.selected));
            let id = match m.id {
                MeasurementId::Num(n) => feature::Id::Number(n.into()),
                MeasurementId::Text(ref s) => feature::Id::String(s.clone()),
            };
            Feature {
                bbox: None,
                geometry: Some(Geometry::new(Value::Point(vec![m.lon, m.lat]))),
                id: Some(id),
                properties: Some(props),
                foreign_members: None,
            }
        })
        .collect();
    GeoJson::FeatureCollection(FeatureCollection {
        bbox: None,
        features: features,
        foreign_members: None,
    })
}


/// Write given 2D numerical matrix to an RGB image at requested path, colored along the marker
/// ramp. Clip specifies lower, upper bounds of values mapped to the ends of the ramp. Cells at or
/// below zero are left black.
pub fn grid_to_img<T: Copy + ToPrimitive, P: AsRef<Path>>(t: &[T],
                                                           dim: (usize, usize),
                                                           p: P,
                                                           clip: Option<(T, T)>)
                                                           -> Result<()> {
    let (m, n) = dim;
    if t.is_empty() || m * n != t.len() {
        return Err(Error::EmptyGrid);
    }
    let vals = t.iter().map(|v| v.to_f64().unwrap_or(0.0)).collect::<Vec<f64>>();
    let (min, max) = {
        let min = vals.iter().cloned().fold(f64::MAX, f64::min);
        let max = vals.iter().cloned().fold(f64::MIN, f64::max);
        match clip.map(|(lo, hi)| (lo.to_f64(), hi.to_f64())) {
            Some((Some(lo), Some(hi))) => (f64::max(min, lo), f64::min(max, hi)),
            _ => (min, max),
        }
    };
    // make sure range > 0 to avoid divide by zero later.
    let range = if max > min { max - min } else { 1.0 };
    let mut bytes = Vec::with_capacity(3 * vals.len());
    for v in vals {
        if v <= 0.0 {
            bytes.extend_from_slice(&[0, 0, 0]);
            continue;
        }
        let c = color::ramp(((v - min) / range).max(0.0).min(1.0));
        bytes.extend_from_slice(&[c.r, c.g, c.b]);
    }
    ::imagefmt::write(p, n, m, ColFmt::RGB, &bytes, ColType::Auto)
        .map_err(|e| Error::Image(format!("{:?}", e)))
}


#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Rgb;

    #[test]
    fn bounds_skip_points_without_fix() {
        let ms = vec![Measurement::new(1, 10.0, 20.0, 1.0),
                      Measurement::new(2, 0.0, 0.0, 9.0),
                      Measurement::new(3, 30.0, 40.0, 5.0)];
        let b = measurement_bounds(ms.iter()).unwrap();
        assert_eq!(b,
                   Bounds {
                       north: 30.0,
                       south: 10.0,
                       east: 40.0,
                       west: 20.0,
                   });
        assert!(measurement_bounds(ms[1..2].iter()).is_none());
    }

    #[test]
    fn degree_length_near_equator() {
        let (lat_len, lon_len) = lat_lon(0.0);
        assert!((lat_len - 110574.0).abs() < 5.0);
        assert!((lon_len - 111319.0).abs() < 5.0);
        let (_, lon_len_north) = lat_lon(60.0);
        assert!(lon_len_north < lon_len / 1.9);
    }

    #[test]
    fn reads_record_array() {
        let json = r#"[{"id": 1, "lat": 10, "lon": 20, "spectrumValue": 1}]"#;
        let ms = measurements_from_json(json.as_bytes()).unwrap();
        assert_eq!(ms, vec![Measurement::new(1, 10.0, 20.0, 1.0)]);
    }

    #[test]
    fn reads_feature_collection() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "id": 4,
             "geometry": {"type": "Point", "coordinates": [37.6, 55.7]},
             "properties": {"spectrumValue": 2.5}},
            {"type": "Feature",
             "geometry": {"type": "Point", "coordinates": [37.7, 55.8]},
             "properties": {"id": "b", "spectrumValue": 3}}]}"#;
        let ms = measurements_from_json(json.as_bytes()).unwrap();
        assert_eq!(ms[0], Measurement::new(4, 55.7, 37.6, 2.5));
        assert_eq!(ms[1], Measurement::new("b", 55.8, 37.7, 3.0));
    }

    #[test]
    fn rejects_feature_without_value() {
        let json = r#"{"type": "FeatureCollection", "features": [
            {"type": "Feature", "id": 4,
             "geometry": {"type": "Point", "coordinates": [37.6, 55.7]},
             "properties": {}}]}"#;
        match measurements_from_json(json.as_bytes()) {
            Err(Error::BadFeature { index: 0, .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
    }

    #[test]
    fn markers_export_as_points() {
        let markers = vec![Marker {
                               id: MeasurementId::Num(3),
                               lat: 55.7,
                               lon: 37.6,
                               color: Rgb::new(0, 0, 255),
                               radius: 5,
                               selected: false,
                           }];
        let json = markers_to_geojson(&markers).to_string();
        let back: JsonValue = ::serde_json::from_str(&json).unwrap();
        let f = &back["features"][0];
        assert_eq!(f["geometry"]["coordinates"][0], 37.6);
        assert_eq!(f["properties"]["color"], "rgb(0, 0, 255)");
        assert_eq!(f["properties"]["radius"], 5);
        assert_eq!(f["id"], 3);
    }

    #[test]
    fn grid_to_img_rejects_bad_dims() {
        let grid = vec![0.5f32; 6];
        match grid_to_img(&grid, (2, 2), "never_written.png", None) {
            Err(Error::EmptyGrid) => (),
            other => panic!("unexpected {:?}", other),
        }
    }
}

//! Heat representation of a batch: weighted samples and their rasterization onto a lat/lon grid.

use rayon::prelude::*;

use crate::types::{Bounds, Measurement, ValueDomain};
use crate::util::lat_lon;

/// Default splat radius in grid cells.
pub const DEFAULT_RADIUS: u32 = 15;

/// One weighted point of the overlay. Intensity is in [0, 1].
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct HeatSample {
    pub lat: f64,
    pub lon: f64,
    pub intensity: f64,
}

/// Weight each measurement with a fix by its position in `domain`. A degenerate domain gives every
/// sample full intensity.
pub fn heat_samples(measurements: &[Measurement], domain: ValueDomain) -> Vec<HeatSample> {
    measurements.iter()
        .filter(|m| m.has_fix())
        .map(|m| {
            HeatSample {
                lat: m.lat,
                lon: m.lon,
                intensity: domain.normalize(m.spectrum_value).max(0.0).min(1.0),
            }
        })
        .collect()
}

/// The constructed overlay, ready to hand to a rendering surface.
#[derive(Debug, Clone, PartialEq)]
pub struct HeatLayer {
    samples: Vec<HeatSample>,
    radius: u32,
    generation: u64,
}

impl HeatLayer {
    pub fn new(samples: Vec<HeatSample>, radius: u32, generation: u64) -> HeatLayer {
        HeatLayer {
            samples: samples,
            radius: radius,
            generation: generation,
        }
    }

    pub fn samples(&self) -> &[HeatSample] {
        &self.samples
    }

    pub fn radius(&self) -> u32 {
        self.radius
    }

    /// Batch generation the samples were derived from.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Bounding box of all samples, `None` for an empty layer.
    pub fn bounds(&self) -> Option<Bounds> {
        self.samples.iter().fold(None, |acc, s| {
            Some(match acc {
                None => {
                    Bounds {
                        north: s.lat,
                        south: s.lat,
                        east: s.lon,
                        west: s.lon,
                    }
                }
                Some(b) => {
                    Bounds {
                        north: f64::max(b.north, s.lat),
                        south: f64::min(b.south, s.lat),
                        east: f64::max(b.east, s.lon),
                        west: f64::min(b.west, s.lon),
                    }
                }
            })
        })
    }
}

/// How to run the rasterizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Processor {
    SingleCore,
    MultiCore,
}

/// Fill one grid row: each cell takes the strongest falloff among samples within `radius` cells.
#[inline]
fn fill_row(i: usize, row: &mut [f32], pts: &[(f64, f64, f64)], radius: f64) {
    let r = i as f64;
    for (j, cell) in row.iter_mut().enumerate() {
        let c = j as f64;
        let mut best = 0.0f64;
        for &(pr, pc, w) in pts {
            let dr = pr - r;
            if dr.abs() >= radius {
                continue;
            }
            let dc = pc - c;
            let d = (dr * dr + dc * dc).sqrt();
            if d < radius {
                best = f64::max(best, w * (1.0 - d / radius));
            }
        }
        *cell = best as f32;
    }
}

impl Processor {
    fn process(self, pts: &[(f64, f64, f64)], radius: f64, dim: (usize, usize)) -> Vec<f32> {
        let (m, n) = dim;
        let mut grid = vec![0.0f32; m * n];
        if n == 0 {
            return grid;
        }
        match self {
            Processor::SingleCore => {
                for (i, row) in grid.chunks_mut(n).enumerate() {
                    fill_row(i, row, pts, radius);
                }
            }
            Processor::MultiCore => {
                grid.par_chunks_mut(n)
                    .enumerate()
                    .for_each(|(i, row)| fill_row(i, row, pts, radius));
            }
        }
        grid
    }
}

/// `HeatGrid` rasterizes a heat layer onto a grid covering the layer's bounds. The grid computes
/// step size from the center of the bounds, so rows and columns are roughly square in meters.
#[derive(Debug, Clone)]
pub struct HeatGrid {
    bounds: Bounds,
    res_lat: f64,
    res_lon: f64,
    grid_height: usize,
    grid_width: usize,
    grid: Vec<f32>,
}

impl HeatGrid {
    /// Rasterize `layer` on all cores. Resolution is the requested (height, width) in pixels. If
    /// scale is true the aspect ratio of the covered area is kept, potentially reducing one of the
    /// dimensions. Otherwise the grid stretches to the provided resolution.
    pub fn from_layer(layer: &HeatLayer, resolution: (usize, usize), scale: bool) -> HeatGrid {
        HeatGrid::from_layer_with(layer, resolution, scale, Processor::MultiCore)
    }

    pub fn from_layer_with(layer: &HeatLayer,
                           resolution: (usize, usize),
                           scale: bool,
                           processor: Processor)
                           -> HeatGrid {
        let bounds = match layer.bounds() {
            Some(b) => b,
            None => {
                return HeatGrid {
                    bounds: Bounds {
                        north: 0.0,
                        south: 0.0,
                        east: 0.0,
                        west: 0.0,
                    },
                    res_lat: 0.0,
                    res_lon: 0.0,
                    grid_height: 0,
                    grid_width: 0,
                    grid: Vec::new(),
                }
            }
        };
        let (lat_len, lon_len) = lat_lon((bounds.south + bounds.north) / 2.0);
        // A single point, or a straight line of them, still covers at least a meter.
        let real_height = f64::max(lat_len * bounds.range_lat(), 1.0);
        let real_width = f64::max(lon_len * bounds.range_lon(), 1.0);

        let (expected_height, expected_width) = resolution;
        let mut res_lat = real_height / expected_height.max(1) as f64;
        let mut res_lon = real_width / expected_width.max(1) as f64;
        if scale {
            res_lat = f64::max(res_lat, res_lon);
            res_lon = res_lat;
        }
        let grid_height = ((real_height / res_lat).round() as usize).max(1);
        let grid_width = ((real_width / res_lon).round() as usize).max(1);

        let pts = layer.samples()
            .iter()
            .map(|s| {
                let (row, col) = cell_of(&bounds, s.lat, s.lon, (grid_height, grid_width));
                (row, col, s.intensity)
            })
            .collect::<Vec<_>>();
        let radius = f64::max(layer.radius() as f64, 1.0);
        let grid = processor.process(&pts, radius, (grid_height, grid_width));

        HeatGrid {
            bounds: bounds,
            res_lat: res_lat,
            res_lon: res_lon,
            grid_height: grid_height,
            grid_width: grid_width,
            grid: grid,
        }
    }

    /// Grid resolution, in meters per row and meters per column.
    pub fn resolution(&self) -> (f64, f64) {
        (self.res_lat, self.res_lon)
    }

    /// Return the lat/lon boundaries of the grid.
    pub fn bbox(&self) -> Bounds {
        self.bounds
    }

    /// Grid dimensions.
    pub fn size(&self) -> (usize, usize) {
        (self.grid_height, self.grid_width)
    }

    pub fn len(&self) -> usize {
        self.grid.len()
    }

    /// Grid is 0x0.
    pub fn is_empty(&self) -> bool {
        self.grid.is_empty()
    }

    /// Immutable access to the underlying grid.
    pub fn grid(&self) -> &[f32] {
        &self.grid[..]
    }

    /// Return closest index in grid to given latitude, longitude, or `None` outside the grid.
    pub fn near_lat_lon(&self, lat: f64, lon: f64) -> Option<usize> {
        if self.is_empty() || !self.bounds.contains(lat, lon) {
            return None;
        }
        let (row, col) = cell_of(&self.bounds, lat, lon, self.size());
        Some(row.round() as usize * self.grid_width + col.round() as usize)
    }

    /// Return lat, lon coordinates of the center of the given cell.
    pub fn to_lat_lon(&self, idx: usize) -> (f64, f64) {
        let row = (idx / self.grid_width) as f64;
        let col = (idx % self.grid_width) as f64;
        let lat_step = if self.grid_height > 1 {
            self.bounds.range_lat() / (self.grid_height - 1) as f64
        } else {
            0.0
        };
        let lon_step = if self.grid_width > 1 {
            self.bounds.range_lon() / (self.grid_width - 1) as f64
        } else {
            0.0
        };
        (self.bounds.north - row * lat_step, self.bounds.west + col * lon_step)
    }

    /// Hottest cell and its value.
    pub fn peak(&self) -> Option<(usize, f32)> {
        self.grid
            .iter()
            .cloned()
            .enumerate()
            .fold(None, |best, (i, v)| match best {
                Some((_, bv)) if bv >= v => best,
                _ => Some((i, v)),
            })
    }
}

/// Fractional (row, col) of a coordinate. Max latitude goes to row 0. A zero extent maps to the
/// middle of that axis.
fn cell_of(bounds: &Bounds, lat: f64, lon: f64, dim: (usize, usize)) -> (f64, f64) {
    let (m, n) = dim;
    let row = if bounds.range_lat() > 0.0 {
        (bounds.north - lat) / bounds.range_lat() * ((m - 1) as f64)
    } else {
        ((m - 1) / 2) as f64
    };
    let col = if bounds.range_lon() > 0.0 {
        (lon - bounds.west) / bounds.range_lon() * ((n - 1) as f64)
    } else {
        ((n - 1) / 2) as f64
    };
    (row, col)
}

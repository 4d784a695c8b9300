extern crate radmap;

use std::time::{Duration, Instant};

use radmap::heat::{heat_samples, HeatGrid, HeatLayer, Processor};
use radmap::{normalize, Measurement};

const SIDE: usize = 1500;
const POINTS: usize = 4000;

/// Points along a lawnmower survey pattern with a hot spot in the middle.
fn mock_flight(n: usize) -> Vec<Measurement> {
    let rows = 40;
    (0..n)
        .map(|i| {
            let row = i * rows / n;
            let t = (i % (n / rows)) as f64 / (n / rows) as f64;
            let t = if row % 2 == 0 { t } else { 1.0 - t };
            let lat = 55.70 + 0.01 * row as f64 / rows as f64;
            let lon = 37.60 + 0.02 * t;
            let d = ((lat - 55.705) * 200.0).powi(2) + ((lon - 37.61) * 100.0).powi(2);
            Measurement::new(i as i64, lat, lon, 10.0 + 90.0 * (-d).exp())
        })
        .collect()
}

fn dur_as_ms(dur: Duration) -> f64 {
    dur.as_secs() as f64 * 1000.0 + dur.subsec_nanos() as f64 / 1000_000.0
}

// rasterize a 4000 point flight on a 1500x1500 grid.
fn main() {
    let flight = mock_flight(POINTS);
    let start = Instant::now();
    let n = normalize(&flight, radmap::config::FALLBACK_CENTER);
    println!("normalize: {:.2} ms", dur_as_ms(start.elapsed()));

    let domain = match n.domain {
        Some(d) => d,
        None => return,
    };
    let layer = HeatLayer::new(heat_samples(&flight, domain), 15, 1);
    for &(name, processor) in &[("singlecore", Processor::SingleCore),
                                ("multicore", Processor::MultiCore)] {
        let start = Instant::now();
        let grid = HeatGrid::from_layer_with(&layer, (SIDE, SIDE), true, processor);
        println!("{}: {:?} grid in {:.2} ms", name, grid.size(), dur_as_ms(start.elapsed()));
    }
}

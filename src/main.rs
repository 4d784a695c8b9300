extern crate anyhow;
extern crate radmap;
extern crate stopwatch;
extern crate tracing;
extern crate tracing_subscriber;

use std::fs::File;
use std::io::{BufReader, Write};
use std::time::Duration;

use anyhow::{anyhow, bail, Context, Result};
use radmap::{util, DirSource, FetchQueue, HeatGrid, HeatLayer, LayerEvent, MapView,
             MeasurementId, Surface, SurfaceSlot, ViewConfig};
use stopwatch::Stopwatch;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

const USAGE: &str = "Usage: radmap <batch.json> [out-prefix] [--select <id>]... [--spectra <dir>]";

/// Surface that renders the attached heat layer to `<prefix>_heat.png`.
struct PngSurface {
    prefix: String,
    resolution: (usize, usize),
    next: u64,
}

impl Surface for PngSurface {
    fn attach(&mut self, layer: &HeatLayer) -> SurfaceSlot {
        self.next += 1;
        let mut s = Stopwatch::start_new();
        let grid = HeatGrid::from_layer(layer, self.resolution, true);
        println!("{:?} pixel heat grid took {} ms", grid.size(), s.elapsed_ms());
        s.restart();
        let path = format!("{}_heat.png", self.prefix);
        match util::grid_to_img(grid.grid(), grid.size(), &path, Some((0.0, 1.0))) {
            Ok(()) => println!("Wrote {} in {} ms", path, s.elapsed_ms()),
            Err(e) => error!(%path, error = %e, "could not write heat image"),
        }
        SurfaceSlot::new(self.next)
    }

    fn release(&mut self, slot: SurfaceSlot) {
        info!(slot = slot.id(), "heat layer released");
    }
}

struct Args {
    batch: String,
    prefix: String,
    select: Vec<MeasurementId>,
    spectra: Option<String>,
}

fn parse_id(raw: &str) -> MeasurementId {
    raw.parse::<i64>().map(MeasurementId::Num).unwrap_or_else(|_| MeasurementId::from(raw))
}

fn parse_args(args: &[String]) -> Result<Args> {
    let mut positional = Vec::new();
    let mut select = Vec::new();
    let mut spectra = None;
    let mut idx = 1;
    while idx < args.len() {
        match args[idx].as_str() {
            "--select" => {
                idx += 1;
                let raw = args.get(idx).ok_or_else(|| anyhow!("--select requires a value"))?;
                select.push(parse_id(raw));
            }
            "--spectra" => {
                idx += 1;
                spectra = Some(args.get(idx).ok_or_else(|| anyhow!("--spectra requires a value"))?.clone());
            }
            "-h" | "--help" => bail!(USAGE),
            other => positional.push(other.to_owned()),
        }
        idx += 1;
    }
    let mut positional = positional.into_iter();
    let batch = positional.next().ok_or_else(|| anyhow!(USAGE))?;
    let prefix = positional.next().unwrap_or_else(|| "radmap".to_owned());
    Ok(Args {
        batch: batch,
        prefix: prefix,
        select: select,
        spectra: spectra,
    })
}

fn main() {
    if let Err(err) = run() {
        eprintln!("{:?}", err);
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let _ = tracing_subscriber::fmt().with_env_filter(EnvFilter::from_default_env()).try_init();
    let args = parse_args(&std::env::args().collect::<Vec<_>>())?;
    let config = ViewConfig::from_env();

    let mut s = Stopwatch::start_new();
    let file = File::open(&args.batch).with_context(|| format!("opening {}", args.batch))?;
    let batch = util::measurements_from_json(BufReader::new(file))
        .with_context(|| format!("reading {}", args.batch))?;
    println!("Parse took {} ms, found {} measurements", s.elapsed_ms(), batch.len());

    let surface = PngSurface {
        prefix: args.prefix.clone(),
        resolution: config.raster_resolution,
        next: 0,
    };
    let heat_layer = config.heat_layer_name.clone();
    let mut view = MapView::new(surface, config);
    view.load_batch(batch);
    match view.domain() {
        Some(d) => println!("Spectrum values span [{}, {}]", d.low, d.high),
        None => println!("Empty batch"),
    }
    let center = view.center();
    println!("Center: ({}, {})", center.lat, center.lng);

    let queue = args.spectra.as_ref().map(|dir| FetchQueue::new(DirSource::new(dir)));
    let mut pending = 0;
    for id in args.select {
        match view.on_select(id) {
            Some(req) => {
                if let Some(ref q) = queue {
                    q.submit(req);
                    pending += 1;
                }
            }
            None => println!("Not in batch, skipping selection"),
        }
    }
    if let Some(ref q) = queue {
        for _ in 0..pending {
            match q.wait(Duration::from_secs(30)) {
                Some((token, result)) => {
                    view.on_detail(token, result);
                }
                None => break,
            }
        }
        match view.detail().spectrum() {
            Some(spectrum) => {
                let peak = spectrum.channels()
                    .fold(None, |best: Option<(usize, f64)>, (c, v)| match best {
                        Some((_, bv)) if bv >= v => best,
                        _ => Some((c, v)),
                    });
                println!("Spectrum: {} channels, peak {:?}", spectrum.len(), peak);
            }
            None => println!("Detail: {:?}", view.detail().status()),
        }
    }

    s.restart();
    let path = format!("{}_markers.geojson", args.prefix);
    let mut out = File::create(&path).with_context(|| format!("creating {}", path))?;
    out.write_all(util::markers_to_geojson(&view.markers()).to_string().as_bytes())?;
    println!("Wrote {} in {} ms", path, s.elapsed_ms());

    view.push_layer_event(LayerEvent::OverlayAdd(heat_layer));
    view.pump_events();
    view.teardown();
    Ok(())
}

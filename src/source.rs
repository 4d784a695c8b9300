//! Where batches and spectra come from.
//!
//! The map only consumes these through [`BatchSource`] and [`SpectrumSource`]. [`DirSource`]
//! serves both from a directory laid out like the data API (`data/<flight>.json`,
//! `spectrum/<id>.json`), and [`FetchQueue`] runs spectrum fetches in the background so responses
//! come back in whatever order they finish.

use std::fs::File;
use std::io::BufReader;
use std::path::{Path, PathBuf};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender, TryRecvError};
use std::sync::Arc;
use std::time::Duration;

use tracing::{debug, warn};

use crate::error::{Error, Result};
use crate::selection::{DetailRequest, RequestToken};
use crate::types::{Measurement, MeasurementId, Spectrum};
use crate::util::measurements_from_json;

/// Measurements of one flight, in the order they were recorded.
pub trait BatchSource {
    fn load(&self, flight: &str) -> Result<Vec<Measurement>>;
}

/// Per-channel spectrum of one measurement.
pub trait SpectrumSource {
    fn spectrum(&self, id: &MeasurementId) -> Result<Spectrum>;
}

impl<'a, T: BatchSource + ?Sized> BatchSource for &'a T {
    fn load(&self, flight: &str) -> Result<Vec<Measurement>> {
        (**self).load(flight)
    }
}

fn plain_name(name: &str) -> bool {
    !name.is_empty() && !name.contains(|c: char| c == '/' || c == '\\') && name != ".." && name != "."
}

/// File-backed source rooted at a directory.
#[derive(Debug, Clone)]
pub struct DirSource {
    root: PathBuf,
}

impl DirSource {
    pub fn new<P: AsRef<Path>>(root: P) -> DirSource {
        DirSource { root: root.as_ref().to_path_buf() }
    }

    pub fn batch_path(&self, flight: &str) -> PathBuf {
        self.root.join("data").join(format!("{}.json", flight))
    }

    pub fn spectrum_path(&self, id: &MeasurementId) -> PathBuf {
        self.root.join("spectrum").join(format!("{}.json", id))
    }
}

impl BatchSource for DirSource {
    fn load(&self, flight: &str) -> Result<Vec<Measurement>> {
        let fail = |reason: String| {
            Error::BatchLoad {
                flight: flight.to_owned(),
                reason: reason,
            }
        };
        if !plain_name(flight) {
            return Err(fail("not a plain flight name".to_owned()));
        }
        let path = self.batch_path(flight);
        let file = File::open(&path).map_err(|e| fail(format!("{}: {}", path.display(), e)))?;
        let batch = measurements_from_json(BufReader::new(file)).map_err(|e| fail(e.to_string()))?;
        debug!(flight, count = batch.len(), "batch read");
        Ok(batch)
    }
}

impl SpectrumSource for DirSource {
    fn spectrum(&self, id: &MeasurementId) -> Result<Spectrum> {
        let fail = |reason: String| {
            Error::Fetch {
                id: id.clone(),
                reason: reason,
            }
        };
        if !plain_name(&id.to_string()) {
            return Err(fail("not a plain measurement id".to_owned()));
        }
        let path = self.spectrum_path(id);
        let file = File::open(&path).map_err(|e| fail(format!("{}: {}", path.display(), e)))?;
        ::serde_json::from_reader(BufReader::new(file)).map_err(|e| fail(e.to_string()))
    }
}

/// A finished fetch.
pub type Completed = (RequestToken, Result<Spectrum>);

/// Runs spectrum fetches on the rayon pool and collects the responses.
pub struct FetchQueue<S> {
    source: Arc<S>,
    tx: Sender<Completed>,
    rx: Receiver<Completed>,
}

impl<S: SpectrumSource + Send + Sync + 'static> FetchQueue<S> {
    pub fn new(source: S) -> FetchQueue<S> {
        let (tx, rx) = mpsc::channel();
        FetchQueue {
            source: Arc::new(source),
            tx: tx,
            rx: rx,
        }
    }

    /// Start fetching in the background.
    pub fn submit(&self, request: DetailRequest) {
        let source = self.source.clone();
        let tx = self.tx.clone();
        rayon::spawn(move || {
            let result = source.spectrum(&request.id);
            if tx.send((request.token, result)).is_err() {
                debug!(id = %request.id, "fetch queue gone, dropping response");
            }
        });
    }

    /// Responses that have arrived so far, in arrival order.
    pub fn drain(&self) -> Vec<Completed> {
        let mut done = Vec::new();
        loop {
            match self.rx.try_recv() {
                Ok(c) => done.push(c),
                Err(TryRecvError::Empty) |
                Err(TryRecvError::Disconnected) => break,
            }
        }
        done
    }

    /// Block until the next response arrives, up to `timeout`.
    pub fn wait(&self, timeout: Duration) -> Option<Completed> {
        match self.rx.recv_timeout(timeout) {
            Ok(c) => Some(c),
            Err(RecvTimeoutError::Timeout) => None,
            Err(RecvTimeoutError::Disconnected) => {
                warn!("fetch queue disconnected");
                None
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::selection::DetailTracker;
    use std::fs;
    use std::io::Write;

    fn scratch(name: &str) -> PathBuf {
        let dir = ::std::env::temp_dir().join(format!("radmap-{}-{}", name, ::std::process::id()));
        let _ = fs::remove_dir_all(&dir);
        fs::create_dir_all(dir.join("data")).unwrap();
        fs::create_dir_all(dir.join("spectrum")).unwrap();
        dir
    }

    fn write(path: PathBuf, body: &str) {
        fs::File::create(path).unwrap().write_all(body.as_bytes()).unwrap();
    }

    #[test]
    fn dir_source_reads_batch_and_spectrum() {
        let dir = scratch("read");
        write(dir.join("data").join("f1.json"),
              r#"[{"id": 1, "lat": 10, "lon": 20, "spectrumValue": 1},
                  {"id": 2, "lat": 30, "lon": 40, "spectrumValue": 5}]"#);
        write(dir.join("spectrum").join("2.json"), r#"{"spectrum": [0, 4, 9]}"#);
        let src = DirSource::new(&dir);

        let batch = src.load("f1").unwrap();
        assert_eq!(batch.len(), 2);
        let s = src.spectrum(&MeasurementId::Num(2)).unwrap();
        assert_eq!(s.spectrum, vec![0.0, 4.0, 9.0]);
        let _ = fs::remove_dir_all(&dir);
    }

    #[test]
    fn dir_source_failures_are_typed() {
        let dir = scratch("fail");
        let src = DirSource::new(&dir);
        match src.load("missing") {
            Err(Error::BatchLoad { ref flight, .. }) => assert_eq!(flight, "missing"),
            other => panic!("unexpected {:?}", other),
        }
        match src.load("../etc") {
            Err(Error::BatchLoad { .. }) => (),
            other => panic!("unexpected {:?}", other),
        }
        match src.spectrum(&MeasurementId::from("nope")) {
            Err(Error::Fetch { ref id, .. }) => assert_eq!(*id, MeasurementId::from("nope")),
            other => panic!("unexpected {:?}", other),
        }
        let _ = fs::remove_dir_all(&dir);
    }

    struct Echo;

    impl SpectrumSource for Echo {
        fn spectrum(&self, id: &MeasurementId) -> Result<Spectrum> {
            match *id {
                MeasurementId::Num(n) => Ok(Spectrum::new(vec![n as f64])),
                MeasurementId::Text(_) => {
                    Err(Error::Fetch {
                        id: id.clone(),
                        reason: "no such point".to_owned(),
                    })
                }
            }
        }
    }

    #[test]
    fn fetch_queue_feeds_tracker() {
        let queue = FetchQueue::new(Echo);
        let mut detail = DetailTracker::new();
        queue.submit(detail.request(MeasurementId::Num(1)));
        let latest = detail.request(MeasurementId::Num(2));
        queue.submit(latest.clone());

        let mut applied = 0;
        for _ in 0..2 {
            let (token, result) = queue.wait(Duration::from_secs(10)).unwrap();
            if detail.resolve(token, result) {
                applied += 1;
            }
        }
        assert_eq!(applied, 1);
        assert_eq!(detail.spectrum(), Some(&Spectrum::new(vec![2.0])));
        assert!(queue.drain().is_empty());
    }
}

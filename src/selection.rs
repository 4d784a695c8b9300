//! Highlighted points and the detail view of the most recently requested one.

use std::collections::HashSet;

use tracing::{debug, warn};

use crate::error::Result;
use crate::types::{MeasurementId, Spectrum};

/// Points currently highlighted. Selecting accumulates; nothing is deselected implicitly.
#[derive(Debug, Clone, Default)]
pub struct SelectionSet {
    ids: HashSet<MeasurementId>,
}

impl SelectionSet {
    pub fn new() -> SelectionSet {
        SelectionSet::default()
    }

    /// Returns false if `id` was already selected.
    pub fn select(&mut self, id: MeasurementId) -> bool {
        self.ids.insert(id)
    }

    pub fn is_selected(&self, id: &MeasurementId) -> bool {
        self.ids.contains(id)
    }

    pub fn clear(&mut self) {
        self.ids.clear()
    }

    pub fn len(&self) -> usize {
        self.ids.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }
}

/// Monotonic token identifying one detail request.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RequestToken(u64);

impl RequestToken {
    pub fn value(&self) -> u64 {
        self.0
    }
}

/// What the caller should go and fetch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DetailRequest {
    pub token: RequestToken,
    pub id: MeasurementId,
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailStatus {
    Idle,
    Loading { id: MeasurementId },
    Ready { id: MeasurementId, spectrum: Spectrum },
    Failed { id: MeasurementId, reason: String },
}

/// Detail view state. Responses may arrive in any order; only the one answering the latest
/// request is shown.
#[derive(Debug, Clone)]
pub struct DetailTracker {
    issued: u64,
    pending: Option<RequestToken>,
    status: DetailStatus,
}

impl Default for DetailTracker {
    fn default() -> DetailTracker {
        DetailTracker {
            issued: 0,
            pending: None,
            status: DetailStatus::Idle,
        }
    }
}

impl DetailTracker {
    pub fn new() -> DetailTracker {
        DetailTracker::default()
    }

    /// Start loading detail for `id`, superseding any request in flight.
    pub fn request(&mut self, id: MeasurementId) -> DetailRequest {
        self.issued += 1;
        let token = RequestToken(self.issued);
        self.pending = Some(token);
        self.status = DetailStatus::Loading { id: id.clone() };
        debug!(token = token.0, %id, "detail requested");
        DetailRequest {
            token: token,
            id: id,
        }
    }

    /// Apply a response. Returns false, leaving the view untouched, when `token` is not the
    /// latest request.
    pub fn resolve(&mut self, token: RequestToken, result: Result<Spectrum>) -> bool {
        if self.pending != Some(token) {
            warn!(token = token.0,
                  latest = self.issued,
                  "discarding stale detail response");
            return false;
        }
        self.pending = None;
        let id = match self.status {
            DetailStatus::Loading { ref id } => id.clone(),
            _ => return false,
        };
        self.status = match result {
            Ok(spectrum) => {
                debug!(%id, channels = spectrum.len(), "detail ready");
                DetailStatus::Ready {
                    id: id,
                    spectrum: spectrum,
                }
            }
            Err(e) => {
                warn!(%id, error = %e, "detail fetch failed");
                DetailStatus::Failed {
                    id: id,
                    reason: e.to_string(),
                }
            }
        };
        true
    }

    /// Forget the current detail. Responses to anything requested before are discarded.
    pub fn reset(&mut self) {
        self.pending = None;
        self.status = DetailStatus::Idle;
    }

    pub fn status(&self) -> &DetailStatus {
        &self.status
    }

    pub fn is_loading(&self) -> bool {
        match self.status {
            DetailStatus::Loading { .. } => true,
            _ => false,
        }
    }

    /// The displayed spectrum, if one is ready.
    pub fn spectrum(&self) -> Option<&Spectrum> {
        match self.status {
            DetailStatus::Ready { ref spectrum, .. } => Some(spectrum),
            _ => None,
        }
    }

    pub fn pending(&self) -> Option<RequestToken> {
        self.pending
    }
}

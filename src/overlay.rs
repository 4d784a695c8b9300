//! Heat overlay lifecycle.
//!
//! The rendering surface reports layer visibility toggles as [`LayerEvent`]s. They are queued in
//! arrival order and consumed by [`OverlayLifecycle::pump`], which builds the [`HeatLayer`] on the
//! first add, attaches it to the surface, detaches it on remove and reattaches the cached layer on
//! later adds. The lifecycle owns the one [`SurfaceSlot`] that can exist per view, and releases it
//! on teardown or drop whether or not a remove event ever arrived.

use std::collections::VecDeque;
use std::rc::Rc;

use tracing::debug;

use crate::heat::{heat_samples, HeatLayer};
use crate::types::{Measurement, ValueDomain};

/// Handle to a layer attached to a surface. Not `Clone`: whoever holds it is responsible for
/// handing it back through [`Surface::release`].
#[derive(Debug, PartialEq, Eq, Hash)]
pub struct SurfaceSlot(u64);

impl SurfaceSlot {
    pub fn new(id: u64) -> SurfaceSlot {
        SurfaceSlot(id)
    }

    pub fn id(&self) -> u64 {
        self.0
    }
}

/// Whatever draws the map. Only the heat layer attachment goes through here.
pub trait Surface {
    fn attach(&mut self, layer: &HeatLayer) -> SurfaceSlot;
    fn release(&mut self, slot: SurfaceSlot);
}

impl<'a, S: Surface + ?Sized> Surface for &'a mut S {
    fn attach(&mut self, layer: &HeatLayer) -> SurfaceSlot {
        (**self).attach(layer)
    }
    fn release(&mut self, slot: SurfaceSlot) {
        (**self).release(slot)
    }
}

/// Layer visibility toggle, by layer name.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LayerEvent {
    OverlayAdd(String),
    OverlayRemove(String),
}

impl LayerEvent {
    pub fn name(&self) -> &str {
        match *self {
            LayerEvent::OverlayAdd(ref n) |
            LayerEvent::OverlayRemove(ref n) => n,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OverlayState {
    /// Nothing built yet, or the cache was invalidated.
    Absent,
    /// Deriving samples from the current source.
    Constructing,
    Attached,
    /// Built and cached, but not on the surface.
    Detached,
}

struct HeatSource {
    measurements: Rc<Vec<Measurement>>,
    domain: Option<ValueDomain>,
    generation: u64,
}

pub struct OverlayLifecycle<S: Surface> {
    surface: S,
    layer_name: String,
    radius: u32,
    source: Option<HeatSource>,
    cached: Option<HeatLayer>,
    slot: Option<SurfaceSlot>,
    state: OverlayState,
    queue: VecDeque<LayerEvent>,
    listening: bool,
    constructions: usize,
}

impl<S: Surface> OverlayLifecycle<S> {
    /// Start listening for toggles of `layer_name`. Events for any other layer are ignored.
    pub fn new<N: Into<String>>(surface: S, layer_name: N, radius: u32) -> OverlayLifecycle<S> {
        OverlayLifecycle {
            surface: surface,
            layer_name: layer_name.into(),
            radius: radius,
            source: None,
            cached: None,
            slot: None,
            state: OverlayState::Absent,
            queue: VecDeque::new(),
            listening: true,
            constructions: 0,
        }
    }

    pub fn state(&self) -> OverlayState {
        self.state
    }

    /// How many times a heat layer was built.
    pub fn constructions(&self) -> usize {
        self.constructions
    }

    pub fn is_attached(&self) -> bool {
        self.slot.is_some()
    }

    pub fn is_listening(&self) -> bool {
        self.listening
    }

    pub fn layer_name(&self) -> &str {
        &self.layer_name
    }

    /// The cached layer, attached or not.
    pub fn layer(&self) -> Option<&HeatLayer> {
        self.cached.as_ref()
    }

    pub fn surface(&self) -> &S {
        &self.surface
    }

    /// Swap in the measurements the layer is derived from. An attached layer is rebuilt and
    /// reattached right away; a detached one is rebuilt on the next add.
    pub fn set_source(&mut self,
                      measurements: Rc<Vec<Measurement>>,
                      domain: Option<ValueDomain>,
                      generation: u64) {
        self.source = Some(HeatSource {
            measurements: measurements,
            domain: domain,
            generation: generation,
        });
        if self.state == OverlayState::Attached && !self.cache_is_current() {
            self.release_slot();
            self.attach();
        }
    }

    /// Take the overlay off the surface and drop the cached layer.
    pub fn invalidate(&mut self) {
        self.release_slot();
        self.cached = None;
        self.state = OverlayState::Absent;
        debug!(layer = %self.layer_name, "heat overlay invalidated");
    }

    /// Queue a toggle. Ignored once torn down.
    pub fn push(&mut self, event: LayerEvent) {
        if self.listening {
            self.queue.push_back(event);
        } else {
            debug!(?event, "overlay torn down, dropping event");
        }
    }

    /// Handle queued toggles in arrival order. Returns how many were consumed.
    pub fn pump(&mut self) -> usize {
        let mut handled = 0;
        while let Some(event) = self.queue.pop_front() {
            self.handle(event);
            handled += 1;
        }
        handled
    }

    /// Stop listening, then release the surface slot and the cached layer. Safe to call twice.
    pub fn teardown(&mut self) {
        if self.listening {
            self.listening = false;
            let dropped = self.queue.len();
            self.queue.clear();
            if dropped > 0 {
                debug!(dropped, "discarded pending overlay events on teardown");
            }
        }
        self.release_slot();
        self.cached = None;
        self.state = OverlayState::Absent;
    }

    fn handle(&mut self, event: LayerEvent) {
        if event.name() != self.layer_name {
            debug!(?event, "ignoring toggle of another layer");
            return;
        }
        match (event, self.state) {
            (LayerEvent::OverlayAdd(_), OverlayState::Attached) => {
                debug!("heat overlay already attached");
            }
            (LayerEvent::OverlayAdd(_), _) => self.attach(),
            (LayerEvent::OverlayRemove(_), OverlayState::Attached) => {
                self.release_slot();
                self.state = OverlayState::Detached;
            }
            (LayerEvent::OverlayRemove(_), state) => {
                debug!(?state, "remove for an overlay that is not attached");
            }
        }
    }

    fn cache_is_current(&self) -> bool {
        match (&self.cached, &self.source) {
            (&Some(ref layer), &Some(ref src)) => layer.generation() == src.generation,
            (&Some(ref layer), &None) => layer.generation() == 0,
            (&None, _) => false,
        }
    }

    fn attach(&mut self) {
        if !self.cache_is_current() {
            self.state = OverlayState::Constructing;
            self.cached = Some(self.build());
        }
        if let Some(ref layer) = self.cached {
            let slot = self.surface.attach(layer);
            debug!(slot = slot.id(), samples = layer.samples().len(), "heat overlay attached");
            self.slot = Some(slot);
            self.state = OverlayState::Attached;
        }
    }

    fn build(&mut self) -> HeatLayer {
        self.constructions += 1;
        match self.source {
            Some(ref src) => {
                let samples = match src.domain {
                    Some(domain) => heat_samples(&src.measurements, domain),
                    None => Vec::new(),
                };
                HeatLayer::new(samples, self.radius, src.generation)
            }
            None => HeatLayer::new(Vec::new(), self.radius, 0),
        }
    }

    fn release_slot(&mut self) {
        if let Some(slot) = self.slot.take() {
            debug!(slot = slot.id(), "heat overlay released");
            self.surface.release(slot);
        }
        if self.state == OverlayState::Attached {
            self.state = if self.cached.is_some() {
                OverlayState::Detached
            } else {
                OverlayState::Absent
            };
        }
    }
}

impl<S: Surface> Drop for OverlayLifecycle<S> {
    fn drop(&mut self) {
        self.teardown();
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use std::collections::HashSet;

    /// Surface that tracks live slots.
    #[derive(Default)]
    pub struct RecordingSurface {
        next: u64,
        pub live: HashSet<u64>,
        pub attaches: usize,
        pub releases: usize,
    }

    impl Surface for RecordingSurface {
        fn attach(&mut self, _layer: &HeatLayer) -> SurfaceSlot {
            self.next += 1;
            self.attaches += 1;
            self.live.insert(self.next);
            SurfaceSlot::new(self.next)
        }
        fn release(&mut self, slot: SurfaceSlot) {
            self.releases += 1;
            assert!(self.live.remove(&slot.id()), "slot {} released twice", slot.id());
        }
    }

    const HEAT: &str = "Heat map";

    fn add() -> LayerEvent {
        LayerEvent::OverlayAdd(HEAT.to_owned())
    }

    fn remove() -> LayerEvent {
        LayerEvent::OverlayRemove(HEAT.to_owned())
    }

    fn source() -> Rc<Vec<Measurement>> {
        Rc::new(vec![Measurement::new(1, 10.0, 20.0, 1.0), Measurement::new(2, 30.0, 40.0, 5.0)])
    }

    #[test]
    fn add_twice_attaches_once() {
        let mut surface = RecordingSurface::default();
        {
            let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
            overlay.set_source(source(), Some(ValueDomain::new(1.0, 5.0)), 1);
            overlay.push(add());
            overlay.push(add());
            assert_eq!(overlay.pump(), 2);
            assert_eq!(overlay.state(), OverlayState::Attached);
            assert_eq!(overlay.surface().live.len(), 1);
            assert_eq!(overlay.constructions(), 1);
            assert_eq!(overlay.layer().unwrap().samples().len(), 2);
        }
        assert_eq!(surface.attaches, 1);
        assert!(surface.live.is_empty());
    }

    #[test]
    fn readd_reuses_cached_layer() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.set_source(source(), Some(ValueDomain::new(1.0, 5.0)), 1);
        overlay.push(add());
        overlay.push(remove());
        overlay.pump();
        assert_eq!(overlay.state(), OverlayState::Detached);
        assert!(overlay.surface().live.is_empty());
        overlay.push(add());
        overlay.pump();
        assert_eq!(overlay.state(), OverlayState::Attached);
        assert_eq!(overlay.constructions(), 1);
        assert_eq!(overlay.surface().attaches, 2);
    }

    #[test]
    fn teardown_without_remove_leaks_nothing() {
        let mut surface = RecordingSurface::default();
        {
            let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
            overlay.push(add());
            overlay.pump();
            assert!(overlay.is_attached());
        }
        assert_eq!(surface.attaches, 1);
        assert_eq!(surface.releases, 1);
        assert!(surface.live.is_empty());
    }

    #[test]
    fn explicit_teardown_stops_listening() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.push(add());
        overlay.pump();
        overlay.push(remove());
        overlay.teardown();
        assert!(!overlay.is_listening());
        assert_eq!(overlay.state(), OverlayState::Absent);
        overlay.push(add());
        assert_eq!(overlay.pump(), 0);
        overlay.teardown();
        assert!(overlay.surface().live.is_empty());
        assert_eq!(overlay.surface().releases, 1);
    }

    #[test]
    fn other_layers_are_ignored() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.push(LayerEvent::OverlayAdd("Points".to_owned()));
        overlay.push(LayerEvent::OverlayRemove("Points".to_owned()));
        overlay.push(remove());
        assert_eq!(overlay.pump(), 3);
        assert_eq!(overlay.state(), OverlayState::Absent);
        assert_eq!(overlay.constructions(), 0);
    }

    #[test]
    fn events_apply_in_order() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.push(remove());
        overlay.push(add());
        overlay.pump();
        assert_eq!(overlay.state(), OverlayState::Attached);
        overlay.push(add());
        overlay.push(remove());
        overlay.pump();
        assert_eq!(overlay.state(), OverlayState::Detached);
    }

    #[test]
    fn new_source_rebuilds_attached_layer() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.set_source(source(), Some(ValueDomain::new(1.0, 5.0)), 1);
        overlay.push(add());
        overlay.pump();
        let next = Rc::new(vec![Measurement::new(9, 50.0, 50.0, 3.0)]);
        overlay.set_source(next, Some(ValueDomain::new(3.0, 3.0)), 2);
        assert_eq!(overlay.state(), OverlayState::Attached);
        assert_eq!(overlay.constructions(), 2);
        assert_eq!(overlay.layer().unwrap().generation(), 2);
        assert_eq!(overlay.surface().live.len(), 1);
        assert_eq!(overlay.surface().releases, 1);
    }

    #[test]
    fn detached_layer_rebuilds_on_next_add_after_change() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.set_source(source(), Some(ValueDomain::new(1.0, 5.0)), 1);
        overlay.push(add());
        overlay.push(remove());
        overlay.pump();
        overlay.set_source(source(), Some(ValueDomain::new(1.0, 5.0)), 2);
        assert_eq!(overlay.constructions(), 1);
        overlay.push(add());
        overlay.pump();
        assert_eq!(overlay.constructions(), 2);
    }

    #[test]
    fn invalidate_releases_and_forgets() {
        let mut surface = RecordingSurface::default();
        let mut overlay = OverlayLifecycle::new(&mut surface, HEAT, 15);
        overlay.set_source(source(), Some(ValueDomain::new(1.0, 5.0)), 1);
        overlay.push(add());
        overlay.pump();
        overlay.invalidate();
        assert_eq!(overlay.state(), OverlayState::Absent);
        assert!(overlay.layer().is_none());
        assert!(overlay.surface().live.is_empty());
        overlay.push(add());
        overlay.pump();
        assert_eq!(overlay.constructions(), 2);
    }
}

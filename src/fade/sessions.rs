//! Keyed collection of output and seat sessions.

use std::collections::btree_map::Entry;
use std::collections::BTreeMap;
use std::rc::Rc;

use super::{OutputSession, OverlayProxy, RunState, SeatDevices, SeatSession};

/// Which kind of session a removed global belonged to.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Removed {
    Output,
    Seat,
}

/// All live sessions, keyed by registry global name.
///
/// Sessions only enter and leave through the methods here, and leaving always runs the
/// session's destruction path exactly once.
pub struct Sessions<P: OverlayProxy, D: SeatDevices> {
    run: Rc<RunState>,
    outputs: BTreeMap<u32, OutputSession<P>>,
    seats: BTreeMap<u32, SeatSession<D>>,
}

impl<P: OverlayProxy, D: SeatDevices> Sessions<P, D> {
    pub fn new(run: Rc<RunState>) -> Self {
        Self {
            run,
            outputs: BTreeMap::new(),
            seats: BTreeMap::new(),
        }
    }

    pub fn add_output(&mut self, global_name: u32, proxy: P) -> &mut OutputSession<P> {
        debug!("output {global_name}: added");

        let session = OutputSession::new(global_name, proxy, self.run.clone());
        match self.outputs.entry(global_name) {
            Entry::Vacant(entry) => entry.insert(session),
            Entry::Occupied(mut entry) => {
                warn!("output {global_name}: announced twice, dropping the old one");
                entry.insert(session).destroy();
                entry.into_mut()
            }
        }
    }

    pub fn add_seat(&mut self, global_name: u32, devices: D) -> &mut SeatSession<D> {
        debug!("seat {global_name}: added");

        let session = SeatSession::new(global_name, devices, self.run.clone());
        match self.seats.entry(global_name) {
            Entry::Vacant(entry) => entry.insert(session),
            Entry::Occupied(mut entry) => {
                warn!("seat {global_name}: announced twice, dropping the old one");
                entry.insert(session).destroy();
                entry.into_mut()
            }
        }
    }

    pub fn output_mut(&mut self, global_name: u32) -> Option<&mut OutputSession<P>> {
        self.outputs.get_mut(&global_name)
    }

    pub fn seat_mut(&mut self, global_name: u32) -> Option<&mut SeatSession<D>> {
        self.seats.get_mut(&global_name)
    }

    pub fn outputs(&self) -> impl Iterator<Item = &OutputSession<P>> {
        self.outputs.values()
    }

    pub fn seats(&self) -> impl Iterator<Item = &SeatSession<D>> {
        self.seats.values()
    }

    /// Creates the overlay of every output that doesn't have one yet.
    pub fn create_overlays(&mut self, services: &P::Services) {
        for output in self.outputs.values_mut() {
            output.create_overlay(services);
        }
    }

    /// Destroys the session bound to `global_name`, if any.
    pub fn remove_global(&mut self, global_name: u32) -> Option<Removed> {
        let mut removed = None;

        if let Some(output) = self.outputs.remove(&global_name) {
            output.destroy();
            removed = Some(Removed::Output);
        }

        if let Some(seat) = self.seats.remove(&global_name) {
            if removed.is_some() {
                error!("global {global_name} matched both an output and a seat");
            }
            seat.destroy();
            removed = Some(Removed::Seat);
        }

        if removed.is_none() {
            trace!("global {global_name} removed, not tracked");
        }

        removed
    }

    /// Destroys an output whose overlay was closed by the compositor.
    ///
    /// Returns `false` if the output was already gone.
    pub fn close_output(&mut self, global_name: u32) -> bool {
        match self.outputs.remove(&global_name) {
            Some(output) => {
                debug!("output {global_name}: overlay closed by the compositor");
                output.destroy();
                true
            }
            None => false,
        }
    }

    /// Destroys every output, then every seat.
    pub fn destroy_all(&mut self) {
        for (_, output) in std::mem::take(&mut self.outputs) {
            output.destroy();
        }
        for (_, seat) in std::mem::take(&mut self.seats) {
            seat.destroy();
        }
    }
}

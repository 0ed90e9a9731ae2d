//! Protocol-independent fade state.
//!
//! This module holds the run state shared by every session, the progress and alpha math, and
//! the per-output and per-seat state machines. The state machines talk to the display protocol
//! only through the [`OverlayProxy`] and [`SeatDevices`] traits, which the `wayland` module
//! implements on top of real protocol objects.

mod output;
mod seat;
mod sessions;


use std::cell::Cell;

pub use output::{OutputPhase, OutputSession, OverlayProxy};
pub use seat::{Capabilities, InputEvent, SeatDevices, SeatSession};
pub use sessions::{Removed, Sessions};

/// Alpha of a fully opaque overlay.
pub const MAX_ALPHA: u32 = u32::MAX;

// =============================================================================
// Outcome
// =============================================================================

/// How a fade that ran to the end of its dispatch loop terminated.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// The overlays reached full opacity.
    Completed,
    /// User input was observed before the fade completed.
    Cancelled,
}

impl Outcome {
    pub fn exit_code(self) -> u8 {
        match self {
            Outcome::Completed => 0,
            Outcome::Cancelled => 2,
        }
    }
}

// =============================================================================
// RunState
// =============================================================================

/// Run state shared between the controller and every session.
///
/// `running` is one-shot: it turns on once in [`RunState::start`] and never comes back after
/// turning off. `cancelled` only ever goes from false to true.
#[derive(Debug)]
pub struct RunState {
    running: Cell<bool>,
    cancelled: Cell<bool>,
    delay_ms: i64,
    start_time_ms: Cell<Option<i64>>,
}

impl RunState {
    pub fn new(delay_ms: i64) -> Self {
        Self {
            running: Cell::new(false),
            cancelled: Cell::new(false),
            delay_ms,
            start_time_ms: Cell::new(None),
        }
    }

    /// Starts the fade at `now_ms`.
    ///
    /// Must be called once. Does not turn `running` on if input already cancelled the fade.
    pub fn start(&self, now_ms: i64) {
        debug_assert!(self.start_time_ms.get().is_none(), "fade started twice");
        if self.start_time_ms.get().is_some() {
            return;
        }

        self.start_time_ms.set(Some(now_ms));
        if !self.cancelled.get() {
            self.running.set(true);
        }
    }

    pub fn is_running(&self) -> bool {
        self.running.get()
    }

    pub fn is_cancelled(&self) -> bool {
        self.cancelled.get()
    }

    pub fn start_time_ms(&self) -> Option<i64> {
        self.start_time_ms.get()
    }

    /// Marks the fade as complete.
    pub fn finish(&self) {
        self.running.set(false);
    }

    /// Stops the fade because of user input. Can be called any number of times.
    pub fn cancel(&self) {
        self.cancelled.set(true);
        self.running.set(false);
    }

    /// Returns the fraction of the delay elapsed at `now_ms`.
    pub fn progress(&self, now_ms: i64) -> f64 {
        let start = self.start_time_ms.get().unwrap_or(now_ms);
        progress(now_ms.saturating_sub(start), self.delay_ms)
    }

    pub fn outcome(&self) -> Outcome {
        if self.cancelled.get() {
            Outcome::Cancelled
        } else {
            Outcome::Completed
        }
    }
}

// =============================================================================
// Progress math
// =============================================================================

/// Returns `elapsed_ms / delay_ms`.
///
/// A non-positive delay counts as already expired.
pub fn progress(elapsed_ms: i64, delay_ms: i64) -> f64 {
    if delay_ms <= 0 {
        return f64::INFINITY;
    }

    elapsed_ms as f64 / delay_ms as f64
}

/// Converts a progress ratio into an overlay alpha.
pub fn alpha_for_progress(progress: f64) -> u32 {
    let progress = progress.clamp(0., 1.);
    (progress * f64::from(MAX_ALPHA)).round() as u32
}

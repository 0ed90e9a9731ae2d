//! Per-output overlay and its repaint state machine.

use std::rc::Rc;

use super::{alpha_for_progress, RunState};

/// Protocol objects backing one output's overlay.
///
/// Implementations own the output handle along with the overlay surface, its layer role, its
/// viewport and the outstanding frame callback.
pub trait OverlayProxy {
    /// Singleton services needed to create the overlay.
    type Services;

    /// Creates the overlay surface, sets up its layer role and sends the initial commit.
    fn create_overlay(&mut self, services: &Self::Services);

    /// Acknowledges a configure event.
    fn ack_configure(&mut self, serial: u32);

    /// Attaches a solid black buffer of `alpha`, scales it to `width`x`height`, requests a
    /// frame callback and commits.
    fn paint(&mut self, alpha: u32, width: u32, height: u32);

    /// Drops the frame callback that just fired.
    fn frame_done(&mut self);

    /// Destroys every owned protocol object, sub-objects first.
    fn destroy(self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum OutputPhase {
    /// The output is bound but has no overlay yet.
    Created,
    /// The overlay was committed and waits for its first configure.
    AwaitingConfigure,
    /// The overlay is being repainted on every frame callback.
    Painting,
    /// The fade is over for this output; no more frames are requested.
    Done,
}

pub struct OutputSession<P: OverlayProxy> {
    global_name: u32,
    proxy: P,
    run: Rc<RunState>,
    phase: OutputPhase,
    width: u32,
    height: u32,
    frame_pending: bool,
}

impl<P: OverlayProxy> OutputSession<P> {
    pub fn new(global_name: u32, proxy: P, run: Rc<RunState>) -> Self {
        Self {
            global_name,
            proxy,
            run,
            phase: OutputPhase::Created,
            width: 0,
            height: 0,
            frame_pending: false,
        }
    }

    pub fn global_name(&self) -> u32 {
        self.global_name
    }

    pub fn phase(&self) -> OutputPhase {
        self.phase
    }

    pub fn size(&self) -> (u32, u32) {
        (self.width, self.height)
    }

    pub fn frame_pending(&self) -> bool {
        self.frame_pending
    }

    /// Creates the overlay. Does nothing if it was already created.
    pub fn create_overlay(&mut self, services: &P::Services) {
        if self.phase != OutputPhase::Created {
            return;
        }

        self.proxy.create_overlay(services);
        self.phase = OutputPhase::AwaitingConfigure;
    }

    pub fn on_configure(&mut self, serial: u32, width: u32, height: u32, now_ms: i64) {
        if self.phase == OutputPhase::Created {
            warn!(
                "output {}: configure before the overlay exists, ignoring",
                self.global_name
            );
            return;
        }

        trace!(
            "output {}: configure {width}x{height}, serial {serial}",
            self.global_name
        );

        self.width = width;
        self.height = height;
        self.proxy.ack_configure(serial);

        match self.phase {
            OutputPhase::AwaitingConfigure => {
                self.phase = OutputPhase::Painting;
                self.repaint(now_ms);
            }
            // With a frame callback in flight, it will repaint with the new size.
            OutputPhase::Painting if !self.frame_pending => self.repaint(now_ms),
            _ => (),
        }
    }

    pub fn on_frame_done(&mut self, now_ms: i64) {
        if !self.frame_pending {
            warn!("output {}: unexpected frame callback", self.global_name);
            return;
        }

        self.frame_pending = false;
        self.proxy.frame_done();
        self.repaint(now_ms);
    }

    /// Paints the overlay for the progress at `now_ms`, or ends the fade if the delay is over.
    ///
    /// Progress is recomputed from the session start time every time, so late or missed frames
    /// don't stretch the total duration.
    pub fn repaint(&mut self, now_ms: i64) {
        if self.phase != OutputPhase::Painting || self.frame_pending {
            return;
        }

        if !self.run.is_running() {
            self.phase = OutputPhase::Done;
            return;
        }

        let progress = self.run.progress(now_ms);
        if progress >= 1. {
            debug!("output {}: fade complete", self.global_name);
            self.run.finish();
            self.phase = OutputPhase::Done;
            return;
        }

        let alpha = alpha_for_progress(progress);
        trace!("output {}: painting alpha {alpha}", self.global_name);

        self.proxy.paint(alpha, self.width, self.height);
        self.frame_pending = true;
    }

    pub fn destroy(self) {
        debug!("output {}: destroying", self.global_name);
        self.proxy.destroy();
    }
}

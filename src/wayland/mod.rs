//! Display protocol session.
//!
//! Connects to the compositor, binds the required globals, puts a layer-shell overlay on every
//! output and runs the event loop until the fade completes or user input cancels it.

mod output;
mod registry;
mod seat;

use std::rc::Rc;

use anyhow::{anyhow, Context};
use calloop::EventLoop;
use calloop_wayland_source::WaylandSource;
use wayland_client::protocol::wl_buffer::WlBuffer;
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{delegate_noop, Connection, QueueHandle};
use wayland_protocols::wp::single_pixel_buffer::v1::client::wp_single_pixel_buffer_manager_v1::WpSinglePixelBufferManagerV1;
use wayland_protocols::wp::viewporter::client::wp_viewport::WpViewport;
use wayland_protocols::wp::viewporter::client::wp_viewporter::WpViewporter;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1;

pub use self::output::WaylandOutput;
pub use self::registry::{GlobalKind, Globals, Services};
pub use self::seat::WaylandSeat;
use crate::fade::{Outcome, OverlayProxy, RunState, SeatDevices, Sessions};
use crate::utils::now_ms;

/// Event loop state.
pub struct State {
    run: Rc<RunState>,
    globals: Globals,
    /// Set once the initial roundtrip found every required global.
    services: Option<Rc<Services>>,
    sessions: Sessions<WaylandOutput, WaylandSeat>,
}

impl State {
    fn new(run: Rc<RunState>) -> Self {
        Self {
            sessions: Sessions::new(run.clone()),
            run,
            globals: Globals::default(),
            services: None,
        }
    }

    /// Dispatches event batches until the fade stops.
    fn dispatch(&mut self, event_loop: &mut EventLoop<'_, State>) -> anyhow::Result<()> {
        while self.run.is_running() {
            event_loop
                .dispatch(None, self)
                .context("error dispatching Wayland events")?;
        }
        Ok(())
    }
}

/// Fades every output to black over `delay_ms`.
///
/// Returns [`Outcome::Cancelled`] if user input arrived before the fade completed.
pub fn run(delay_ms: i64) -> anyhow::Result<Outcome> {
    let conn = Connection::connect_to_env().context("failed to connect to display")?;
    let mut event_queue = conn.new_event_queue();
    let qh: QueueHandle<State> = event_queue.handle();
    let _registry = conn.display().get_registry(&qh, ());

    let run = Rc::new(RunState::new(delay_ms));
    let mut state = State::new(run.clone());

    event_queue
        .roundtrip(&mut state)
        .context("initial roundtrip failed")?;

    let services = state.take_globals().into_services().map(Rc::new);
    let services = create_overlays(&mut state.sessions, services)?;
    state.set_services(services.clone());

    let mut event_loop = EventLoop::try_new().context("error creating event loop")?;
    WaylandSource::new(conn.clone(), event_queue)
        .insert(event_loop.handle())
        .map_err(|err| anyhow!("error inserting Wayland source: {}", err.error))?;

    debug!(
        "fading {} outputs over {delay_ms} ms",
        state.sessions.outputs().count()
    );
    run.start(now_ms());
    let res = state.dispatch(&mut event_loop);

    state.sessions.destroy_all();
    state.services = None;
    services.destroy();
    drop(event_loop);

    if let Err(err) = conn.flush() {
        debug!("error flushing the connection on shutdown: {err}");
    }

    res?;

    let outcome = run.outcome();
    debug!("fade finished: {outcome:?}");
    Ok(outcome)
}

/// Creates the overlays once the required services are known to be present.
///
/// On error no surface is created.
fn create_overlays<P: OverlayProxy, D: SeatDevices>(
    sessions: &mut Sessions<P, D>,
    services: anyhow::Result<P::Services>,
) -> anyhow::Result<P::Services> {
    let services = services?;
    sessions.create_overlays(&services);
    Ok(services)
}

delegate_noop!(State: WlCompositor);
delegate_noop!(State: ZwlrLayerShellV1);
delegate_noop!(State: WpViewporter);
delegate_noop!(State: WpViewport);
delegate_noop!(State: WpSinglePixelBufferManagerV1);
delegate_noop!(State: ignore WlOutput);
delegate_noop!(State: ignore WlSurface);
delegate_noop!(State: ignore WlBuffer);

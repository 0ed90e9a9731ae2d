//! Registry coordinator: binds singleton services and tracks outputs and seats.

use std::rc::Rc;

use anyhow::anyhow;
use wayland_client::protocol::wl_compositor::WlCompositor;
use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_registry::{self, WlRegistry};
use wayland_client::protocol::wl_seat::WlSeat;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle};
use wayland_protocols::wp::single_pixel_buffer::v1::client::wp_single_pixel_buffer_manager_v1::WpSinglePixelBufferManagerV1;
use wayland_protocols::wp::viewporter::client::wp_viewporter::WpViewporter;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::ZwlrLayerShellV1;

use super::output::WaylandOutput;
use super::seat::WaylandSeat;
use super::State;

const OUTPUT_MAX_VERSION: u32 = 4;
const SEAT_MAX_VERSION: u32 = 7;

// =============================================================================
// GlobalKind
// =============================================================================

/// Globals the coordinator cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalKind {
    Compositor,
    LayerShell,
    Viewporter,
    SinglePixelBufferManager,
    Output,
    Seat,
}

impl GlobalKind {
    pub fn from_interface(interface: &str) -> Option<Self> {
        let kind = match interface {
            "wl_compositor" => Self::Compositor,
            "zwlr_layer_shell_v1" => Self::LayerShell,
            "wp_viewporter" => Self::Viewporter,
            "wp_single_pixel_buffer_manager_v1" => Self::SinglePixelBufferManager,
            "wl_output" => Self::Output,
            "wl_seat" => Self::Seat,
            _ => return None,
        };
        Some(kind)
    }

    /// Returns the version to bind at, or `None` if `advertised` is too old.
    ///
    /// Singletons are bound at a fixed version. Outputs and seats are bound at the highest
    /// version we know, so that their destructor requests are available.
    pub fn bind_version(self, advertised: u32) -> Option<u32> {
        let (min, max) = match self {
            Self::Compositor => (4, 4),
            Self::LayerShell | Self::Viewporter | Self::SinglePixelBufferManager => (1, 1),
            Self::Output => (1, OUTPUT_MAX_VERSION),
            Self::Seat => (1, SEAT_MAX_VERSION),
        };

        (advertised >= min).then(|| advertised.min(max))
    }
}

// =============================================================================
// Globals and Services
// =============================================================================

/// Singleton services bound so far during the initial roundtrip.
#[derive(Default)]
pub struct Globals {
    compositor: Option<WlCompositor>,
    layer_shell: Option<ZwlrLayerShellV1>,
    viewporter: Option<WpViewporter>,
    single_pixel_buffer_manager: Option<WpSinglePixelBufferManagerV1>,
}

impl Globals {
    /// Checks that every required service was bound.
    pub fn into_services(self) -> anyhow::Result<Services> {
        Ok(Services {
            compositor: require(self.compositor, "wl_compositor")?,
            layer_shell: require(self.layer_shell, "zwlr_layer_shell_v1")?,
            viewporter: require(self.viewporter, "wp_viewporter")?,
            single_pixel_buffer_manager: require(
                self.single_pixel_buffer_manager,
                "wp_single_pixel_buffer_manager_v1",
            )?,
        })
    }
}

fn require<T>(global: Option<T>, interface: &str) -> anyhow::Result<T> {
    global.ok_or_else(|| anyhow!("missing {interface} global"))
}

/// Validated singleton services, shared by every output.
pub struct Services {
    pub compositor: WlCompositor,
    pub layer_shell: ZwlrLayerShellV1,
    pub viewporter: WpViewporter,
    pub single_pixel_buffer_manager: WpSinglePixelBufferManagerV1,
}

impl Services {
    pub fn destroy(&self) {
        // wl_compositor and zwlr_layer_shell_v1 v1 have no destructor request.
        self.viewporter.destroy();
        self.single_pixel_buffer_manager.destroy();
    }
}

// =============================================================================
// Registry events
// =============================================================================

/// What to do with an announced global.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GlobalAction {
    /// A singleton announced after start-up.
    Ignore,
    BindSingleton,
    /// The singleton is already bound; the first binding is kept.
    KeepFirst,
    AddOutput { create_overlay: bool },
    AddSeat,
}

/// Decides how to handle a global of `kind`.
///
/// `slot_filled` is whether that singleton is already bound, `services_ready` whether start-up
/// validation has already happened.
pub fn global_action(kind: GlobalKind, slot_filled: bool, services_ready: bool) -> GlobalAction {
    match kind {
        // Outputs connected during the fade get dimmed too.
        GlobalKind::Output => GlobalAction::AddOutput {
            create_overlay: services_ready,
        },
        GlobalKind::Seat => GlobalAction::AddSeat,
        _ if services_ready => GlobalAction::Ignore,
        _ if slot_filled => GlobalAction::KeepFirst,
        _ => GlobalAction::BindSingleton,
    }
}

impl Globals {
    fn is_bound(&self, kind: GlobalKind) -> bool {
        match kind {
            GlobalKind::Compositor => self.compositor.is_some(),
            GlobalKind::LayerShell => self.layer_shell.is_some(),
            GlobalKind::Viewporter => self.viewporter.is_some(),
            GlobalKind::SinglePixelBufferManager => self.single_pixel_buffer_manager.is_some(),
            GlobalKind::Output | GlobalKind::Seat => false,
        }
    }

    fn bind(
        &mut self,
        kind: GlobalKind,
        registry: &WlRegistry,
        name: u32,
        version: u32,
        qh: &QueueHandle<State>,
    ) {
        match kind {
            GlobalKind::Compositor => {
                self.compositor = Some(registry.bind(name, version, qh, ()));
            }
            GlobalKind::LayerShell => {
                self.layer_shell = Some(registry.bind(name, version, qh, ()));
            }
            GlobalKind::Viewporter => {
                self.viewporter = Some(registry.bind(name, version, qh, ()));
            }
            GlobalKind::SinglePixelBufferManager => {
                self.single_pixel_buffer_manager = Some(registry.bind(name, version, qh, ()));
            }
            GlobalKind::Output | GlobalKind::Seat => (),
        }
    }
}

impl State {
    fn on_global(
        &mut self,
        registry: &WlRegistry,
        name: u32,
        interface: &str,
        version: u32,
        qh: &QueueHandle<State>,
    ) {
        let Some(kind) = GlobalKind::from_interface(interface) else {
            return;
        };

        let Some(version) = kind.bind_version(version) else {
            warn!("{interface} v{version} is too old, not binding");
            return;
        };

        let action = global_action(kind, self.globals.is_bound(kind), self.services.is_some());
        match action {
            GlobalAction::Ignore => debug!("{interface} announced after start-up, ignoring"),
            GlobalAction::KeepFirst => warn!("{interface} announced twice, keeping the first one"),
            GlobalAction::BindSingleton => self.globals.bind(kind, registry, name, version, qh),
            GlobalAction::AddOutput { create_overlay } => {
                let output: WlOutput = registry.bind(name, version, qh, ());
                let proxy = WaylandOutput::new(name, output, qh.clone());
                let session = self.sessions.add_output(name, proxy);

                if let (true, Some(services)) = (create_overlay, &self.services) {
                    session.create_overlay(services);
                }
            }
            GlobalAction::AddSeat => {
                let seat: WlSeat = registry.bind(name, version, qh, name);
                self.sessions
                    .add_seat(name, WaylandSeat::new(name, seat, qh.clone()));
            }
        }
    }

    fn on_global_remove(&mut self, name: u32) {
        if let Some(removed) = self.sessions.remove_global(name) {
            debug!("global {name} ({removed:?}) removed");
        }
    }

    pub(super) fn take_globals(&mut self) -> Globals {
        std::mem::take(&mut self.globals)
    }

    pub(super) fn set_services(&mut self, services: Rc<Services>) {
        self.services = Some(services);
    }
}

impl Dispatch<WlRegistry, ()> for State {
    fn event(
        state: &mut Self,
        registry: &WlRegistry,
        event: wl_registry::Event,
        _data: &(),
        _conn: &Connection,
        qh: &QueueHandle<Self>,
    ) {
        match event {
            wl_registry::Event::Global {
                name,
                interface,
                version,
            } => state.on_global(registry, name, &interface, version, qh),
            wl_registry::Event::GlobalRemove { name } => state.on_global_remove(name),
            _ => (),
        }
    }
}

#[cfg(test)]
mod tests {
    use insta::assert_snapshot;

    use super::*;

    #[test]
    fn classifies_interfaces() {
        assert_eq!(
            GlobalKind::from_interface("wl_compositor"),
            Some(GlobalKind::Compositor)
        );
        assert_eq!(
            GlobalKind::from_interface("zwlr_layer_shell_v1"),
            Some(GlobalKind::LayerShell)
        );
        assert_eq!(
            GlobalKind::from_interface("wp_viewporter"),
            Some(GlobalKind::Viewporter)
        );
        assert_eq!(
            GlobalKind::from_interface("wp_single_pixel_buffer_manager_v1"),
            Some(GlobalKind::SinglePixelBufferManager)
        );
        assert_eq!(
            GlobalKind::from_interface("wl_output"),
            Some(GlobalKind::Output)
        );
        assert_eq!(GlobalKind::from_interface("wl_seat"), Some(GlobalKind::Seat));

        assert_eq!(GlobalKind::from_interface("wl_shm"), None);
        assert_eq!(GlobalKind::from_interface("wl_compositor_v2"), None);
        assert_eq!(GlobalKind::from_interface(""), None);
    }

    #[test]
    fn singletons_bind_at_fixed_version() {
        assert_eq!(GlobalKind::Compositor.bind_version(6), Some(4));
        assert_eq!(GlobalKind::Compositor.bind_version(4), Some(4));
        assert_eq!(GlobalKind::Compositor.bind_version(3), None);

        assert_eq!(GlobalKind::LayerShell.bind_version(5), Some(1));
        assert_eq!(GlobalKind::Viewporter.bind_version(1), Some(1));
        assert_eq!(GlobalKind::SinglePixelBufferManager.bind_version(1), Some(1));
    }

    #[test]
    fn outputs_and_seats_bind_at_highest_known_version() {
        assert_eq!(GlobalKind::Output.bind_version(2), Some(2));
        assert_eq!(GlobalKind::Output.bind_version(4), Some(4));
        assert_eq!(GlobalKind::Output.bind_version(9), Some(OUTPUT_MAX_VERSION));

        assert_eq!(GlobalKind::Seat.bind_version(1), Some(1));
        assert_eq!(GlobalKind::Seat.bind_version(10), Some(SEAT_MAX_VERSION));
        assert_eq!(GlobalKind::Seat.bind_version(0), None);
    }

    #[test]
    fn duplicate_singleton_keeps_first() {
        for kind in [
            GlobalKind::Compositor,
            GlobalKind::LayerShell,
            GlobalKind::Viewporter,
            GlobalKind::SinglePixelBufferManager,
        ] {
            assert_eq!(global_action(kind, false, false), GlobalAction::BindSingleton);
            assert_eq!(global_action(kind, true, false), GlobalAction::KeepFirst);
        }
    }

    #[test]
    fn late_singleton_is_ignored() {
        assert_eq!(
            global_action(GlobalKind::LayerShell, false, true),
            GlobalAction::Ignore
        );
        assert_eq!(
            global_action(GlobalKind::Compositor, true, true),
            GlobalAction::Ignore
        );
    }

    #[test]
    fn hot_plugged_output_gets_overlay() {
        assert_eq!(
            global_action(GlobalKind::Output, false, false),
            GlobalAction::AddOutput {
                create_overlay: false
            }
        );
        assert_eq!(
            global_action(GlobalKind::Output, false, true),
            GlobalAction::AddOutput {
                create_overlay: true
            }
        );
    }

    #[test]
    fn seats_are_always_added() {
        assert_eq!(global_action(GlobalKind::Seat, false, false), GlobalAction::AddSeat);
        assert_eq!(global_action(GlobalKind::Seat, false, true), GlobalAction::AddSeat);
    }

    #[test]
    fn missing_service_is_named() {
        let err = require::<u32>(None, "zwlr_layer_shell_v1").unwrap_err();
        assert_snapshot!(err.to_string(), @"missing zwlr_layer_shell_v1 global");

        assert_eq!(require(Some(7), "wl_compositor").unwrap(), 7);
    }

    #[test]
    fn empty_globals_report_compositor_first() {
        let err = Globals::default().into_services().err().unwrap();
        assert_snapshot!(err.to_string(), @"missing wl_compositor global");
    }
}

//! Layer-shell overlay on one `wl_output`.

use std::rc::Rc;

use wayland_client::protocol::wl_callback::{self, WlCallback};
use wayland_client::protocol::wl_output::WlOutput;
use wayland_client::protocol::wl_surface::WlSurface;
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle};
use wayland_protocols::wp::viewporter::client::wp_viewport::WpViewport;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_shell_v1::Layer;
use wayland_protocols_wlr::layer_shell::v1::client::zwlr_layer_surface_v1::{
    self, Anchor, KeyboardInteractivity, ZwlrLayerSurfaceV1,
};

use super::registry::Services;
use super::State;
use crate::fade::OverlayProxy;
use crate::utils::now_ms;

const LAYER_NAMESPACE: &str = "dim";

struct Overlay {
    services: Rc<Services>,
    surface: WlSurface,
    layer_surface: ZwlrLayerSurfaceV1,
    viewport: WpViewport,
    frame_callback: Option<WlCallback>,
}

pub struct WaylandOutput {
    global_name: u32,
    output: WlOutput,
    qh: QueueHandle<State>,
    overlay: Option<Overlay>,
}

impl WaylandOutput {
    pub fn new(global_name: u32, output: WlOutput, qh: QueueHandle<State>) -> Self {
        Self {
            global_name,
            output,
            qh,
            overlay: None,
        }
    }
}

impl OverlayProxy for WaylandOutput {
    type Services = Rc<Services>;

    fn create_overlay(&mut self, services: &Rc<Services>) {
        let qh = &self.qh;

        let surface = services.compositor.create_surface(qh, ());
        let layer_surface = services.layer_shell.get_layer_surface(
            &surface,
            Some(&self.output),
            Layer::Overlay,
            LAYER_NAMESPACE.to_owned(),
            qh,
            self.global_name,
        );
        let viewport = services.viewporter.get_viewport(&surface, qh, ());

        layer_surface.set_anchor(Anchor::Top | Anchor::Bottom | Anchor::Left | Anchor::Right);
        layer_surface.set_keyboard_interactivity(KeyboardInteractivity::Exclusive);
        layer_surface.set_exclusive_zone(-1);
        surface.commit();

        self.overlay = Some(Overlay {
            services: services.clone(),
            surface,
            layer_surface,
            viewport,
            frame_callback: None,
        });
    }

    fn ack_configure(&mut self, serial: u32) {
        if let Some(overlay) = &self.overlay {
            overlay.layer_surface.ack_configure(serial);
        }
    }

    fn paint(&mut self, alpha: u32, width: u32, height: u32) {
        let Some(overlay) = &mut self.overlay else {
            return;
        };

        let buffer = overlay
            .services
            .single_pixel_buffer_manager
            .create_u32_rgba_buffer(0, 0, 0, alpha, &self.qh, ());
        overlay.surface.attach(Some(&buffer), 0, 0);

        // A zero destination is a protocol error; -1 unsets it.
        match (i32::try_from(width), i32::try_from(height)) {
            (Ok(w), Ok(h)) if w > 0 && h > 0 => overlay.viewport.set_destination(w, h),
            _ => overlay.viewport.set_destination(-1, -1),
        }

        overlay.frame_callback = Some(overlay.surface.frame(&self.qh, self.global_name));

        overlay.surface.damage(0, 0, i32::MAX, i32::MAX);
        overlay.surface.commit();

        buffer.destroy();
    }

    fn frame_done(&mut self) {
        if let Some(overlay) = &mut self.overlay {
            overlay.frame_callback = None;
        }
    }

    fn destroy(self) {
        if let Some(overlay) = self.overlay {
            overlay.viewport.destroy();
            overlay.layer_surface.destroy();
            overlay.surface.destroy();
        }

        if self.output.version() >= 3 {
            self.output.release();
        }
    }
}

impl Dispatch<ZwlrLayerSurfaceV1, u32> for State {
    fn event(
        state: &mut Self,
        _layer_surface: &ZwlrLayerSurfaceV1,
        event: zwlr_layer_surface_v1::Event,
        global_name: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        match event {
            zwlr_layer_surface_v1::Event::Configure {
                serial,
                width,
                height,
            } => {
                if let Some(output) = state.sessions.output_mut(*global_name) {
                    output.on_configure(serial, width, height, now_ms());
                }
            }
            zwlr_layer_surface_v1::Event::Closed => {
                state.sessions.close_output(*global_name);
            }
            _ => (),
        }
    }
}

impl Dispatch<WlCallback, u32> for State {
    fn event(
        state: &mut Self,
        _callback: &WlCallback,
        event: wl_callback::Event,
        global_name: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_callback::Event::Done { .. } = event {
            if let Some(output) = state.sessions.output_mut(*global_name) {
                output.on_frame_done(now_ms());
            }
        }
    }
}

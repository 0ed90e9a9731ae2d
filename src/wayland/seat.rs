//! `wl_seat` and its pointer and keyboard.

use wayland_client::protocol::wl_keyboard::{self, KeyState, WlKeyboard};
use wayland_client::protocol::wl_pointer::{self, ButtonState, WlPointer};
use wayland_client::protocol::wl_seat::{self, WlSeat};
use wayland_client::{Connection, Dispatch, Proxy, QueueHandle, WEnum};

use super::State;
use crate::fade::{Capabilities, InputEvent, SeatDevices};

pub struct WaylandSeat {
    global_name: u32,
    seat: WlSeat,
    qh: QueueHandle<State>,
}

impl WaylandSeat {
    pub fn new(global_name: u32, seat: WlSeat, qh: QueueHandle<State>) -> Self {
        Self {
            global_name,
            seat,
            qh,
        }
    }
}

impl SeatDevices for WaylandSeat {
    type Pointer = WlPointer;
    type Keyboard = WlKeyboard;

    fn get_pointer(&mut self) -> WlPointer {
        self.seat.get_pointer(&self.qh, self.global_name)
    }

    fn get_keyboard(&mut self) -> WlKeyboard {
        self.seat.get_keyboard(&self.qh, self.global_name)
    }

    fn release_pointer(&mut self, pointer: WlPointer) {
        if pointer.version() >= 3 {
            pointer.release();
        }
    }

    fn release_keyboard(&mut self, keyboard: WlKeyboard) {
        if keyboard.version() >= 3 {
            keyboard.release();
        }
    }

    fn destroy(self) {
        if self.seat.version() >= 5 {
            self.seat.release();
        }
    }
}

fn capabilities(caps: WEnum<wl_seat::Capability>) -> Capabilities {
    let bits = match caps {
        WEnum::Value(caps) => caps.bits(),
        WEnum::Unknown(bits) => bits,
    };
    Capabilities::from_bits_truncate(bits)
}

fn pointer_event(event: wl_pointer::Event) -> Option<InputEvent> {
    let event = match event {
        wl_pointer::Event::Enter { .. } => InputEvent::PointerEnter,
        wl_pointer::Event::Leave { .. } => InputEvent::PointerLeave,
        wl_pointer::Event::Motion { .. } => InputEvent::PointerMotion,
        wl_pointer::Event::Button { state, .. } => InputEvent::PointerButton {
            pressed: state == WEnum::Value(ButtonState::Pressed),
        },
        wl_pointer::Event::Axis { .. } => InputEvent::PointerAxis,
        _ => return None,
    };
    Some(event)
}

fn keyboard_event(event: wl_keyboard::Event) -> Option<InputEvent> {
    let event = match event {
        wl_keyboard::Event::Keymap { fd, .. } => {
            // The keymap is unused, but the descriptor must not leak.
            drop(fd);
            InputEvent::KeyboardKeymap
        }
        wl_keyboard::Event::Enter { .. } => InputEvent::KeyboardEnter,
        wl_keyboard::Event::Leave { .. } => InputEvent::KeyboardLeave,
        wl_keyboard::Event::Modifiers { .. } => InputEvent::KeyboardModifiers,
        wl_keyboard::Event::Key { state, .. } => InputEvent::Key {
            pressed: state == WEnum::Value(KeyState::Pressed),
        },
        _ => return None,
    };
    Some(event)
}

impl Dispatch<WlSeat, u32> for State {
    fn event(
        state: &mut Self,
        _seat: &WlSeat,
        event: wl_seat::Event,
        global_name: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        if let wl_seat::Event::Capabilities { capabilities: caps } = event {
            if let Some(seat) = state.sessions.seat_mut(*global_name) {
                seat.on_capabilities(capabilities(caps));
            }
        }
    }
}

impl Dispatch<WlPointer, u32> for State {
    fn event(
        state: &mut Self,
        _pointer: &WlPointer,
        event: wl_pointer::Event,
        global_name: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let Some(event) = pointer_event(event) else {
            return;
        };
        if let Some(seat) = state.sessions.seat_mut(*global_name) {
            seat.on_input(event);
        }
    }
}

impl Dispatch<WlKeyboard, u32> for State {
    fn event(
        state: &mut Self,
        _keyboard: &WlKeyboard,
        event: wl_keyboard::Event,
        global_name: &u32,
        _conn: &Connection,
        _qh: &QueueHandle<Self>,
    ) {
        let Some(event) = keyboard_event(event) else {
            return;
        };
        if let Some(seat) = state.sessions.seat_mut(*global_name) {
            seat.on_input(event);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::fs::File;
    use std::io::Read;
    use std::os::fd::{FromRawFd, OwnedFd};

    use wayland_client::protocol::wl_keyboard::KeymapFormat;
    use wayland_client::protocol::wl_pointer::Axis;

    use super::*;

    fn button(state: WEnum<ButtonState>) -> Option<InputEvent> {
        pointer_event(wl_pointer::Event::Button {
            serial: 1,
            time: 2,
            button: 0x110,
            state,
        })
    }

    fn key(state: WEnum<KeyState>) -> Option<InputEvent> {
        keyboard_event(wl_keyboard::Event::Key {
            serial: 1,
            time: 2,
            key: 30,
            state,
        })
    }

    fn pipe() -> (OwnedFd, OwnedFd) {
        let mut fds = [0; 2];
        assert_eq!(unsafe { libc::pipe2(fds.as_mut_ptr(), libc::O_CLOEXEC) }, 0);
        unsafe { (OwnedFd::from_raw_fd(fds[0]), OwnedFd::from_raw_fd(fds[1])) }
    }

    #[test]
    fn known_capability_bits() {
        assert_eq!(
            capabilities(WEnum::Value(wl_seat::Capability::Pointer)),
            Capabilities::POINTER
        );
        assert_eq!(
            capabilities(WEnum::Value(
                wl_seat::Capability::Keyboard | wl_seat::Capability::Touch
            )),
            Capabilities::KEYBOARD | Capabilities::TOUCH
        );
    }

    #[test]
    fn unknown_capability_bits_are_dropped() {
        assert_eq!(
            capabilities(WEnum::Unknown(0b1011)),
            Capabilities::POINTER | Capabilities::KEYBOARD
        );
        assert_eq!(capabilities(WEnum::Unknown(0b1000)), Capabilities::empty());
    }

    #[test]
    fn button_cancels_only_when_pressed() {
        let pressed = button(WEnum::Value(ButtonState::Pressed)).unwrap();
        assert_eq!(pressed, InputEvent::PointerButton { pressed: true });
        assert!(pressed.cancels());

        let released = button(WEnum::Value(ButtonState::Released)).unwrap();
        assert_eq!(released, InputEvent::PointerButton { pressed: false });
        assert!(!released.cancels());

        let unknown = button(WEnum::Unknown(9)).unwrap();
        assert!(!unknown.cancels());
    }

    #[test]
    fn key_cancels_only_when_pressed() {
        let pressed = key(WEnum::Value(KeyState::Pressed)).unwrap();
        assert_eq!(pressed, InputEvent::Key { pressed: true });
        assert!(pressed.cancels());

        let released = key(WEnum::Value(KeyState::Released)).unwrap();
        assert_eq!(released, InputEvent::Key { pressed: false });
        assert!(!released.cancels());

        let unknown = key(WEnum::Unknown(9)).unwrap();
        assert!(!unknown.cancels());
    }

    #[test]
    fn motion_and_axis_cancel() {
        let motion = pointer_event(wl_pointer::Event::Motion {
            time: 0,
            surface_x: 1.,
            surface_y: 2.,
        })
        .unwrap();
        assert_eq!(motion, InputEvent::PointerMotion);
        assert!(motion.cancels());

        let axis = pointer_event(wl_pointer::Event::Axis {
            time: 0,
            axis: WEnum::Value(Axis::VerticalScroll),
            value: 10.,
        })
        .unwrap();
        assert_eq!(axis, InputEvent::PointerAxis);
        assert!(axis.cancels());
    }

    #[test]
    fn other_events_are_ignored() {
        assert_eq!(pointer_event(wl_pointer::Event::Frame), None);
        assert_eq!(
            keyboard_event(wl_keyboard::Event::RepeatInfo {
                rate: 25,
                delay: 600
            }),
            None
        );
        assert!(!keyboard_event(wl_keyboard::Event::Modifiers {
            serial: 0,
            mods_depressed: 1,
            mods_latched: 0,
            mods_locked: 0,
            group: 0,
        })
        .unwrap()
        .cancels());
    }

    #[test]
    fn keymap_fd_is_closed() {
        let (read_end, write_end) = pipe();

        let event = keyboard_event(wl_keyboard::Event::Keymap {
            format: WEnum::Value(KeymapFormat::XkbV1),
            fd: write_end,
            size: 0,
        });
        assert_eq!(event, Some(InputEvent::KeyboardKeymap));

        // The read end only sees end-of-file once every write end is closed.
        let mut buf = [0; 1];
        assert_eq!(File::from(read_end).read(&mut buf).unwrap(), 0);
    }
}

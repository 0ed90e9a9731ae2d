//! Per-seat capability negotiation and input cancellation.

use std::rc::Rc;

use bitflags::bitflags;

use super::RunState;

bitflags! {
    /// Seat capabilities, with the same bit values as `wl_seat.capability`.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct Capabilities: u32 {
        const POINTER = 1;
        const KEYBOARD = 2;
        const TOUCH = 4;
    }
}

/// Protocol objects of one seat.
pub trait SeatDevices {
    type Pointer;
    type Keyboard;

    fn get_pointer(&mut self) -> Self::Pointer;
    fn get_keyboard(&mut self) -> Self::Keyboard;
    fn release_pointer(&mut self, pointer: Self::Pointer);
    fn release_keyboard(&mut self, keyboard: Self::Keyboard);

    /// Destroys the seat handle itself.
    fn destroy(self);
}

/// Input events delivered on a seat's pointer or keyboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputEvent {
    PointerEnter,
    PointerLeave,
    PointerMotion,
    PointerButton { pressed: bool },
    PointerAxis,
    KeyboardKeymap,
    KeyboardEnter,
    KeyboardLeave,
    KeyboardModifiers,
    Key { pressed: bool },
}

impl InputEvent {
    /// Whether this event means the user is active and the fade must stop.
    pub fn cancels(self) -> bool {
        match self {
            InputEvent::PointerMotion | InputEvent::PointerAxis => true,
            InputEvent::PointerButton { pressed } | InputEvent::Key { pressed } => pressed,
            InputEvent::PointerEnter
            | InputEvent::PointerLeave
            | InputEvent::KeyboardKeymap
            | InputEvent::KeyboardEnter
            | InputEvent::KeyboardLeave
            | InputEvent::KeyboardModifiers => false,
        }
    }
}

pub struct SeatSession<D: SeatDevices> {
    global_name: u32,
    devices: D,
    run: Rc<RunState>,
    caps: Capabilities,
    pointer: Option<D::Pointer>,
    keyboard: Option<D::Keyboard>,
}

impl<D: SeatDevices> SeatSession<D> {
    pub fn new(global_name: u32, devices: D, run: Rc<RunState>) -> Self {
        Self {
            global_name,
            devices,
            run,
            caps: Capabilities::empty(),
            pointer: None,
            keyboard: None,
        }
    }

    pub fn global_name(&self) -> u32 {
        self.global_name
    }

    pub fn capabilities(&self) -> Capabilities {
        self.caps
    }

    pub fn has_pointer(&self) -> bool {
        self.pointer.is_some()
    }

    pub fn has_keyboard(&self) -> bool {
        self.keyboard.is_some()
    }

    pub fn on_capabilities(&mut self, caps: Capabilities) {
        let added = caps & !self.caps;
        let removed = self.caps & !caps;

        if !added.is_empty() || !removed.is_empty() {
            debug!(
                "seat {}: capabilities {:?} -> {:?}",
                self.global_name, self.caps, caps
            );
        }

        if removed.contains(Capabilities::POINTER) {
            if let Some(pointer) = self.pointer.take() {
                self.devices.release_pointer(pointer);
            }
        }
        if removed.contains(Capabilities::KEYBOARD) {
            if let Some(keyboard) = self.keyboard.take() {
                self.devices.release_keyboard(keyboard);
            }
        }

        if added.contains(Capabilities::POINTER) {
            self.pointer = Some(self.devices.get_pointer());
        }
        if added.contains(Capabilities::KEYBOARD) {
            self.keyboard = Some(self.devices.get_keyboard());
        }

        self.caps = caps;
    }

    pub fn on_input(&mut self, event: InputEvent) {
        if !event.cancels() {
            return;
        }

        if self.run.is_running() {
            debug!("seat {}: cancelled by {event:?}", self.global_name);
        }
        self.run.cancel();
    }

    pub fn destroy(mut self) {
        debug!("seat {}: destroying", self.global_name);

        if let Some(pointer) = self.pointer.take() {
            self.devices.release_pointer(pointer);
        }
        if let Some(keyboard) = self.keyboard.take() {
            self.devices.release_keyboard(keyboard);
        }
        self.devices.destroy();
    }
}

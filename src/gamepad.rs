// Gamepad input: per-cycle snapshots built from gilrs events
//
// The runtime reads two controllers. Each cycle it drains pending gilrs
// events into persistent per-pad state and hands out plain-value snapshots,
// so the mapper never touches the event stream directly.

use gilrs::{Axis, Button, EventType, GamepadId, Gilrs};
use tracing::{info, warn};

/// Snapshot of one controller for a single control cycle.
///
/// Sign convention follows the driver-station SDK the mappings were tuned
/// against: stick Y reads negative when pushed forward. Triggers are [0, 1],
/// sticks roughly [-1, 1].
#[derive(Debug, Clone, Copy, Default)]
pub struct GamepadState {
    pub left_stick_x: f32,
    pub left_stick_y: f32,
    pub right_stick_x: f32,
    pub right_stick_y: f32,
    pub left_trigger: f32,
    pub right_trigger: f32,
    pub a: bool,
    pub b: bool,
    pub x: bool,
    pub y: bool,
    pub start: bool,
    pub left_bumper: bool,
    pub right_bumper: bool,
    pub dpad_up: bool,
    pub dpad_down: bool,
    pub dpad_left: bool,
    pub dpad_right: bool,
}

impl GamepadState {
    /// Fold one gilrs event into the persistent pad state.
    fn apply(&mut self, event: &EventType) {
        match *event {
            EventType::ButtonPressed(button, _) => self.set_button(button, true),
            EventType::ButtonReleased(button, _) => self.set_button(button, false),
            EventType::ButtonChanged(button, value, _) => self.set_trigger(button, value),
            EventType::AxisChanged(axis, value, _) => self.set_axis(axis, value),
            _ => {}
        }
    }

    fn set_trigger(&mut self, button: Button, value: f32) {
        match button {
            Button::LeftTrigger2 => self.left_trigger = value.clamp(0.0, 1.0),
            Button::RightTrigger2 => self.right_trigger = value.clamp(0.0, 1.0),
            _ => {}
        }
    }

    fn set_button(&mut self, button: Button, pressed: bool) {
        match button {
            Button::South => self.a = pressed,
            Button::East => self.b = pressed,
            Button::West => self.x = pressed,
            Button::North => self.y = pressed,
            Button::Start => self.start = pressed,
            Button::LeftTrigger => self.left_bumper = pressed,
            Button::RightTrigger => self.right_bumper = pressed,
            Button::DPadUp => self.dpad_up = pressed,
            Button::DPadDown => self.dpad_down = pressed,
            Button::DPadLeft => self.dpad_left = pressed,
            Button::DPadRight => self.dpad_right = pressed,
            _ => {}
        }
    }

    fn set_axis(&mut self, axis: Axis, value: f32) {
        match axis {
            Axis::LeftStickX => self.left_stick_x = value,
            // gilrs reports +1 for stick pushed forward; flip to the SDK
            // convention the mapper expects (forward = negative).
            Axis::LeftStickY => self.left_stick_y = -value,
            Axis::RightStickX => self.right_stick_x = value,
            Axis::RightStickY => self.right_stick_y = -value,
            _ => {}
        }
    }
}

/// Both controllers, sampled once per cycle.
#[derive(Debug, Clone, Copy, Default)]
pub struct GamepadPair {
    pub driver: GamepadState,
    pub operator: GamepadState,
}

struct PadSlot {
    id: Option<GamepadId>,
    state: GamepadState,
}

/// Drains gilrs events and maintains state for up to two pads.
///
/// The first pad to produce an event becomes the driver pad (gamepad 1), the
/// second becomes the operator pad (gamepad 2). Disconnecting a pad frees
/// its slot and zeroes its state so stale inputs cannot keep driving.
pub struct GamepadReader {
    gilrs: Gilrs,
    slots: [PadSlot; 2],
}

impl GamepadReader {
    pub fn new() -> Result<Self, gilrs::Error> {
        let gilrs = Gilrs::new()?;
        for (_, pad) in gilrs.gamepads() {
            info!("Gamepad present: {}", pad.name());
        }
        if gilrs.gamepads().next().is_none() {
            warn!("No gamepads connected; robot will hold neutral until one appears");
        }
        Ok(Self {
            gilrs,
            slots: [
                PadSlot { id: None, state: GamepadState::default() },
                PadSlot { id: None, state: GamepadState::default() },
            ],
        })
    }

    /// Drain pending events and return this cycle's snapshots.
    pub fn poll(&mut self) -> GamepadPair {
        while let Some(event) = self.gilrs.next_event() {
            match event.event {
                EventType::Connected => {
                    info!("Gamepad {:?} connected", event.id);
                }
                EventType::Disconnected => {
                    warn!("Gamepad {:?} disconnected", event.id);
                    for slot in &mut self.slots {
                        if slot.id == Some(event.id) {
                            slot.id = None;
                            slot.state = GamepadState::default();
                        }
                    }
                }
                ref ev => {
                    if let Some(slot) = self.slot_for(event.id) {
                        slot.state.apply(ev);
                    }
                }
            }
        }

        GamepadPair {
            driver: self.slots[0].state,
            operator: self.slots[1].state,
        }
    }

    /// True while at least one controller is attached.
    pub fn any_connected(&self) -> bool {
        self.slots.iter().any(|s| s.id.is_some())
    }

    fn slot_for(&mut self, id: GamepadId) -> Option<&mut PadSlot> {
        if let Some(i) = self.slots.iter().position(|s| s.id == Some(id)) {
            return Some(&mut self.slots[i]);
        }
        // First event from an unseen pad claims the next free slot
        if let Some(i) = self.slots.iter().position(|s| s.id.is_none()) {
            self.slots[i].id = Some(id);
            return Some(&mut self.slots[i]);
        }
        None
    }
}

//! Switch-combo detection from connected gamepads

use gilrs::{Button, Event as GilrsEvent, EventType, Gilrs};
use romkeep_host_api::{HostError, HostResult, SwitchCombo};
use tracing::{debug, info, trace};

/// Map a configured button name to a gamepad button
pub fn button_from_name(name: &str) -> Option<Button> {
    Some(match name {
        "South" => Button::South,
        "East" => Button::East,
        "North" => Button::North,
        "West" => Button::West,
        "LeftTrigger" => Button::LeftTrigger,
        "LeftTrigger2" => Button::LeftTrigger2,
        "RightTrigger" => Button::RightTrigger,
        "RightTrigger2" => Button::RightTrigger2,
        "Select" => Button::Select,
        "Start" => Button::Start,
        "Mode" => Button::Mode,
        "LeftThumb" => Button::LeftThumb,
        "RightThumb" => Button::RightThumb,
        "DPadUp" => Button::DPadUp,
        "DPadDown" => Button::DPadDown,
        "DPadLeft" => Button::DPadLeft,
        "DPadRight" => Button::DPadRight,
        _ => return None,
    })
}

/// Turns "both buttons held" samples into one press per hold.
///
/// After firing, the combo must be released before it fires again.
#[derive(Debug, Clone, Default)]
pub struct ComboLatch {
    fired: bool,
}

impl ComboLatch {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one sample; true only on the sample where the hold begins
    pub fn update(&mut self, held: bool) -> bool {
        if !held {
            self.fired = false;
            return false;
        }
        if self.fired {
            return false;
        }
        self.fired = true;
        true
    }
}

/// Combo read from any connected gamepad
pub struct GamepadCombo {
    gilrs: Gilrs,
    buttons: [Button; 2],
    latch: ComboLatch,
}

impl GamepadCombo {
    pub fn open(names: &[String; 2]) -> HostResult<Self> {
        let buttons = [resolve(&names[0])?, resolve(&names[1])?];
        let gilrs = Gilrs::new()
            .map_err(|e| HostError::Internal(format!("Failed to initialize gamepad support: {}", e)))?;

        for (_id, gamepad) in gilrs.gamepads() {
            debug!(name = gamepad.name(), "Found gamepad");
        }
        info!(?buttons, "Switch combo input opened");

        Ok(Self {
            gilrs,
            buttons,
            latch: ComboLatch::new(),
        })
    }

    /// Process every pending event so button state is current
    fn drain(&mut self) {
        while let Some(GilrsEvent { event, .. }) = self.gilrs.next_event() {
            match event {
                EventType::Connected => debug!("Gamepad connected"),
                EventType::Disconnected => debug!("Gamepad disconnected"),
                EventType::ButtonPressed(button, _) => trace!(?button, "Gamepad button pressed"),
                _ => {}
            }
        }
    }

    fn held(&self) -> bool {
        self.gilrs
            .gamepads()
            .any(|(_id, gamepad)| self.buttons.iter().all(|b| gamepad.is_pressed(*b)))
    }
}

impl SwitchCombo for GamepadCombo {
    fn pressed(&mut self) -> bool {
        self.drain();
        let held = self.held();
        let pressed = self.latch.update(held);
        if pressed {
            debug!("Switch combo pressed");
        }
        pressed
    }
}

fn resolve(name: &str) -> HostResult<Button> {
    button_from_name(name)
        .ok_or_else(|| HostError::Internal(format!("Unknown gamepad button: {}", name)))
}

//! Seam to the controller-input collaborator.

use enum_map::Enum;

/// Controller port on the console.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Enum)]
pub enum Jack {
    Left,
    Right,
}

/// Analog pins of a controller port, read through INPT0-INPT3.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalogPin {
    Nine,
    Five,
}

/// Result of sampling an analog pin.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum AnalogReadout {
    /// Shorted to ground; the dump capacitor charges instantly.
    Minimum,
    /// Open circuit; the dump capacitor never charges.
    Maximum,
    /// A potentiometer position, in ohms.
    Resistance(u32),
}

#[cfg_attr(test, mockall::automock)]
pub trait Controller {
    fn read_analog(&self, pin: AnalogPin) -> AnalogReadout;

    /// Level of the digital button line. `true` means high, i.e. the button
    /// is released.
    fn button(&self) -> bool;
}

/// A standard digital joystick. Only the fire button is visible to the TIA;
/// directions go through the RIOT.
#[derive(Debug, Default)]
pub struct Joystick {
    pub fire_pressed: bool,
}

impl Controller for Joystick {
    fn read_analog(&self, _pin: AnalogPin) -> AnalogReadout {
        AnalogReadout::Maximum
    }

    fn button(&self) -> bool {
        !self.fire_pressed
    }
}

/// An empty controller port.
#[derive(Debug, Default)]
pub struct NullController;

impl Controller for NullController {
    fn read_analog(&self, _pin: AnalogPin) -> AnalogReadout {
        AnalogReadout::Maximum
    }

    fn button(&self) -> bool {
        true
    }
}

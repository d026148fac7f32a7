//! State of the desk controller: last height, presets, and where to go.
//!
//! Everything the control loop knows lives in [`DeskState`]. Height readings
//! and button gestures go in; [`DeskState::step`] says which way to drive.

use crate::button::ButtonEvent;

/// The two physical buttons.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub enum ButtonId {
    Up,
    Down,
}

/// What the relays should do.
#[derive(Clone, Copy, Debug, Default, Eq, Hash, PartialEq)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub enum Drive {
    #[default]
    Stop,
    Up,
    Down,
}

impl From<ButtonId> for Drive {
    fn from(button: ButtonId) -> Self {
        match button {
            ButtonId::Up => Self::Up,
            ButtonId::Down => Self::Down,
        }
    }
}

/// The controller's view of the desk.
#[derive(Clone, Copy, Debug, Default, Eq, PartialEq)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub struct DeskState {
    height_cm: Option<u8>,
    low_preset_cm: Option<u8>,
    high_preset_cm: Option<u8>,
    target_cm: Option<u8>,
    up_held: bool,
    down_held: bool,
    manual: Drive,
    tolerance_cm: u8,
}

impl DeskState {
    /// No height, presets, or target yet. A target counts as reached within
    /// `tolerance_cm`.
    #[must_use]
    pub const fn new(tolerance_cm: u8) -> Self {
        Self {
            height_cm: None,
            low_preset_cm: None,
            high_preset_cm: None,
            target_cm: None,
            up_held: false,
            down_held: false,
            manual: Drive::Stop,
            tolerance_cm,
        }
    }

    #[must_use]
    pub const fn height_cm(&self) -> Option<u8> {
        self.height_cm
    }

    #[must_use]
    pub const fn low_preset_cm(&self) -> Option<u8> {
        self.low_preset_cm
    }

    #[must_use]
    pub const fn high_preset_cm(&self) -> Option<u8> {
        self.high_preset_cm
    }

    #[must_use]
    pub const fn target_cm(&self) -> Option<u8> {
        self.target_cm
    }

    /// Record a decoded height. Zero means "no value" and is ignored.
    pub const fn update_height(&mut self, height_cm: u8) {
        if height_cm != 0 {
            self.height_cm = Some(height_cm);
        }
    }

    /// Apply one button gesture.
    pub fn handle_button(&mut self, button: ButtonId, event: ButtonEvent) {
        match event {
            ButtonEvent::PressStart => {
                self.set_held(button, true);
                if self.up_held && self.down_held {
                    self.remember_height();
                }
            }
            ButtonEvent::PressEnd => self.set_held(button, false),
            ButtonEvent::DoubleClick => {
                self.target_cm = match button {
                    ButtonId::Up => self.high_preset_cm,
                    ButtonId::Down => self.low_preset_cm,
                };
                #[cfg(all(feature = "defmt", target_os = "none"))]
                defmt::info!("Go to height: {:?} cm", self.target_cm);
            }
            ButtonEvent::LongPressStart => {
                self.target_cm = None;
                self.manual = button.into();
            }
            ButtonEvent::LongPressEnd => {
                if self.manual == Drive::from(button) {
                    self.manual = Drive::Stop;
                }
            }
        }
    }

    /// One control-loop tick: decide how to drive the relays.
    ///
    /// With a target, the desk moves toward it and stops (dropping the
    /// target) once within tolerance. Without a known height and both
    /// presets it stops rather than guess. Without a target it follows any
    /// long press.
    pub fn step(&mut self) -> Drive {
        let Some(target_cm) = self.target_cm else {
            return self.manual;
        };
        let (Some(height_cm), Some(_), Some(_)) =
            (self.height_cm, self.low_preset_cm, self.high_preset_cm)
        else {
            #[cfg(all(feature = "defmt", target_os = "none"))]
            defmt::warn!(
                "Missing height data - height={:?}, low={:?}, high={:?} - stopping",
                self.height_cm,
                self.low_preset_cm,
                self.high_preset_cm
            );
            return Drive::Stop;
        };

        if height_cm.abs_diff(target_cm) <= self.tolerance_cm {
            #[cfg(all(feature = "defmt", target_os = "none"))]
            defmt::info!("Target reached: {} cm", height_cm);
            self.target_cm = None;
            Drive::Stop
        } else if height_cm < target_cm {
            Drive::Up
        } else {
            Drive::Down
        }
    }

    const fn set_held(&mut self, button: ButtonId, held: bool) {
        match button {
            ButtonId::Up => self.up_held = held,
            ButtonId::Down => self.down_held = held,
        }
    }

    /// Store the current height as a preset: fill low, then high, then
    /// replace whichever preset is closer (low wins ties).
    fn remember_height(&mut self) {
        let Some(height_cm) = self.height_cm else {
            return;
        };
        match (self.low_preset_cm, self.high_preset_cm) {
            (None, _) => self.low_preset_cm = Some(height_cm),
            (Some(_), None) => self.high_preset_cm = Some(height_cm),
            (Some(low_cm), Some(high_cm)) => {
                if height_cm.abs_diff(low_cm) <= height_cm.abs_diff(high_cm) {
                    self.low_preset_cm = Some(height_cm);
                } else {
                    self.high_preset_cm = Some(height_cm);
                }
            }
        }
        #[cfg(all(feature = "defmt", target_os = "none"))]
        defmt::info!(
            "Presets: low={:?} high={:?}",
            self.low_preset_cm,
            self.high_preset_cm
        );
    }
}

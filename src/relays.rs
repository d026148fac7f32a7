//! The pair of relays that stand in for the desk's Up and Down switches.

use embedded_hal::digital::{OutputPin, PinState};

use crate::desk_state::Drive;
use crate::{Error, Result};

/// Up and Down relay outputs, driven as one unit.
///
/// Both lines are never asserted together: a direction change releases the
/// other relay before engaging the new one.
pub struct RelayPair<U, D> {
    up: U,
    down: D,
    drive: Drive,
}

impl<U: OutputPin, D: OutputPin> RelayPair<U, D> {
    /// Take both outputs and release them.
    ///
    /// # Errors
    /// Returns [`Error::RelayOutput`] if an output cannot be set.
    pub fn new(mut up: U, mut down: D) -> Result<Self> {
        set_line(&mut up, PinState::Low)?;
        set_line(&mut down, PinState::Low)?;
        Ok(Self {
            up,
            down,
            drive: Drive::Stop,
        })
    }

    /// The drive last applied.
    #[must_use]
    pub const fn drive(&self) -> Drive {
        self.drive
    }

    /// Set the relays to `drive`.
    ///
    /// # Errors
    /// Returns [`Error::RelayOutput`] if an output cannot be set. The relays
    /// may then be partly switched; [`Drive::Stop`] is the way back.
    #[must_use = "Possible error result should not be ignored"]
    pub fn apply(&mut self, drive: Drive) -> Result<()> {
        match drive {
            Drive::Stop => {
                set_line(&mut self.up, PinState::Low)?;
                set_line(&mut self.down, PinState::Low)?;
            }
            Drive::Up => {
                set_line(&mut self.down, PinState::Low)?;
                set_line(&mut self.up, PinState::High)?;
            }
            Drive::Down => {
                set_line(&mut self.up, PinState::Low)?;
                set_line(&mut self.down, PinState::High)?;
            }
        }
        #[cfg(all(feature = "defmt", target_os = "none"))]
        if drive != self.drive {
            defmt::info!("Relays: {:?} -> {:?}", self.drive, drive);
        }
        self.drive = drive;
        Ok(())
    }
}

fn set_line(pin: &mut impl OutputPin, state: PinState) -> Result<()> {
    pin.set_state(state).map_err(|_| Error::RelayOutput)
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use core::cell::RefCell;
    use core::convert::Infallible;

    use embedded_hal::digital::{ErrorKind, ErrorType};

    use super::*;

    /// Level changes of both pins, in order: (pin name, level).
    type Log = RefCell<heapless::Vec<(&'static str, bool), 32>>;

    struct MockPin<'a> {
        name: &'static str,
        log: &'a Log,
    }

    impl ErrorType for MockPin<'_> {
        type Error = Infallible;
    }

    impl OutputPin for MockPin<'_> {
        fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
            self.log.borrow_mut().push((self.name, false)).ok();
            Ok(())
        }

        fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
            self.log.borrow_mut().push((self.name, true)).ok();
            Ok(())
        }
    }

    /// An output whose driver has failed.
    struct BrokenPin;

    impl ErrorType for BrokenPin {
        type Error = ErrorKind;
    }

    impl OutputPin for BrokenPin {
        fn set_low(&mut self) -> core::result::Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }

        fn set_high(&mut self) -> core::result::Result<(), Self::Error> {
            Err(ErrorKind::Other)
        }
    }

    /// Replay the log and check that both lines are never high together.
    fn never_both_high(log: &Log) -> bool {
        let mut up = false;
        let mut down = false;
        for &(name, level) in log.borrow().iter() {
            match name {
                "up" => up = level,
                _ => down = level,
            }
            if up && down {
                return false;
            }
        }
        true
    }

    fn relays(log: &Log) -> RelayPair<MockPin<'_>, MockPin<'_>> {
        let up = MockPin { name: "up", log };
        let down = MockPin { name: "down", log };
        RelayPair::new(up, down).expect("mock pins never fail")
    }

    #[test]
    fn new_releases_both() {
        let log = Log::default();
        let relays = relays(&log);
        assert_eq!(relays.drive(), Drive::Stop);
        assert_eq!(log.borrow().as_slice(), &[("up", false), ("down", false)]);
    }

    #[test]
    fn direction_change_releases_first() {
        let log = Log::default();
        let mut relays = relays(&log);
        relays.apply(Drive::Up).expect("mock pins never fail");
        relays.apply(Drive::Down).expect("mock pins never fail");
        relays.apply(Drive::Up).expect("mock pins never fail");
        relays.apply(Drive::Stop).expect("mock pins never fail");
        assert!(never_both_high(&log));
        assert_eq!(relays.drive(), Drive::Stop);
        assert_eq!(log.borrow().last(), Some(&("down", false)));
    }

    #[test]
    fn down_asserts_only_down() {
        let log = Log::default();
        let mut relays = relays(&log);
        log.borrow_mut().clear();
        relays.apply(Drive::Down).expect("mock pins never fail");
        assert_eq!(log.borrow().as_slice(), &[("up", false), ("down", true)]);
    }

    #[test]
    fn broken_output_is_a_relay_error() {
        let log = Log::default();
        let down = MockPin { name: "down", log: &log };
        assert!(matches!(
            RelayPair::new(BrokenPin, down),
            Err(Error::RelayOutput)
        ));
        // The other line was never touched.
        assert!(log.borrow().is_empty());
    }

    #[test]
    fn failed_apply_keeps_last_drive() {
        let log = Log::default();
        let up = MockPin { name: "up", log: &log };
        let down = MockPin { name: "down", log: &log };
        let mut relays = RelayPair::new(up, down).expect("mock pins never fail");
        relays.apply(Drive::Up).expect("mock pins never fail");

        let mut relays = RelayPair {
            up: relays.up,
            down: BrokenPin,
            drive: relays.drive,
        };
        assert!(matches!(relays.apply(Drive::Down), Err(Error::RelayOutput)));
        assert_eq!(relays.drive(), Drive::Up);
        assert!(matches!(relays.apply(Drive::Stop), Err(Error::RelayOutput)));
    }
}

//! Protocol timing constants and the desk controller's tunables.
//!
//! The protocol constants are fixed by the desk's control unit. The controller
//! tunables come from the build environment (see `build.rs`), so a `.env` file
//! next to `Cargo.toml` or in your home directory can override them without
//! touching the code.

use embassy_time::Duration;

use crate::{Error, Result};

// ===== LogicData protocol ===================================================

/// One protocol bit lasts this long. The desk sends one bit per millisecond.
pub const BIT_PERIOD_US: u32 = 1_000;

/// No accepted edge for this long marks the line idle (about 65 ms).
pub const IDLE_TIME_US: u64 = 1 << 16;

/// Number of interval slots in the capture ring. One slot always stays empty.
///
/// Must be even: the decoder infers the line level from index parity.
pub const EDGE_RING_CAPACITY: usize = 80;

/// A frame starts after a low period longer than 40 bit periods...
pub const SYNC_LOW_MIN_US: u32 = 40_000;

/// ...immediately followed by a high pulse shorter than 2 bit periods.
pub const SYNC_HIGH_MAX_US: u32 = 2_000;

/// Bits per frame.
pub const FRAME_BITS: u32 = 32;

/// Nominal history the capture ring holds on a clean line.
///
/// A clean LogicData waveform has no interval shorter than about one bit
/// period, so the ring's `N - 1` slots span at least this long. Noise spikes
/// are stored as short intervals and shrink the real span. Polling slower
/// than this lets the producer evict a frame before the decoder commits it.
pub const RING_RETENTION: Duration = Duration::from_micros(79 * BIT_PERIOD_US as u64);

// ===== Desk controller ======================================================

/// Timing and matching settings for the desk controller.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub struct DeskConfig {
    /// How often the capture ring is polled for a height frame.
    pub height_read_interval: Duration,
    /// How often the relays are re-evaluated against the target height.
    pub control_loop_period: Duration,
    /// How long Up is asserted at startup so the desk begins transmitting.
    pub initial_nudge: Duration,
    /// A target counts as reached within this many centimeters.
    pub target_tolerance_cm: u8,
    /// Settle time after a button edge before the level is trusted.
    pub button_debounce: Duration,
    /// Hold time after which a press becomes a long press.
    pub long_press: Duration,
    /// Maximum gap between two clicks of a double click.
    pub double_click_window: Duration,
}

impl DeskConfig {
    /// Settings from the build environment, with the defaults from `build.rs`.
    pub const DEFAULT: Self = Self {
        height_read_interval: Duration::from_millis(parse_u64(env!(
            "DESK_HEIGHT_READ_INTERVAL_MS"
        ))),
        control_loop_period: Duration::from_millis(parse_u64(env!("DESK_CONTROL_LOOP_MS"))),
        initial_nudge: Duration::from_millis(parse_u64(env!("DESK_INITIAL_NUDGE_MS"))),
        target_tolerance_cm: parse_u8(env!("DESK_TARGET_TOLERANCE_CM")),
        button_debounce: Duration::from_millis(10),
        long_press: Duration::from_millis(500),
        double_click_window: Duration::from_millis(300),
    };

    /// Check that the periods are usable by the controller.
    ///
    /// # Errors
    /// Returns [`Error::InvalidConfig`] when a period is zero or the height
    /// read interval is longer than the capture ring can remember.
    pub fn validate(self) -> Result<Self> {
        if self.height_read_interval == Duration::from_ticks(0) {
            return Err(Error::InvalidConfig("height read interval is zero"));
        }
        if self.height_read_interval > RING_RETENTION {
            return Err(Error::InvalidConfig(
                "height read interval exceeds the capture ring retention",
            ));
        }
        if self.control_loop_period == Duration::from_ticks(0) {
            return Err(Error::InvalidConfig("control loop period is zero"));
        }
        if self.double_click_window >= self.long_press {
            return Err(Error::InvalidConfig(
                "double click window must be shorter than a long press",
            ));
        }
        Ok(self)
    }
}

impl Default for DeskConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Parse a decimal build-environment value at compile time.
///
/// A malformed value stops the build with the panic message.
const fn parse_u64(text: &str) -> u64 {
    let mut rest = text.as_bytes();
    assert!(!rest.is_empty(), "empty number in build environment");
    let mut value: u64 = 0;
    while let [digit, tail @ ..] = rest {
        assert!(digit.is_ascii_digit(), "non-digit in build environment number");
        value = match value.checked_mul(10) {
            Some(value) => value,
            None => panic!("number in build environment is too large"),
        };
        value = match value.checked_add(digit.wrapping_sub(b'0') as u64) {
            Some(value) => value,
            None => panic!("number in build environment is too large"),
        };
        rest = tail;
    }
    value
}

const fn parse_u8(text: &str) -> u8 {
    let value = parse_u64(text);
    assert!(value <= u8::MAX as u64, "number in build environment exceeds 255");
    value as u8
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;

    #[test]
    fn parse_u64_reads_decimal() {
        const VALUE: u64 = parse_u64("1250");
        assert_eq!(VALUE, 1250);
        assert_eq!(parse_u64("0"), 0);
    }

    #[test]
    fn parse_u8_accepts_byte_range() {
        assert_eq!(parse_u8("255"), 255);
        assert_eq!(parse_u8("3"), 3);
    }

    #[test]
    fn default_config_is_valid() {
        assert!(DeskConfig::DEFAULT.validate().is_ok());
    }

    #[test]
    fn slow_polling_is_rejected() {
        let config = DeskConfig {
            height_read_interval: Duration::from_millis(200),
            ..DeskConfig::DEFAULT
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }

    #[test]
    fn zero_control_period_is_rejected() {
        let config = DeskConfig {
            control_loop_period: Duration::from_ticks(0),
            ..DeskConfig::DEFAULT
        };
        assert!(matches!(config.validate(), Err(Error::InvalidConfig(_))));
    }
}

//! The 32-bit LogicData frame: validation and height extraction.

/// Bits that carry the fixed magic pattern.
pub const MAGIC_MASK: u32 = 0xFFF0_0000;
/// Every valid frame starts with this pattern.
pub const MAGIC: u32 = 0x4060_0000;
/// Bits that identify the frame type.
pub const TYPE_MASK: u32 = 0x000F_FE00;
/// Type tag of a frame that carries a number (the desk height).
pub const NUMBER_TYPE: u32 = 0x0000_0400;

/// One reconstructed protocol word, most-significant bit first on the wire.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub struct Frame(u32);

impl Frame {
    #[must_use]
    pub const fn new(word: u32) -> Self {
        Self(word)
    }

    /// Build the number frame the desk sends for `height_cm`.
    #[must_use]
    pub const fn from_height_cm(height_cm: u8) -> Self {
        Self(MAGIC | NUMBER_TYPE | ((height_cm.reverse_bits() as u32) << 1))
    }

    #[must_use]
    pub const fn word(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn has_magic(self) -> bool {
        self.0 & MAGIC_MASK == MAGIC
    }

    /// Parity guard over the odd bit positions.
    ///
    /// Sums the word's bits at positions 1, 3, .., 31 (as masked values, not
    /// as a bit count), folds the low bit of the sum into bit 0, and requires
    /// the word to come back unchanged. Every masked value is even, so the
    /// folded bit is always 0 and this never rejects a frame. Whether the desk
    /// uses a real parity bit is still open; magic and type checks are what
    /// actually filter bad frames.
    #[must_use]
    pub const fn parity_holds(self) -> bool {
        let mut sum: u32 = 0;
        let mut mask: u32 = 0b10;
        while mask != 0 {
            sum = sum.wrapping_add(self.0 & mask);
            mask = mask.wrapping_shl(2);
        }
        self.0 | (sum & 1) == self.0
    }

    /// Magic pattern present and parity guard passed.
    #[must_use]
    pub const fn is_valid(self) -> bool {
        self.has_magic() && self.parity_holds()
    }

    /// A valid frame whose type tag marks a number payload.
    #[must_use]
    pub const fn is_number(self) -> bool {
        self.is_valid() && self.0 & TYPE_MASK == NUMBER_TYPE
    }

    /// The raw payload byte (bits 1 to 8), still in wire bit order.
    #[must_use]
    pub const fn payload(self) -> u8 {
        let [low, ..] = (self.0 >> 1).to_le_bytes();
        low
    }

    /// Height in centimeters, for number frames.
    ///
    /// The payload travels with its bits reversed. A zero height means "no
    /// value" and is reported as `None`.
    #[must_use]
    pub const fn height_cm(self) -> Option<u8> {
        if !self.is_number() {
            return None;
        }
        match self.payload().reverse_bits() {
            0 => None,
            height_cm => Some(height_cm),
        }
    }
}

impl From<u32> for Frame {
    fn from(word: u32) -> Self {
        Self(word)
    }
}

impl From<Frame> for u32 {
    fn from(frame: Frame) -> Self {
        frame.0
    }
}

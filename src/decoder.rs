//! Frame decoder: finds the sync marker in the capture ring, resamples the
//! edge timings onto the bit grid, and commits what it consumed.
//!
//! Decoding never holds the ring's lock across the bit loop. It reads with
//! short [`EdgeSource::peek`] calls against a tail snapshot, then commits with
//! a compare-and-advance. If the producer evicted anything in between, the
//! whole attempt is dropped and the next poll starts over.

use crate::config::{BIT_PERIOD_US, FRAME_BITS, SYNC_HIGH_MAX_US, SYNC_LOW_MIN_US};
use crate::edge_ring::{EdgeRing, Interval};
use crate::frame::Frame;

/// The consumer-side view of a capture ring.
pub trait EdgeSource {
    /// Snapshot of the oldest unread position.
    fn tail(&self) -> usize;
    /// Interval `index` places after the oldest unread one.
    fn peek(&self, index: usize) -> Option<Interval>;
    /// Retire `count` intervals if the tail still equals `expected_tail`.
    fn commit_consumed(&self, expected_tail: usize, count: usize) -> bool;
}

impl<const N: usize> EdgeSource for EdgeRing<N> {
    fn tail(&self) -> usize {
        Self::tail(self)
    }

    fn peek(&self, index: usize) -> Option<Interval> {
        Self::peek(self, index)
    }

    fn commit_consumed(&self, expected_tail: usize, count: usize) -> bool {
        Self::commit_consumed(self, expected_tail, count)
    }
}

/// Try to decode one frame from `source`.
///
/// Returns `None` when there is no sync marker yet, when fewer than 32 bit
/// periods follow it, or when the producer raced the commit. In all of those
/// cases nothing is consumed. A returned frame has been committed but not
/// validated.
pub fn decode_frame<S: EdgeSource + ?Sized>(source: &S) -> Option<Frame> {
    let expected_tail = source.tail();
    let mut scan = Scan::new(source, expected_tail);

    if !scan.find_sync() {
        return None;
    }
    let word = scan.resample_word()?;

    if !source.commit_consumed(expected_tail, scan.index.saturating_sub(1)) {
        #[cfg(all(feature = "defmt", target_os = "none"))]
        defmt::debug!("LogicData: frame 0x{:08X} lost a commit race", word);
        return None;
    }
    Some(Frame::new(word))
}

/// Decode one frame and, if it is a number frame, return the height in
/// centimeters. Invalid and non-number frames read as `None`, just like "no
/// frame yet".
pub fn read_height_cm<S: EdgeSource + ?Sized>(source: &S) -> Option<u8> {
    let frame = decode_frame(source)?;
    let height_cm = frame.height_cm();
    #[cfg(all(feature = "defmt", target_os = "none"))]
    if height_cm.is_none() {
        defmt::debug!("LogicData: ignoring frame 0x{:08X}", frame.word());
    }
    height_cm
}

/// Read position plus the line level during the interval at that position.
struct Scan<'a, S: ?Sized> {
    source: &'a S,
    index: usize,
    level_high: bool,
}

impl<'a, S: EdgeSource + ?Sized> Scan<'a, S> {
    /// Even ring slots hold high intervals, so the level follows tail parity.
    fn new(source: &'a S, tail: usize) -> Self {
        Self {
            source,
            index: 0,
            level_high: tail.is_multiple_of(2),
        }
    }

    /// Move to the long-low interval of the sync marker.
    ///
    /// Leaves `index` on the long low when found, past the end otherwise.
    fn find_sync(&mut self) -> bool {
        while let Some(interval) = self.source.peek(self.index) {
            if !self.level_high
                && interval.as_micros() > SYNC_LOW_MIN_US
                && self
                    .source
                    .peek(self.index.wrapping_add(1))
                    .is_some_and(|next| next.as_micros() < SYNC_HIGH_MAX_US)
            {
                return true;
            }
            self.level_high = !self.level_high;
            self.index = self.index.wrapping_add(1);
        }
        false
    }

    /// Consume the next interval, flipping the tracked level.
    fn advance(&mut self) -> Option<u32> {
        let next_index = self.index.wrapping_add(1);
        let interval = self.source.peek(next_index)?;
        self.index = next_index;
        self.level_high = !self.level_high;
        Some(interval.as_micros())
    }

    /// Rebuild 32 bits, MSB first, by sampling the line level in the middle
    /// of each bit period.
    ///
    /// The budget starts at half a bit period. Intervals are added until the
    /// budget covers a full bit, the current level becomes the bit (low is 1),
    /// and one bit period is spent. The remainder carries over, so early or
    /// late edges do not accumulate drift.
    fn resample_word(&mut self) -> Option<u32> {
        let mut budget_us = BIT_PERIOD_US / 2;
        let mut word: u32 = 0;
        for bit in (0..FRAME_BITS).rev() {
            while budget_us < BIT_PERIOD_US {
                budget_us = budget_us.saturating_add(self.advance()?);
            }
            if !self.level_high {
                word |= 1_u32.wrapping_shl(bit);
            }
            budget_us = budget_us.wrapping_sub(BIT_PERIOD_US);
        }
        Some(word)
    }
}

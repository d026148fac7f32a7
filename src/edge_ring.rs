//! Interrupt-safe capture ring for LogicData edge timings.
//!
//! The edge capture side pushes one [`Interval`] per accepted edge; the decoder
//! reads them back with [`EdgeRing::peek`] and retires them with an optimistic
//! [`EdgeRing::commit_consumed`]. Every access takes the same critical section,
//! which is valid from interrupt context and held only for index bookkeeping.

use core::cell::RefCell;

use embassy_sync::blocking_mutex::Mutex;
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;

use crate::config::{EDGE_RING_CAPACITY, IDLE_TIME_US};

// ===== Interval =============================================================

/// Time between two accepted edges, in microseconds.
///
/// [`Interval::IDLE`] is a sentinel rather than a measurement: the line was
/// idle for a long time before this edge.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub struct Interval(u32);

impl Interval {
    /// The line was idle before this edge.
    pub const IDLE: Self = Self(u32::MAX);

    /// An interval of `micros` microseconds. `u32::MAX` is the idle sentinel.
    #[must_use]
    pub const fn from_micros(micros: u32) -> Self {
        Self(micros)
    }

    /// The interval length. The idle sentinel reads as `u32::MAX`, longer than
    /// any real measurement.
    #[must_use]
    pub const fn as_micros(self) -> u32 {
        self.0
    }

    #[must_use]
    pub const fn is_idle(self) -> bool {
        self.0 == Self::IDLE.0
    }
}

// ===== EdgeRing =============================================================

struct RingState<const N: usize> {
    head: usize,
    tail: usize,
    samples: [Interval; N],
}

impl<const N: usize> RingState<N> {
    #[expect(
        clippy::arithmetic_side_effects,
        clippy::integer_division_remainder_used,
        reason = "indexes stay below N and N is nonzero"
    )]
    const fn wrap(index: usize) -> usize {
        index % N
    }

    const fn next(index: usize) -> usize {
        Self::wrap(index.wrapping_add(1))
    }

    const fn len(&self) -> usize {
        Self::wrap(N.wrapping_add(self.head).wrapping_sub(self.tail))
    }
}

/// Fixed-capacity, lossy ring of [`Interval`]s shared between the edge
/// capture (sole producer) and the decoder (sole consumer).
///
/// One slot always stays empty, so at most `N - 1` intervals are retained.
/// When full, a push drops the oldest interval; the producer never waits.
pub struct EdgeRing<const N: usize = EDGE_RING_CAPACITY> {
    state: Mutex<CriticalSectionRawMutex, RefCell<RingState<N>>>,
}

impl<const N: usize> EdgeRing<N> {
    const CAPACITY_OK: () = assert!(
        N >= 2 && N.is_multiple_of(2),
        "EdgeRing capacity must be even and at least 2"
    );

    /// Create an empty ring. `const`, so it can live in a `static`.
    #[must_use]
    pub const fn new() -> Self {
        let () = Self::CAPACITY_OK;
        Self {
            state: Mutex::new(RefCell::new(RingState {
                head: 0,
                tail: 0,
                samples: [Interval(0); N],
            })),
        }
    }

    /// Record an interval, dropping the oldest one if the ring is full.
    pub fn push(&self, interval: Interval) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            let head = state.head;
            if let Some(slot) = state.samples.get_mut(head) {
                *slot = interval;
            }
            let new_head = RingState::<N>::next(head);
            if new_head == state.tail {
                state.tail = RingState::<N>::next(state.tail);
            }
            state.head = new_head;
        });
    }

    /// Read the interval `index` places after the oldest unread one, without
    /// consuming it.
    ///
    /// Each call takes its own snapshot of the indexes. A caller that peeks
    /// many times may see data the producer has since overwritten;
    /// [`EdgeRing::commit_consumed`] detects that afterwards.
    #[must_use]
    pub fn peek(&self, index: usize) -> Option<Interval> {
        self.state.lock(|state| {
            let state = state.borrow();
            if index >= state.len() {
                return None;
            }
            let position = RingState::<N>::wrap(state.tail.wrapping_add(index));
            state.samples.get(position).copied()
        })
    }

    /// Snapshot of the oldest unread position.
    #[must_use]
    pub fn tail(&self) -> usize {
        self.state.lock(|state| state.borrow().tail)
    }

    /// Retire `count` intervals, but only if nothing was evicted since the
    /// caller read `expected_tail`.
    ///
    /// Returns `false` and leaves the ring untouched when the tail moved.
    #[must_use]
    pub fn commit_consumed(&self, expected_tail: usize, count: usize) -> bool {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            if state.tail != expected_tail {
                return false;
            }
            let count = count.min(state.len());
            state.tail = RingState::<N>::wrap(state.tail.wrapping_add(count));
            true
        })
    }

    /// Drop every unread interval. The write position is kept, so the level
    /// expected by [`EdgeRing::accepts_level`] does not change.
    pub fn clear(&self) {
        self.state.lock(|state| {
            let mut state = state.borrow_mut();
            state.tail = state.head;
        });
    }

    /// Whether the next edge to record must leave the line at `level_high`.
    ///
    /// The protocol alternates levels, so the expected level follows the
    /// parity of the write position: even slots end with a falling edge (the
    /// interval was high), odd slots with a rising edge.
    #[must_use]
    pub fn accepts_level(&self, level_high: bool) -> bool {
        self.state
            .lock(|state| level_high == !state.borrow().head.is_multiple_of(2))
    }

    /// Number of unread intervals.
    #[must_use]
    pub fn len(&self) -> usize {
        self.state.lock(|state| state.borrow().len())
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Total slots, including the one that always stays empty.
    #[must_use]
    pub const fn capacity(&self) -> usize {
        N
    }
}

impl<const N: usize> Default for EdgeRing<N> {
    fn default() -> Self {
        Self::new()
    }
}

// ===== EdgeClassifier =======================================================

/// Producer-side edge filter: turns raw edges into ring intervals.
///
/// Only edges that leave the line at the level the ring expects are recorded;
/// glitches and out-of-turn transitions are ignored. The first recorded edge
/// after a long quiet spell is stored as [`Interval::IDLE`].
#[derive(Clone, Copy, Debug)]
pub struct EdgeClassifier {
    prev_edge_us: u64,
    idle: bool,
}

impl EdgeClassifier {
    /// Start classifying, treating `now_us` as the last accepted edge. The
    /// line counts as idle until the first edge is recorded.
    #[must_use]
    pub const fn new(now_us: u64) -> Self {
        Self {
            prev_edge_us: now_us,
            idle: true,
        }
    }

    /// Handle one electrical transition that left the line at `level_high`.
    ///
    /// Returns whether the edge was recorded.
    pub fn on_edge<const N: usize>(
        &mut self,
        ring: &EdgeRing<N>,
        now_us: u64,
        level_high: bool,
    ) -> bool {
        let delta_us = now_us.saturating_sub(self.prev_edge_us);
        if delta_us >= IDLE_TIME_US {
            self.idle = true;
        }

        if !ring.accepts_level(level_high) {
            return false;
        }

        let interval = if self.idle {
            Interval::IDLE
        } else {
            // Below IDLE_TIME_US here, so it always fits.
            Interval::from_micros(u32::try_from(delta_us).unwrap_or(u32::MAX))
        };
        ring.push(interval);
        self.idle = false;
        self.prev_edge_us = now_us;
        true
    }

    #[must_use]
    pub const fn is_idle(&self) -> bool {
        self.idle
    }
}

#[cfg(all(test, not(target_os = "none")))]
mod tests {
    use super::*;
    use crate::config::BIT_PERIOD_US;

    fn micros(values: &[u32]) -> impl Iterator<Item = Interval> + '_ {
        values.iter().copied().map(Interval::from_micros)
    }

    #[test]
    fn new_ring_is_empty() {
        let ring: EdgeRing<8> = EdgeRing::new();
        assert!(ring.is_empty());
        assert_eq!(ring.peek(0), None);
        assert_eq!(ring.capacity(), 8);
    }

    #[test]
    fn peek_reads_in_fifo_order() {
        let ring: EdgeRing<8> = EdgeRing::new();
        for interval in micros(&[10, 20, 30]) {
            ring.push(interval);
        }
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.peek(0), Some(Interval::from_micros(10)));
        assert_eq!(ring.peek(2), Some(Interval::from_micros(30)));
        assert_eq!(ring.peek(3), None);
    }

    #[test]
    fn overflow_keeps_newest_n_minus_one() {
        let ring: EdgeRing<8> = EdgeRing::new();
        for value in 1..=20 {
            ring.push(Interval::from_micros(value));
            assert!(ring.len() < 8);
        }
        assert_eq!(ring.len(), 7);
        // 1..=13 were evicted oldest-first.
        for (index, value) in (14..=20).enumerate() {
            assert_eq!(ring.peek(index), Some(Interval::from_micros(value)));
        }
        assert_eq!(ring.peek(7), None);
    }

    #[test]
    fn commit_advances_tail() {
        let ring: EdgeRing<8> = EdgeRing::new();
        for interval in micros(&[1, 2, 3, 4]) {
            ring.push(interval);
        }
        let tail = ring.tail();
        assert!(ring.commit_consumed(tail, 3));
        assert_eq!(ring.len(), 1);
        assert_eq!(ring.peek(0), Some(Interval::from_micros(4)));
    }

    #[test]
    fn commit_after_eviction_is_rejected() {
        let ring: EdgeRing<4> = EdgeRing::new();
        for interval in micros(&[1, 2, 3]) {
            ring.push(interval);
        }
        let tail = ring.tail();
        // Full ring: this push evicts the oldest sample and moves the tail.
        ring.push(Interval::from_micros(4));
        assert!(!ring.commit_consumed(tail, 2));
        assert_eq!(ring.len(), 3);
        assert_eq!(ring.peek(0), Some(Interval::from_micros(2)));
    }

    #[test]
    fn commit_never_passes_head() {
        let ring: EdgeRing<8> = EdgeRing::new();
        ring.push(Interval::from_micros(5));
        let tail = ring.tail();
        assert!(ring.commit_consumed(tail, 10));
        assert!(ring.is_empty());
    }

    #[test]
    fn clear_keeps_level_parity() {
        let ring: EdgeRing<8> = EdgeRing::new();
        for interval in micros(&[1, 2, 3]) {
            ring.push(interval);
        }
        ring.clear();
        assert!(ring.is_empty());
        assert!(ring.accepts_level(true));
        // The decoder's level tracking follows the tail, which now sits on an
        // odd slot.
        assert_eq!(ring.tail(), 3);
    }

    #[test]
    fn expected_level_alternates_with_head() {
        let ring: EdgeRing<8> = EdgeRing::new();
        assert!(ring.accepts_level(false));
        assert!(!ring.accepts_level(true));
        ring.push(Interval::from_micros(1));
        assert!(ring.accepts_level(true));
        assert!(!ring.accepts_level(false));
    }

    #[test]
    fn classifier_marks_first_edge_idle() {
        let ring: EdgeRing<8> = EdgeRing::new();
        let mut classifier = EdgeClassifier::new(0);
        assert!(classifier.on_edge(&ring, 100, false));
        assert!(!classifier.is_idle());
        assert!(classifier.on_edge(&ring, 1_100, true));
        assert_eq!(ring.peek(0), Some(Interval::IDLE));
        assert_eq!(ring.peek(1), Some(Interval::from_micros(1_000)));
    }

    #[test]
    fn classifier_ignores_out_of_turn_levels() {
        let ring: EdgeRing<8> = EdgeRing::new();
        let mut classifier = EdgeClassifier::new(0);
        assert!(classifier.on_edge(&ring, 10, false));
        // A second falling edge is a glitch: the ring wants a rising edge next.
        assert!(!classifier.on_edge(&ring, 400, false));
        assert!(classifier.on_edge(&ring, 1_010, true));
        assert_eq!(ring.len(), 2);
        // Measured from the last accepted edge, not from the glitch.
        assert_eq!(ring.peek(1), Some(Interval::from_micros(1_000)));
    }

    #[test]
    fn classifier_returns_to_idle_after_quiet_line() {
        let ring: EdgeRing<8> = EdgeRing::new();
        let mut classifier = EdgeClassifier::new(0);
        assert!(classifier.on_edge(&ring, 10, false));
        assert!(classifier.on_edge(&ring, 1_010, true));
        assert!(classifier.on_edge(&ring, 1_010 + IDLE_TIME_US, false));
        assert_eq!(ring.peek(2), Some(Interval::IDLE));
        assert!(Interval::IDLE.is_idle());
    }

    #[test]
    fn rejected_edge_after_quiet_line_keeps_idle() {
        let ring: EdgeRing<8> = EdgeRing::new();
        let mut classifier = EdgeClassifier::new(0);
        assert!(classifier.on_edge(&ring, 10, false));
        assert!(!classifier.on_edge(&ring, 10 + IDLE_TIME_US, false));
        assert!(classifier.is_idle());
        assert!(classifier.on_edge(&ring, 20 + IDLE_TIME_US, true));
        assert_eq!(ring.peek(1), Some(Interval::IDLE));
    }

    #[test]
    fn fast_alternating_glitch_pair_is_recorded() {
        let ring: EdgeRing<8> = EdgeRing::new();
        let mut classifier = EdgeClassifier::new(0);
        assert!(classifier.on_edge(&ring, 10, false));
        assert!(classifier.on_edge(&ring, 1_010, true));
        // A 20 us low spike: both edges are in turn, so both are kept.
        assert!(classifier.on_edge(&ring, 1_500, false));
        assert!(classifier.on_edge(&ring, 1_520, true));
        assert_eq!(ring.peek(2), Some(Interval::from_micros(490)));
        assert_eq!(ring.peek(3), Some(Interval::from_micros(20)));
        assert!(ring.peek(3).is_some_and(|spike| spike.as_micros() < BIT_PERIOD_US));
    }
}

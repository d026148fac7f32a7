//! Debounced push buttons with press, long-press, and double-click gestures.
//!
//! [`GestureTracker`] is the pure state machine: feed it debounced press and
//! release times and it reports [`ButtonEvent`]s. [`Button`] drives it from a
//! GPIO input.

use core::convert::Infallible;

use embassy_futures::select::{Either, select};
use embassy_time::{Duration, Instant, Timer};
use embedded_hal::digital::{ErrorType, InputPin};
use embedded_hal_async::digital::Wait;
use heapless::Deque;

use crate::config::DeskConfig;

/// Gestures reported by a button.
#[derive(Clone, Copy, Debug, Eq, Hash, PartialEq)]
#[cfg_attr(all(feature = "defmt", target_os = "none"), derive(defmt::Format))]
pub enum ButtonEvent {
    /// The button went down.
    PressStart,
    /// The button came back up, after any press.
    PressEnd,
    /// A second short click released within the double-click window.
    DoubleClick,
    /// The button has been held for the long-press time.
    LongPressStart,
    /// A long press was released.
    LongPressEnd,
}

/// Events produced by one press or release. At most two happen at once.
pub type ButtonEvents = heapless::Vec<ButtonEvent, 2>;

/// Gesture state machine for one button.
#[derive(Clone, Copy, Debug)]
pub struct GestureTracker {
    long_press: Duration,
    double_click_window: Duration,
    pressed_at: Option<Instant>,
    long_press_active: bool,
    last_click_released_at: Option<Instant>,
}

impl GestureTracker {
    #[must_use]
    pub const fn new(long_press: Duration, double_click_window: Duration) -> Self {
        Self {
            long_press,
            double_click_window,
            pressed_at: None,
            long_press_active: false,
            last_click_released_at: None,
        }
    }

    #[must_use]
    pub const fn is_pressed(&self) -> bool {
        self.pressed_at.is_some()
    }

    /// When [`GestureTracker::on_tick`] will report a long press, if the
    /// button stays down.
    #[must_use]
    pub fn long_press_deadline(&self) -> Option<Instant> {
        if self.long_press_active {
            return None;
        }
        self.pressed_at.map(|pressed_at| {
            pressed_at
                .checked_add(self.long_press)
                .unwrap_or(Instant::MAX)
        })
    }

    /// The button went down at `now`.
    pub fn on_press(&mut self, now: Instant) -> ButtonEvents {
        let mut events = ButtonEvents::new();
        if self.is_pressed() {
            return events;
        }
        self.pressed_at = Some(now);
        self.long_press_active = false;
        // Capacity is 2; the first push always fits.
        let _ = events.push(ButtonEvent::PressStart);
        events
    }

    /// The button came up at `now`.
    pub fn on_release(&mut self, now: Instant) -> ButtonEvents {
        let mut events = ButtonEvents::new();
        let Some(pressed_at) = self.pressed_at.take() else {
            return events;
        };

        if self.long_press_active {
            self.long_press_active = false;
            self.last_click_released_at = None;
            let _ = events.push(ButtonEvent::LongPressEnd);
            let _ = events.push(ButtonEvent::PressEnd);
            return events;
        }

        let _ = events.push(ButtonEvent::PressEnd);
        let second_click = self.last_click_released_at.is_some_and(|released_at| {
            pressed_at
                .checked_duration_since(released_at)
                .is_some_and(|gap| gap <= self.double_click_window)
        });
        if second_click {
            self.last_click_released_at = None;
            let _ = events.push(ButtonEvent::DoubleClick);
        } else {
            self.last_click_released_at = Some(now);
        }
        events
    }

    /// Time passed while the button may still be down.
    pub fn on_tick(&mut self, now: Instant) -> Option<ButtonEvent> {
        let deadline = self.long_press_deadline()?;
        if now < deadline {
            return None;
        }
        self.long_press_active = true;
        self.last_click_released_at = None;
        Some(ButtonEvent::LongPressStart)
    }
}

/// A debounced, active-high push button.
///
/// Pair it with a pull-down input; pressing connects the pin to 3.3 V.
pub struct Button<P> {
    pin: P,
    debounce: Duration,
    tracker: GestureTracker,
    pending: Deque<ButtonEvent, 4>,
}

impl<P> Button<P>
where
    P: InputPin + Wait + ErrorType<Error = Infallible>,
{
    #[must_use]
    pub fn new(pin: P, config: &DeskConfig) -> Self {
        Self {
            pin,
            debounce: config.button_debounce,
            tracker: GestureTracker::new(config.long_press, config.double_click_window),
            pending: Deque::new(),
        }
    }

    /// Wait for the next gesture.
    pub async fn next_event(&mut self) -> ButtonEvent {
        loop {
            if let Some(event) = self.pending.pop_front() {
                return event;
            }

            let changed = match self.tracker.long_press_deadline() {
                Some(deadline) => {
                    match select(self.wait_for_change(), Timer::at(deadline)).await {
                        Either::First(()) => true,
                        Either::Second(()) => false,
                    }
                }
                None => {
                    self.wait_for_change().await;
                    true
                }
            };

            if !changed {
                if let Some(event) = self.tracker.on_tick(Instant::now()) {
                    return event;
                }
                continue;
            }

            // Ignore the contact bounce, then trust whatever level remains.
            let now = Instant::now();
            Timer::after(self.debounce).await;
            let events = if self.is_down() {
                self.tracker.on_press(now)
            } else {
                self.tracker.on_release(now)
            };
            for event in events {
                // Never more than two queued at once; capacity is four.
                let _ = self.pending.push_back(event);
            }
        }
    }

    fn is_down(&mut self) -> bool {
        self.pin.is_high().unwrap_or_else(|never| match never {})
    }

    async fn wait_for_change(&mut self) {
        let result = if self.tracker.is_pressed() {
            self.pin.wait_for_low().await
        } else {
            self.pin.wait_for_high().await
        };
        result.unwrap_or_else(|never| match never {});
    }
}

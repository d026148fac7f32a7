//! Host-level tests: button gestures driving the desk state and relays
//! against a simulated desk.
#![cfg(not(target_os = "none"))]

use core::cell::Cell;
use core::convert::Infallible;

use desk_kit::button::GestureTracker;
use desk_kit::{ButtonEvent, ButtonId, DeskConfig, DeskState, Drive, Frame, RelayPair};
use embassy_time::Instant;
use embedded_hal::digital::{ErrorType, OutputPin};

/// One relay line. Shares its level with the simulated desk.
struct RelayPin<'a>(&'a Cell<bool>);

impl ErrorType for RelayPin<'_> {
    type Error = Infallible;
}

impl OutputPin for RelayPin<'_> {
    fn set_low(&mut self) -> Result<(), Self::Error> {
        self.0.set(false);
        Ok(())
    }

    fn set_high(&mut self) -> Result<(), Self::Error> {
        self.0.set(true);
        Ok(())
    }
}

/// A desk that moves one centimeter per control tick while a relay is on,
/// plus the controller logic wired to it.
struct Bench<'a> {
    height_cm: u8,
    up_line: &'a Cell<bool>,
    down_line: &'a Cell<bool>,
    relays: RelayPair<RelayPin<'a>, RelayPin<'a>>,
    state: DeskState,
    up: GestureTracker,
    down: GestureTracker,
    now_ms: u64,
}

impl<'a> Bench<'a> {
    fn new(height_cm: u8, up_line: &'a Cell<bool>, down_line: &'a Cell<bool>) -> Self {
        let config = DeskConfig::DEFAULT;
        let mut bench = Self {
            height_cm,
            up_line,
            down_line,
            relays: RelayPair::new(RelayPin(up_line), RelayPin(down_line))
                .expect("relay pins never fail"),
            state: DeskState::new(config.target_tolerance_cm),
            up: GestureTracker::new(config.long_press, config.double_click_window),
            down: GestureTracker::new(config.long_press, config.double_click_window),
            now_ms: 0,
        };
        bench.report_height();
        bench
    }

    fn now(&self) -> Instant {
        Instant::from_millis(self.now_ms)
    }

    fn tracker(&mut self, button: ButtonId) -> &mut GestureTracker {
        match button {
            ButtonId::Up => &mut self.up,
            ButtonId::Down => &mut self.down,
        }
    }

    fn dispatch(&mut self, button: ButtonId, events: impl IntoIterator<Item = ButtonEvent>) {
        for event in events {
            self.state.handle_button(button, event);
            self.control_tick();
        }
    }

    fn press(&mut self, button: ButtonId) {
        let now = self.now();
        let events = self.tracker(button).on_press(now);
        self.dispatch(button, events);
    }

    fn release(&mut self, button: ButtonId) {
        let now = self.now();
        let events = self.tracker(button).on_release(now);
        self.dispatch(button, events);
    }

    /// The desk reports its height the way the control unit encodes it.
    fn report_height(&mut self) {
        if let Some(height_cm) = Frame::from_height_cm(self.height_cm).height_cm() {
            self.state.update_height(height_cm);
        }
    }

    fn control_tick(&mut self) {
        let drive = self.state.step();
        self.relays.apply(drive).expect("relay pins never fail");
        assert!(
            !(self.up_line.get() && self.down_line.get()),
            "both relays on"
        );
    }

    /// Let `millis` pass, one control tick per 100 ms.
    fn wait(&mut self, millis: u64) {
        for _ in 0..millis / 100 {
            self.now_ms += 100;
            for button in [ButtonId::Up, ButtonId::Down] {
                let now = self.now();
                if let Some(event) = self.tracker(button).on_tick(now) {
                    self.dispatch(button, [event]);
                }
            }
            match self.relays.drive() {
                Drive::Up => self.height_cm += 1,
                Drive::Down => self.height_cm -= 1,
                Drive::Stop => {}
            }
            self.report_height();
            self.control_tick();
        }
    }

    fn store_preset(&mut self) {
        self.press(ButtonId::Up);
        self.press(ButtonId::Down);
        self.wait(100);
        self.release(ButtonId::Up);
        self.release(ButtonId::Down);
        self.wait(500);
    }

    fn double_click(&mut self, button: ButtonId) {
        self.press(button);
        self.wait(100);
        self.release(button);
        self.wait(100);
        self.press(button);
        self.wait(100);
        self.release(button);
    }
}

#[test]
fn hold_stores_presets_and_double_click_returns() {
    let up_line = Cell::new(false);
    let down_line = Cell::new(false);
    let mut bench = Bench::new(72, &up_line, &down_line);

    bench.store_preset();
    assert_eq!(bench.state.low_preset_cm(), Some(72));

    // Hold Up: nothing happens until the long press starts.
    bench.press(ButtonId::Up);
    bench.wait(400);
    assert_eq!(bench.height_cm, 72);
    bench.wait(3_800);
    assert!(bench.height_cm > 72);
    bench.release(ButtonId::Up);
    let raised_cm = bench.height_cm;
    assert_eq!(bench.relays.drive(), Drive::Stop);
    bench.wait(1_000);
    assert_eq!(bench.height_cm, raised_cm);

    bench.store_preset();
    assert_eq!(bench.state.high_preset_cm(), Some(raised_cm));

    bench.double_click(ButtonId::Down);
    assert_eq!(bench.state.target_cm(), Some(72));
    bench.wait(10_000);
    assert_eq!(bench.height_cm, 72);
    assert_eq!(bench.state.target_cm(), None);
    assert_eq!(bench.relays.drive(), Drive::Stop);

    bench.double_click(ButtonId::Up);
    bench.wait(10_000);
    assert_eq!(bench.height_cm, raised_cm);
}

#[test]
fn double_click_without_presets_does_not_move() {
    let up_line = Cell::new(false);
    let down_line = Cell::new(false);
    let mut bench = Bench::new(90, &up_line, &down_line);

    bench.double_click(ButtonId::Up);
    assert_eq!(bench.state.target_cm(), None);
    bench.wait(2_000);
    assert_eq!(bench.height_cm, 90);
    assert!(!up_line.get() && !down_line.get());
}

#[test]
fn long_press_interrupts_a_move() {
    let up_line = Cell::new(false);
    let down_line = Cell::new(false);
    let mut bench = Bench::new(70, &up_line, &down_line);
    bench.store_preset();
    bench.height_cm = 100;
    bench.report_height();
    bench.store_preset();

    bench.double_click(ButtonId::Down);
    bench.wait(1_000);
    assert!(bench.height_cm < 100);

    bench.press(ButtonId::Up);
    bench.wait(600);
    assert_eq!(bench.state.target_cm(), None);
    assert_eq!(bench.relays.drive(), Drive::Up);
    bench.release(ButtonId::Up);
    let stopped_at = bench.height_cm;
    bench.wait(1_000);
    assert_eq!(bench.height_cm, stopped_at);
}

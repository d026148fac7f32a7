//! A device abstraction for a LogicData standing desk with two preset buttons.
//!
//! See [`DeskController`] for usage examples.
use defmt::info;
use embassy_executor::{SendSpawner, Spawner};
use embassy_futures::select::{Either3, select3};
use embassy_rp::Peri;
use embassy_rp::gpio::{AnyPin, Input, Level, Output, Pin, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::channel::Channel as EmbassyChannel;
use embassy_time::{Ticker, Timer};

use crate::button::{Button, ButtonEvent};
use crate::config::DeskConfig;
use crate::desk_state::{ButtonId, DeskState, Drive};
use crate::height_reader::{HeightReader, HeightReaderStatic};
use crate::relays::RelayPair;
use crate::{Error, Never, Result};

// ===== Public API ===========================================================

/// Button gestures on their way from the button tasks to the control loop.
pub type DeskEvents = EmbassyChannel<CriticalSectionRawMutex, (ButtonId, ButtonEvent), 8>;

/// Static resources for the [`DeskController`] device abstraction.
///
/// See [`DeskController`] for usage examples.
pub struct DeskControllerStatic {
    height_reader: HeightReaderStatic,
    events: DeskEvents,
}

/// Drives a LogicData desk through two relays and remembers two preset
/// heights.
///
/// - Press both buttons together to store the current height as a preset.
///   The first two fill the low and high slots; later ones replace whichever
///   preset is closer.
/// - Double-click Up to go to the high preset, Down to go to the low one.
/// - Hold a button to move the desk by hand.
///
/// The desk only reports its height while it moves, so the controller nudges
/// it upward briefly at startup.
///
/// # Examples
/// ```no_run
/// # #![no_std]
/// # #![no_main]
/// # use panic_probe as _;
/// # use embassy_executor::{SendSpawner, Spawner};
/// # use desk_kit::config::DeskConfig;
/// # use desk_kit::desk_controller::{DeskController, DeskControllerStatic};
/// # async fn example(p: embassy_rp::Peripherals, spawner: Spawner) -> desk_kit::Result<()> {
/// static DESK_CONTROLLER_STATIC: DeskControllerStatic = DeskController::new_static();
/// let desk_controller = DeskController::new(
///     p.PIN_2,
///     p.PIN_16,
///     p.PIN_17,
///     p.PIN_14,
///     p.PIN_15,
///     &DESK_CONTROLLER_STATIC,
///     DeskConfig::DEFAULT,
///     spawner,
///     spawner.make_send(),
/// )?;
/// let never = desk_controller.run().await?;
/// match never {}
/// # }
/// ```
pub struct DeskController {
    height_reader: HeightReader<'static>,
    relays: RelayPair<Output<'static>, Output<'static>>,
    events: &'static DeskEvents,
    state: DeskState,
    config: DeskConfig,
}

impl DeskController {
    /// Create static resources for the desk controller.
    ///
    /// See [`DeskController`] for usage examples.
    #[must_use]
    pub const fn new_static() -> DeskControllerStatic {
        DeskControllerStatic {
            height_reader: HeightReader::new_static(),
            events: EmbassyChannel::new(),
        }
    }

    /// Wire up the desk: the LogicData line, the two relays, and the two
    /// buttons (active high, pulled down).
    ///
    /// The button tasks run on `spawner`. Edge capture runs on
    /// `capture_spawner`; see [`HeightReader`] for choosing it.
    ///
    /// See [`DeskController`] for usage examples.
    ///
    /// # Errors
    /// Returns an error if `config` is unusable or a background task cannot
    /// be spawned.
    #[expect(clippy::too_many_arguments, reason = "one argument per wired pin and executor")]
    pub fn new(
        data_pin: Peri<'static, impl Pin>,
        up_relay_pin: Peri<'static, impl Pin>,
        down_relay_pin: Peri<'static, impl Pin>,
        up_button_pin: Peri<'static, impl Pin>,
        down_button_pin: Peri<'static, impl Pin>,
        controller_static: &'static DeskControllerStatic,
        config: DeskConfig,
        spawner: Spawner,
        capture_spawner: SendSpawner,
    ) -> Result<Self> {
        let config = config.validate()?;

        // Relays first, so the desk is never driven by a floating pin.
        let relays = RelayPair::new(
            Output::new(up_relay_pin, Level::Low),
            Output::new(down_relay_pin, Level::Low),
        )?;

        // The button tasks run forever once spawned, so they go last.
        let height_reader = HeightReader::new(
            data_pin,
            &controller_static.height_reader,
            capture_spawner,
        )?;

        let events = &controller_static.events;
        let up_button_pin: Peri<'static, AnyPin> = up_button_pin.into();
        let down_button_pin: Peri<'static, AnyPin> = down_button_pin.into();
        for (button_id, pin) in [
            (ButtonId::Up, up_button_pin),
            (ButtonId::Down, down_button_pin),
        ] {
            let button = Button::new(Input::new(pin, Pull::Down), &config);
            let token = button_task(button_id, button, events).map_err(Error::TaskSpawn)?;
            spawner.spawn(token);
        }

        info!("Desk controller ready: {}", config);
        Ok(Self {
            height_reader,
            relays,
            events,
            state: DeskState::new(config.target_tolerance_cm),
            config,
        })
    }

    /// Run the control loop forever.
    ///
    /// See [`DeskController`] for usage examples.
    ///
    /// # Errors
    /// Returns an error if a relay output cannot be set. The relays are
    /// released first when possible.
    pub async fn run(mut self) -> Result<Never> {
        let result = self.control_loop().await;
        if self.relays.apply(Drive::Stop).is_err() {
            defmt::error!("Relays could not be released");
        }
        result
    }

    async fn control_loop(&mut self) -> Result<Never> {
        info!("Initial nudge: Up for {} ms", self.config.initial_nudge.as_millis());
        self.relays.apply(Drive::Up)?;
        Timer::after(self.config.initial_nudge).await;
        self.relays.apply(Drive::Stop)?;

        let mut height_ticker = Ticker::every(self.config.height_read_interval);
        let mut control_ticker = Ticker::every(self.config.control_loop_period);
        loop {
            match select3(
                height_ticker.next(),
                control_ticker.next(),
                self.events.receive(),
            )
            .await
            {
                Either3::First(()) => self.read_height(),
                Either3::Second(()) => self.relays.apply(self.state.step())?,
                Either3::Third((button_id, event)) => {
                    info!("Button {}: {}", button_id, event);
                    self.state.handle_button(button_id, event);
                    self.relays.apply(self.state.step())?;
                }
            }
        }
    }

    fn read_height(&mut self) {
        let Some(height_cm) = self.height_reader.poll_height_cm() else {
            return;
        };
        if self.state.height_cm() != Some(height_cm) {
            info!("Height: {} cm", height_cm);
        }
        self.state.update_height(height_cm);
    }
}

#[embassy_executor::task(pool_size = 2)]
async fn button_task(
    button_id: ButtonId,
    mut button: Button<Input<'static>>,
    events: &'static DeskEvents,
) -> ! {
    loop {
        let event = button.next_event().await;
        events.send((button_id, event)).await;
    }
}

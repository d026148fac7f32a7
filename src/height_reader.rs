//! A device abstraction for the LogicData height line of a standing desk.
//!
//! See [`HeightReader`] for usage examples.
use defmt::info;
use embassy_executor::SendSpawner;
use embassy_futures::select::{Either, select};
use embassy_rp::Peri;
use embassy_rp::gpio::{AnyPin, Input, Pin, Pull};
use embassy_sync::blocking_mutex::raw::CriticalSectionRawMutex;
use embassy_sync::signal::Signal;
use embassy_time::Instant;

use crate::decoder::{decode_frame, read_height_cm};
use crate::edge_ring::{EdgeClassifier, EdgeRing};
use crate::frame::Frame;
use crate::{Error, Result};

// ===== Public API ===========================================================

/// Static resources for the [`HeightReader`] device abstraction.
///
/// See [`HeightReader`] for usage examples.
pub struct HeightReaderStatic {
    ring: EdgeRing,
    stop: Signal<CriticalSectionRawMutex, ()>,
    stopped: Signal<CriticalSectionRawMutex, ()>,
}

/// Reads the height a LogicData control unit reports on its data line.
///
/// A background task records the timing of every edge on the pin. Polling
/// decodes whatever complete frame has arrived since the last poll. The desk
/// only transmits while it moves or shortly after, so most polls return
/// `None`.
///
/// Edge timestamps are only as prompt as the executor that runs the capture
/// task. Give [`HeightReader::new`] the spawner of an
/// [`InterruptExecutor`](embassy_executor::InterruptExecutor) so capture
/// preempts thread-mode work such as decoding; `demos/desk.rs` shows the
/// setup. A thread-mode spawner (`spawner.make_send()`) works when nothing
/// else on that executor runs for long between yields.
///
/// # Examples
/// ```no_run
/// # #![no_std]
/// # #![no_main]
/// # use panic_probe as _;
/// # use defmt::info;
/// # use embassy_executor::SendSpawner;
/// # use embassy_time::Timer;
/// # use desk_kit::height_reader::{HeightReader, HeightReaderStatic};
/// # async fn example(p: embassy_rp::Peripherals, spawner: Spawner) -> desk_kit::Result<()> {
/// static HEIGHT_READER_STATIC: HeightReaderStatic = HeightReader::new_static();
/// let height_reader = HeightReader::new(p.PIN_2, &HEIGHT_READER_STATIC, spawner.make_send())?;
///
/// loop {
///     if let Some(height_cm) = height_reader.poll_height_cm() {
///         info!("Desk height: {} cm", height_cm);
///     }
///     Timer::after_millis(50).await;
/// }
/// # }
/// ```
pub struct HeightReader<'a> {
    reader_static: &'a HeightReaderStatic,
}

impl HeightReader<'_> {
    /// Create static resources for the height reader.
    ///
    /// See [`HeightReader`] for usage examples.
    #[must_use]
    pub const fn new_static() -> HeightReaderStatic {
        HeightReaderStatic {
            ring: EdgeRing::new(),
            stop: Signal::new(),
            stopped: Signal::new(),
        }
    }

    /// Start capturing the LogicData line on `pin`.
    ///
    /// Only one reader can run at a time. A stopped reader's static can be
    /// reused.
    ///
    /// See [`HeightReader`] for usage examples.
    ///
    /// # Errors
    /// Returns an error if the capture task cannot be spawned, for example
    /// because another reader is still running.
    pub fn new<P: Pin>(
        pin: Peri<'static, P>,
        reader_static: &'static HeightReaderStatic,
        capture_spawner: SendSpawner,
    ) -> Result<Self> {
        let any: Peri<'static, AnyPin> = pin.into();
        // The line idles high.
        let input = Input::new(any, Pull::Up);
        let token = edge_capture_task(input, reader_static).map_err(Error::TaskSpawn)?;
        reader_static.stop.reset();
        reader_static.stopped.reset();
        reader_static.ring.clear();
        capture_spawner.spawn(token);
        Ok(Self { reader_static })
    }

    /// Decode the next frame, if a complete one has arrived. The frame is not
    /// validated.
    #[must_use]
    pub fn poll_frame(&self) -> Option<Frame> {
        decode_frame(&self.reader_static.ring)
    }

    /// The desk height in centimeters, if a valid height frame has arrived.
    #[must_use]
    pub fn poll_height_cm(&self) -> Option<u8> {
        read_height_cm(&self.reader_static.ring)
    }

    /// Stop capturing and release the pin.
    ///
    /// Once this returns, nothing more is recorded.
    pub async fn stop(self) {
        self.reader_static.stop.signal(());
        self.reader_static.stopped.wait().await;
    }
}

#[embassy_executor::task]
async fn edge_capture_task(mut pin: Input<'static>, reader_static: &'static HeightReaderStatic) {
    let ring = &reader_static.ring;
    let mut classifier = EdgeClassifier::new(Instant::now().as_micros());

    info!("LogicData capture started");
    loop {
        match select(pin.wait_for_any_edge(), reader_static.stop.wait()).await {
            Either::First(()) => {
                // Timestamp before reading the level.
                let now_us = Instant::now().as_micros();
                classifier.on_edge(ring, now_us, pin.is_high());
            }
            Either::Second(()) => break,
        }
    }

    // Dropping the input disables its edge interrupt.
    drop(pin);
    info!("LogicData capture stopped");
    reader_static.stopped.signal(());
}

//! Log every height a LogicData desk reports, and every frame it sends.
//!
//! Connect the data line to GP2 and move the desk with its own handset.
//! Capture stops after a minute without a frame.
//!
//! Run with: cargo xtask demo height_log
#![no_std]
#![no_main]
#![cfg(target_os = "none")]
#![allow(clippy::future_not_send, reason = "Single-threaded")]

use core::{future, panic};

use defmt::info;
use desk_kit::{DeskConfig, HeightReader, HeightReaderStatic, Result};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use embassy_time::{Duration, Instant, Ticker};
use {defmt_rtt as _, panic_probe as _};

/// Tell the RP2350 Boot ROM about our application.
#[cfg(feature = "pico2")]
#[unsafe(link_section = ".start_block")]
#[used]
#[expect(unsafe_code, reason = "Boot ROM image definition must live in .start_block")]
pub static IMAGE_DEF: embassy_rp::block::ImageDef = embassy_rp::block::ImageDef::secure_exe();

/// Runs LogicData edge capture above the thread-mode executor, so edges are
/// timestamped even while the polling loop is decoding.
static CAPTURE_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
#[expect(unsafe_code, reason = "interrupt handlers are unsafe to define")]
unsafe fn SWI_IRQ_1() {
    // SAFETY: SWI_IRQ_1 is reserved for CAPTURE_EXECUTOR and nothing else
    // pends it.
    unsafe { CAPTURE_EXECUTOR.on_interrupt() }
}

const QUIET_LIMIT: Duration = Duration::from_secs(60);

#[embassy_executor::main]
pub async fn main(_spawner: Spawner) -> ! {
    if let Err(err) = inner_main().await {
        panic!("{err}");
    }
    future::pending().await
}

async fn inner_main() -> Result<()> {
    let p = embassy_rp::init(Default::default());

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let capture_spawner = CAPTURE_EXECUTOR.start(interrupt::SWI_IRQ_1);
    let config = DeskConfig::DEFAULT.validate()?;

    static HEIGHT_READER_STATIC: HeightReaderStatic = HeightReader::new_static();
    let height_reader = HeightReader::new(p.PIN_2, &HEIGHT_READER_STATIC, capture_spawner)?;
    info!("Listening on GP2");

    let mut ticker = Ticker::every(config.height_read_interval);
    let mut last_frame_at = Instant::now();
    while last_frame_at.elapsed() < QUIET_LIMIT {
        ticker.next().await;
        let Some(frame) = height_reader.poll_frame() else {
            continue;
        };
        last_frame_at = Instant::now();
        match frame.height_cm() {
            Some(height_cm) => info!("Height: {} cm (frame 0x{:08X})", height_cm, frame.word()),
            None => info!("Other frame: 0x{:08X} valid={}", frame.word(), frame.is_valid()),
        }
    }

    info!("No frames for {} s; stopping capture", QUIET_LIMIT.as_secs());
    height_reader.stop().await;
    info!("Capture stopped");
    Ok(())
}

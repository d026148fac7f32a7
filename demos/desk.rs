//! Standing desk controller for a LogicData control unit.
//!
//! Wiring:
//! - GP2: LogicData data line (through a level shifter)
//! - GP16 / GP17: Up / Down relays, wired across the handset switches
//! - GP14 / GP15: Up / Down push buttons to 3.3 V
//!
//! Press both buttons to store a preset, double-click to go to one, hold to
//! move by hand.
//!
//! Run with: cargo xtask demo desk
#![no_std]
#![no_main]
#![cfg(target_os = "none")]
#![allow(clippy::future_not_send, reason = "Single-threaded")]

use core::panic;

use defmt::info;
use desk_kit::{DeskConfig, DeskController, DeskControllerStatic, Never, Result};
use embassy_executor::{InterruptExecutor, Spawner};
use embassy_rp::interrupt;
use embassy_rp::interrupt::{InterruptExt, Priority};
use {defmt_rtt as _, panic_probe as _};

/// Tell the RP2350 Boot ROM about our application.
#[cfg(feature = "pico2")]
#[unsafe(link_section = ".start_block")]
#[used]
#[expect(unsafe_code, reason = "Boot ROM image definition must live in .start_block")]
pub static IMAGE_DEF: embassy_rp::block::ImageDef = embassy_rp::block::ImageDef::secure_exe();

/// Runs LogicData edge capture above the thread-mode executor, so edges are
/// timestamped even while the decoder or control loop is busy.
static CAPTURE_EXECUTOR: InterruptExecutor = InterruptExecutor::new();

#[interrupt]
#[expect(unsafe_code, reason = "interrupt handlers are unsafe to define")]
unsafe fn SWI_IRQ_1() {
    // SAFETY: SWI_IRQ_1 is reserved for CAPTURE_EXECUTOR and nothing else
    // pends it.
    unsafe { CAPTURE_EXECUTOR.on_interrupt() }
}

#[embassy_executor::main]
pub async fn main(spawner: Spawner) -> ! {
    // If it returns, something went wrong.
    let err = inner_main(spawner).await.unwrap_err();
    panic!("{err}");
}

async fn inner_main(spawner: Spawner) -> Result<Never> {
    let p = embassy_rp::init(Default::default());

    interrupt::SWI_IRQ_1.set_priority(Priority::P2);
    let capture_spawner = CAPTURE_EXECUTOR.start(interrupt::SWI_IRQ_1);

    static DESK_CONTROLLER_STATIC: DeskControllerStatic = DeskController::new_static();
    let desk_controller = DeskController::new(
        p.PIN_2,
        p.PIN_16,
        p.PIN_17,
        p.PIN_14,
        p.PIN_15,
        &DESK_CONTROLLER_STATIC,
        DeskConfig::DEFAULT,
        spawner,
        capture_spawner,
    )?;

    info!("Desk controller started");
    desk_controller.run().await
}

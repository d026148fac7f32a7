//! Height capture and preset control for LogicData standing desks.
//!
//! The pure protocol and control modules ([`edge_ring`], [`decoder`],
//! [`frame`], [`button`], [`desk_state`], [`relays`]) build and test on the
//! host. The device abstractions (`height_reader`, `desk_controller`) need
//! a Pico.
#![cfg_attr(target_os = "none", no_std)]
#![cfg_attr(target_os = "none", no_main)]

#[cfg(all(target_os = "none", not(any(feature = "pico1", feature = "pico2"))))]
compile_error!("Firmware builds need a board feature: enable `pico1` or `pico2`.");

#[cfg(all(feature = "pico1", feature = "pico2"))]
compile_error!("Features `pico1` and `pico2` are mutually exclusive.");

#[cfg(all(target_os = "none", not(feature = "defmt")))]
compile_error!("Firmware builds log through defmt: enable the `defmt` feature.");

pub mod button;
pub mod config;
pub mod decoder;
#[cfg(target_os = "none")]
pub mod desk_controller;
pub mod desk_state;
pub mod edge_ring;
mod error;
pub mod frame;
#[cfg(target_os = "none")]
pub mod height_reader;
mod never;
pub mod relays;

// Re-export commonly used items
pub use button::{Button, ButtonEvent};
pub use config::DeskConfig;
pub use decoder::{EdgeSource, decode_frame, read_height_cm};
#[cfg(target_os = "none")]
pub use desk_controller::{DeskController, DeskControllerStatic};
pub use desk_state::{ButtonId, DeskState, Drive};
pub use edge_ring::{EdgeClassifier, EdgeRing, Interval};
pub use error::{Error, Result};
pub use frame::Frame;
#[cfg(target_os = "none")]
pub use height_reader::{HeightReader, HeightReaderStatic};
pub use never::Never;
pub use relays::RelayPair;

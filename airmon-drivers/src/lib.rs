//! Device drivers
//!
//! Concrete implementations of the collaborator traits defined in
//! `airmon-core`, written against the capability traits of `airmon-hal`:
//!
//! - SGP30-class gas/humidity sensor over I2C
//! - ST7735-class TFT controller over QSPI, with seven-segment and gauge
//!   rendering of display regions

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod display;
pub mod sensor;

pub use display::St7735;
pub use sensor::Sgp30;

//! airmon Hardware Abstraction Layer
//!
//! This crate defines the capability traits the coordination layer consumes.
//! Each board supplies implementations backed by its vendor peripheral
//! drivers; the variant set is closed per board and selected at compile time
//! through generics, never through trait objects.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────┐
//! │  airmon-firmware (main loop, ISRs)      │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  airmon-core / airmon-drivers           │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  airmon-hal (this crate - traits)       │
//! └─────────────────────────────────────────┘
//!                     │
//!                     ▼
//! ┌─────────────────────────────────────────┐
//! │  board support (timer, gpio, uart, ...) │
//! └─────────────────────────────────────────┘
//! ```
//!
//! # Traits
//!
//! - [`timer::TickSource`], [`timer::Timer`], [`timer::Delay`] - Timebase
//! - [`gpio::OutputPin`] - Digital outputs
//! - [`i2c::I2cBus`] - I2C master
//! - [`qspi::QspiBus`] - QSPI command/data transfers
//! - [`pwm::PwmChannel`] - PWM duty control
//! - [`uart::UartTx`], [`uart::UartRx`] - Serial communication

#![no_std]
#![deny(unsafe_code)]

pub mod gpio;
pub mod i2c;
pub mod pwm;
pub mod qspi;
pub mod timer;
pub mod uart;

// Re-export key traits at crate root for convenience
pub use gpio::{EhOutputPin, Level, OutputPin};
pub use i2c::{I2cBus, I2cFault};
pub use pwm::PwmChannel;
pub use qspi::{QspiBus, QspiFault};
pub use timer::{Delay, TickCallback, TickSource, Timer};
pub use uart::{UartRx, UartTx, UartWriter};

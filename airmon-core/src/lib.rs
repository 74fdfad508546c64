//! Board-agnostic peripheral coordination for the air quality monitor
//!
//! This crate contains the logic that sits between the capability traits in
//! `airmon-hal` and the firmware main loop:
//!
//! - Bus arbiter serializing access to the QSPI and I2C buses
//! - Tick counter driven by the hardware timer interrupt
//! - Double-buffered, tear-free publication of sensor readings
//! - Sensor sampling scheduler with failure backoff
//! - Display command pipeline (region queue + redraw)
//! - Host link command decoding, dispatch and bounded transmit
//! - Compiled-in configuration
//!
//! Nothing here allocates; every buffer is fixed-capacity.

#![no_std]
#![deny(unsafe_code)]

#[cfg(test)]
extern crate std;

pub mod backoff;
pub mod bus;
pub mod config;
pub mod display;
pub mod error;
pub mod host;
pub mod reading;
pub mod sampler;
pub mod tick;
pub mod traits;

pub use backoff::{FailureBackoff, Transition};
pub use bus::{BusArbiter, BusGuard, BusId, BusStatus, ComponentId};
pub use config::HalConfig;
pub use display::{DisplayFrame, DisplayPipeline, RedrawOutcome, RegionId};
pub use error::{BusError, LinkError, RedrawError, SampleError};
pub use host::{DispatchContext, HostLink};
pub use reading::{RawCounts, ReadingPublisher, ReadingStore, SensorReading};
pub use sampler::{SampleOutcome, Sampler};
pub use tick::{Tick, TickCounter};
pub use traits::{
    DisplayController, DisplayError, GasSensor, Rect, Region, RegionContent, Rgb565, SensorError,
};

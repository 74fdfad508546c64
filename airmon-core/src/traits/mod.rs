//! Collaborator traits
//!
//! These traits define the interface between the coordination layer and the
//! device drivers in `airmon-drivers` (or test doubles).

pub mod display;
pub mod sensor;

pub use display::{DisplayController, DisplayError, Rect, Region, RegionContent, Rgb565};
pub use sensor::{GasSensor, SensorError};

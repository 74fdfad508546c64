//! Sensor drivers

pub mod sgp30;

pub use sgp30::Sgp30;

//! Gas/humidity sensor trait

use crate::reading::RawCounts;

/// Errors reported by a sensor driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SensorError {
    /// Bus transaction failed (NACK, arbitration loss)
    Bus,
    /// Data word failed its CRC check
    Crc,
    /// Device did not respond in time
    Timeout,
}

/// Trait for SGP30-class gas sensors
///
/// The caller holds the I2C bus through the arbiter for the whole call.
pub trait GasSensor {
    /// Bring the sensor into measurement mode
    ///
    /// Called once after power-up and again after every power cycle.
    fn init(&mut self) -> Result<(), SensorError>;

    /// Run one measurement and return the raw signal words
    ///
    /// Blocks for the conversion time.
    fn measure(&mut self) -> Result<RawCounts, SensorError>;
}

//! Sensor readings and their conversion from raw counts

mod store;

pub use store::{ReadingPublisher, ReadingStore};

use airmon_protocol::ReadingReport;

use crate::error::SampleError;
use crate::tick::Tick;

/// Largest gas signal the sensor can report (ppm)
pub const MAX_GAS_PPM: u16 = 60_000;

/// Raw signal words as read from the sensor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct RawCounts {
    /// Gas concentration word (ppm, 1 LSB = 1 ppm)
    pub gas: u16,
    /// Absolute humidity word (g/m³, 8.8 fixed point)
    pub humidity: u16,
}

impl RawCounts {
    pub const fn new(gas: u16, humidity: u16) -> Self {
        Self { gas, humidity }
    }

    /// Convert to engineering units
    ///
    /// `gas_ppm = gas`, `humidity_mg_m3 = humidity * 1000 / 256`.
    /// A gas word beyond the sensor's range is rejected as malformed.
    pub fn convert(&self, tick: Tick) -> Result<SensorReading, SampleError> {
        if self.gas > MAX_GAS_PPM {
            return Err(SampleError::Malformed);
        }
        Ok(SensorReading {
            gas_ppm: self.gas,
            humidity_mg_m3: (self.humidity as u32 * 1000) / 256,
            tick,
            valid: true,
        })
    }
}

/// Snapshot of one sample
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SensorReading {
    pub gas_ppm: u16,
    pub humidity_mg_m3: u32,
    /// Tick the sample was scheduled at
    pub tick: Tick,
    /// False when the sample failed; the values are then zero
    pub valid: bool,
}

impl SensorReading {
    /// Placeholder published before the first sample
    pub const EMPTY: Self = Self {
        gas_ppm: 0,
        humidity_mg_m3: 0,
        tick: 0,
        valid: false,
    };

    /// A failed sample at `tick`
    pub const fn invalid(tick: Tick) -> Self {
        Self {
            tick,
            ..Self::EMPTY
        }
    }
}

impl Default for SensorReading {
    fn default() -> Self {
        Self::EMPTY
    }
}

impl From<SensorReading> for ReadingReport {
    fn from(r: SensorReading) -> Self {
        ReadingReport {
            valid: r.valid,
            gas_ppm: r.gas_ppm,
            humidity_mg_m3: r.humidity_mg_m3,
            tick: r.tick,
        }
    }
}

//! Shared bus arbitration
//!
//! Each physical bus has exactly one [`BusArbiter`] slot that lives for the
//! whole process. A component must hold the bus, through a [`BusGuard`],
//! for the full duration of a logical transaction so that no two
//! transactions interleave their bytes.

pub mod arbiter;

pub use arbiter::{BusArbiter, BusGuard, BusStatus, MAX_WAITERS};

/// Number of arbitrated buses
pub const BUS_COUNT: usize = 2;

/// Physical bus identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusId {
    /// Display bus
    Qspi,
    /// Sensor bus
    I2c,
}

impl BusId {
    pub const ALL: [BusId; BUS_COUNT] = [BusId::Qspi, BusId::I2c];

    pub const fn index(self) -> usize {
        match self {
            BusId::Qspi => 0,
            BusId::I2c => 1,
        }
    }
}

/// Components that may hold a bus
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ComponentId {
    Sampler,
    Display,
    HostLink,
}

//! Error taxonomy of the coordination layer
//!
//! | Error | Class | Handling |
//! |---|---|---|
//! | [`BusError::Busy`] | transient | retried locally with backoff |
//! | [`BusError::Fault`] | hardware | retried with backoff |
//! | [`BusError::NotOwner`] | programming error | panics in strict mode |
//! | [`SampleError::Overrun`] | main loop stall | invalid reading published |
//! | `FrameError` | malformed host input | discarded, parser resyncs |
//! | [`LinkError::Timeout`] | transmit stall | response dropped and logged |

use crate::traits::{DisplayError, SensorError};

/// Bus arbitration failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum BusError {
    /// Another component held the bus for the whole timeout
    Busy,
    /// The peripheral reported a hardware fault on the last transaction
    Fault,
    /// Release attempted by a component that does not hold the bus
    NotOwner,
}

/// Host link transmit failures
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum LinkError {
    /// Transmit FIFO stayed full past the timeout
    Timeout,
    /// UART driver reported an error
    Uart,
    /// Response did not fit a frame
    Encode,
}

/// Why a sample came out invalid
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum SampleError {
    Bus(BusError),
    Sensor(SensorError),
    /// Raw counts outside the sensor's output range
    Malformed,
    /// The sampling tick passed while the main loop was stalled
    Overrun,
}

impl From<BusError> for SampleError {
    fn from(e: BusError) -> Self {
        SampleError::Bus(e)
    }
}

impl From<SensorError> for SampleError {
    fn from(e: SensorError) -> Self {
        SampleError::Sensor(e)
    }
}

/// Why a redraw was skipped
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RedrawError {
    Bus(BusError),
    Display(DisplayError),
}

impl From<BusError> for RedrawError {
    fn from(e: BusError) -> Self {
        RedrawError::Bus(e)
    }
}

impl From<DisplayError> for RedrawError {
    fn from(e: DisplayError) -> Self {
        RedrawError::Display(e)
    }
}

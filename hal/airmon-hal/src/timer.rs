//! Timebase abstractions
//!
//! The hardware timer's periodic interrupt is the system's only clock. One
//! tick is one period of that interrupt; all timeouts in the coordination
//! layer are expressed in ticks.

/// Callback invoked from the timer interrupt on every period
pub type TickCallback = fn();

/// Read-only view of the monotonic tick count
pub trait TickSource {
    /// Current tick count (wraps at `u32::MAX`)
    fn now(&self) -> u32;
}

/// Periodic hardware timer
pub trait Timer: TickSource {
    /// Error type for timer configuration
    type Error;

    /// Start firing `callback` every `period_ticks` base timer periods
    fn start_periodic(
        &mut self,
        period_ticks: u32,
        callback: TickCallback,
    ) -> Result<(), Self::Error>;
}

/// Busy-wait delays
///
/// Used only for short datasheet delays inside a driver transaction
/// (conversion times, reset pulses).
pub trait Delay {
    /// Delay for at least `us` microseconds
    fn delay_us(&mut self, us: u32);

    /// Delay for at least `ms` milliseconds
    fn delay_ms(&mut self, ms: u32) {
        for _ in 0..ms {
            self.delay_us(1000);
        }
    }
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn now(&self) -> u32 {
        (**self).now()
    }
}

//! Digital outputs
//!
//! Chip-select lines, the display reset line and the sensor supply switch
//! are all driven through these traits.

use core::convert::Infallible;

/// Logic level of a pin
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum Level {
    Low,
    High,
}

impl From<bool> for Level {
    fn from(high: bool) -> Self {
        if high {
            Level::High
        } else {
            Level::Low
        }
    }
}

/// Push-pull output as seen by drivers
///
/// `is_set_high` reports the driven level, not the pad.
pub trait OutputPin {
    fn set_high(&mut self);

    fn set_low(&mut self);

    fn set(&mut self, level: Level) {
        match level {
            Level::High => self.set_high(),
            Level::Low => self.set_low(),
        }
    }

    fn toggle(&mut self) {
        let level = Level::from(!self.is_set_high());
        self.set(level);
    }

    fn is_set_high(&self) -> bool;

    fn is_set_low(&self) -> bool {
        !self.is_set_high()
    }
}

/// Adapter for any infallible `embedded-hal` 1.0 output pin
///
/// The driven level is mirrored locally so `is_set_high` does not need
/// `StatefulOutputPin` support from the underlying HAL.
pub struct EhOutputPin<P> {
    pin: P,
    high: bool,
}

impl<P> EhOutputPin<P>
where
    P: embedded_hal::digital::OutputPin<Error = Infallible>,
{
    /// Wrap a pin, driving it to `initial`
    pub fn new(mut pin: P, initial: Level) -> Self {
        let high = initial == Level::High;
        let _ = pin.set_state(high.into());
        Self { pin, high }
    }

    /// Release the wrapped pin
    pub fn into_inner(self) -> P {
        self.pin
    }
}

impl<P> OutputPin for EhOutputPin<P>
where
    P: embedded_hal::digital::OutputPin<Error = Infallible>,
{
    fn set_high(&mut self) {
        let _ = self.pin.set_high();
        self.high = true;
    }

    fn set_low(&mut self) {
        let _ = self.pin.set_low();
        self.high = false;
    }

    fn is_set_high(&self) -> bool {
        self.high
    }
}

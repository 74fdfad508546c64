//! Compile-time board selection
//!
//! Each board crate implements [`Board`] once, naming its concrete
//! peripheral types. The firmware is generic over it, so there is no
//! runtime dispatch.

use airmon_core::traits::{DisplayController, GasSensor};
use airmon_hal::{Delay, OutputPin, PwmChannel, UartTx};

pub trait Board {
    /// Shown in the boot banner
    const NAME: &'static str;

    /// SGP30-class sensor on the I2C bus
    type Sensor: GasSensor;
    /// ST7735-class controller on the QSPI bus
    type Display: DisplayController;
    /// Transmit half of the host UART (`hp_uart`)
    type HostTx: UartTx;
    /// Plain-text console (`sys_uart`)
    type Console: UartTx;
    /// Display backlight
    type Backlight: PwmChannel;
    /// Sensor supply switch (high = powered)
    type SensorPower: OutputPin;
    type Delay: Delay;
}

/// Peripherals handed to [`App::new`](crate::App::new)
pub struct BoardParts<B: Board> {
    pub sensor: B::Sensor,
    pub display: B::Display,
    pub host_tx: B::HostTx,
    pub console: B::Console,
    pub backlight: B::Backlight,
    pub sensor_power: B::SensorPower,
    pub delay: B::Delay,
}

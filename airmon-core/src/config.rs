//! Compiled-in configuration
//!
//! There is no configuration file or persisted state. Boards override
//! individual values by building their own `HalConfig` constant.

use crate::tick::Tick;

/// Default sampling period (ticks)
pub const DEFAULT_SAMPLING_PERIOD_TICKS: Tick = 100;

/// Bounds accepted for a host-requested sampling period
pub const MIN_SAMPLING_PERIOD_TICKS: Tick = 10;
pub const MAX_SAMPLING_PERIOD_TICKS: Tick = 60_000;

/// I2C acquisition timeout (ticks)
pub const I2C_TIMEOUT_TICKS: Tick = 2;

/// QSPI acquisition timeout (ticks)
pub const QSPI_TIMEOUT_TICKS: Tick = 4;

/// Longest a component may hold the I2C bus before it is force-released (ticks)
pub const I2C_MAX_HOLD_TICKS: Tick = 20;

/// Longest a component may hold the QSPI bus before it is force-released (ticks)
pub const QSPI_MAX_HOLD_TICKS: Tick = 50;

/// Consecutive failures before a component degrades
pub const FAILURE_THRESHOLD: u8 = 3;

/// Period multiplier applied on each degradation step
pub const BACKOFF_FACTOR: u32 = 2;

/// Degradation steps before the period stops growing (2^3 = 8x)
pub const MAX_BACKOFF_SHIFT: u8 = 3;

/// Bus acquisition attempts per sample or redraw
pub const MAX_BUS_ATTEMPTS: u8 = 3;

/// Transmit stall budget for one host response (ticks)
pub const UART_TX_TIMEOUT_TICKS: Tick = 5;

/// Redraw every N sampling periods
pub const REDRAW_DIVISOR: u32 = 1;

/// Backlight brightness at startup
pub const BACKLIGHT_PERCENT: u8 = 80;

/// Bus arbiter settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct ArbiterConfig {
    /// Maximum hold per bus, indexed by `BusId::index()`
    pub max_hold: [Tick; crate::bus::BUS_COUNT],
    /// Panic on release by a non-owner instead of returning an error
    pub strict_ownership: bool,
}

impl ArbiterConfig {
    pub const DEFAULT: Self = Self {
        max_hold: [QSPI_MAX_HOLD_TICKS, I2C_MAX_HOLD_TICKS],
        strict_ownership: cfg!(debug_assertions),
    };
}

impl Default for ArbiterConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Failure backoff parameters
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct BackoffConfig {
    pub threshold: u8,
    pub factor: u32,
    pub max_shift: u8,
}

impl BackoffConfig {
    pub const DEFAULT: Self = Self {
        threshold: FAILURE_THRESHOLD,
        factor: BACKOFF_FACTOR,
        max_shift: MAX_BACKOFF_SHIFT,
    };
}

impl Default for BackoffConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Sensor sampling scheduler settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct SamplerConfig {
    /// Base sampling period (ticks)
    pub period: Tick,
    /// I2C acquisition timeout for the first attempt (ticks)
    pub bus_timeout: Tick,
    /// Acquisition attempts per sample; the timeout doubles on each retry
    pub max_attempts: u8,
    pub backoff: BackoffConfig,
}

impl SamplerConfig {
    pub const DEFAULT: Self = Self {
        period: DEFAULT_SAMPLING_PERIOD_TICKS,
        bus_timeout: I2C_TIMEOUT_TICKS,
        max_attempts: MAX_BUS_ATTEMPTS,
        backoff: BackoffConfig::DEFAULT,
    };
}

impl Default for SamplerConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Display pipeline settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct DisplayConfig {
    /// Redraw cadence (ticks)
    pub redraw_period: Tick,
    /// QSPI acquisition timeout for the first attempt (ticks)
    pub bus_timeout: Tick,
    pub max_attempts: u8,
    pub backoff: BackoffConfig,
    pub backlight_percent: u8,
}

impl DisplayConfig {
    pub const DEFAULT: Self = Self {
        redraw_period: DEFAULT_SAMPLING_PERIOD_TICKS * REDRAW_DIVISOR,
        bus_timeout: QSPI_TIMEOUT_TICKS,
        max_attempts: MAX_BUS_ATTEMPTS,
        backoff: BackoffConfig::DEFAULT,
        backlight_percent: BACKLIGHT_PERCENT,
    };
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Host link settings
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct LinkConfig {
    /// Transmit stall budget per response (ticks)
    pub tx_timeout: Tick,
}

impl LinkConfig {
    pub const DEFAULT: Self = Self {
        tx_timeout: UART_TX_TIMEOUT_TICKS,
    };
}

impl Default for LinkConfig {
    fn default() -> Self {
        Self::DEFAULT
    }
}

/// Complete coordination-layer configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct HalConfig {
    pub arbiter: ArbiterConfig,
    pub sampler: SamplerConfig,
    pub display: DisplayConfig,
    pub link: LinkConfig,
}

impl HalConfig {
    pub const DEFAULT: Self = Self {
        arbiter: ArbiterConfig::DEFAULT,
        sampler: SamplerConfig::DEFAULT,
        display: DisplayConfig::DEFAULT,
        link: LinkConfig::DEFAULT,
    };
}

/// Check a host-requested sampling period against the accepted bounds
pub fn sampling_period_in_range(ticks: Tick) -> bool {
    (MIN_SAMPLING_PERIOD_TICKS..=MAX_SAMPLING_PERIOD_TICKS).contains(&ticks)
}

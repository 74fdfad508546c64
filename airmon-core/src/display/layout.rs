//! Screen layout for a 128x160 portrait panel
//!
//! ```text
//! +------------------+
//! |[H]          [S]  |  H: host feedback, S: sample status
//! |   gas (ppm)      |
//! |   ======----     |  gas gauge
//! |   humidity       |
//! +------------------+
//! ```

use super::frame::{DisplayFrame, RegionId};
use crate::reading::SensorReading;
use crate::traits::{DisplayError, Rect, Region, RegionContent, Rgb565};

pub const SCREEN_WIDTH: u16 = 128;
pub const SCREEN_HEIGHT: u16 = 160;

pub const REGION_BACKGROUND: RegionId = 0;
pub const REGION_GAS: RegionId = 1;
pub const REGION_GAS_GAUGE: RegionId = 2;
pub const REGION_HUMIDITY: RegionId = 3;
pub const REGION_STATUS: RegionId = 4;
pub const REGION_HOST: RegionId = 5;

/// Gas concentration shown as a full gauge (ppm)
pub const GAS_GAUGE_FULL_SCALE: u32 = 2_000;

const BACKGROUND: Rgb565 = Rgb565::BLACK;

const GAS_AREA: Rect = Rect::new(8, 20, 112, 32);
const GAUGE_AREA: Rect = Rect::new(8, 60, 112, 8);
const HUMIDITY_AREA: Rect = Rect::new(8, 84, 112, 32);
const STATUS_AREA: Rect = Rect::new(SCREEN_WIDTH - 12, 4, 8, 8);
const HOST_AREA: Rect = Rect::new(4, 4, 8, 8);

/// Clear the whole panel
pub fn compose_background(frame: &DisplayFrame) -> Result<(), DisplayError> {
    frame.enqueue(
        REGION_BACKGROUND,
        Region::new(
            Rect::new(0, 0, SCREEN_WIDTH, SCREEN_HEIGHT),
            RegionContent::Fill(BACKGROUND),
        ),
    )
}

/// Queue the regions that show `reading`
///
/// An invalid reading only turns the status marker red; the last valid
/// values stay on screen.
pub fn compose_reading(
    frame: &DisplayFrame,
    reading: &SensorReading,
    degraded: bool,
) -> Result<(), DisplayError> {
    let status = match (reading.valid, degraded) {
        (false, _) => Rgb565::RED,
        (true, true) => Rgb565::AMBER,
        (true, false) => Rgb565::GREEN,
    };
    frame.enqueue(
        REGION_STATUS,
        Region::new(STATUS_AREA, RegionContent::Fill(status)),
    )?;

    if !reading.valid {
        return Ok(());
    }

    frame.enqueue(
        REGION_GAS,
        Region::new(
            GAS_AREA,
            RegionContent::Number {
                value: reading.gas_ppm as u32,
                fg: Rgb565::WHITE,
                bg: BACKGROUND,
            },
        ),
    )?;
    frame.enqueue(
        REGION_GAS_GAUGE,
        Region::new(
            GAUGE_AREA,
            RegionContent::Gauge {
                percent: gauge_percent(reading.gas_ppm as u32, GAS_GAUGE_FULL_SCALE),
                fg: gauge_color(reading.gas_ppm as u32),
                bg: Rgb565::GREY,
            },
        ),
    )?;
    frame.enqueue(
        REGION_HUMIDITY,
        Region::new(
            HUMIDITY_AREA,
            RegionContent::Number {
                value: reading.humidity_mg_m3,
                fg: Rgb565::BLUE,
                bg: BACKGROUND,
            },
        ),
    )
}

/// Flash the host marker to acknowledge a host command
pub fn compose_host_feedback(frame: &DisplayFrame, lit: bool) -> Result<(), DisplayError> {
    let color = if lit { Rgb565::BLUE } else { BACKGROUND };
    frame.enqueue(REGION_HOST, Region::new(HOST_AREA, RegionContent::Fill(color)))
}

fn gauge_percent(value: u32, full_scale: u32) -> u8 {
    (value.saturating_mul(100) / full_scale.max(1)).min(100) as u8
}

fn gauge_color(ppm: u32) -> Rgb565 {
    match ppm {
        0..=999 => Rgb565::GREEN,
        1000..=1499 => Rgb565::AMBER,
        _ => Rgb565::RED,
    }
}

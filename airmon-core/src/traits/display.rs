//! Display controller trait and region content

/// Errors reported by a display driver
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum DisplayError {
    /// QSPI transfer failed
    Bus,
    /// Controller did not accept data in time
    Timeout,
    /// Region queue is full
    FrameFull,
}

/// 16-bit RGB565 color, as sent on the wire
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rgb565(pub u16);

impl Rgb565 {
    pub const BLACK: Self = Self(0x0000);
    pub const WHITE: Self = Self(0xFFFF);
    pub const RED: Self = Self(0xF800);
    pub const GREEN: Self = Self(0x07E0);
    pub const BLUE: Self = Self(0x001F);
    pub const AMBER: Self = Self(0xFD20);
    pub const GREY: Self = Self(0x8410);

    /// Build from 8-bit channels, dropping the low bits
    pub const fn from_rgb(r: u8, g: u8, b: u8) -> Self {
        Self((((r as u16) & 0xF8) << 8) | (((g as u16) & 0xFC) << 3) | ((b as u16) >> 3))
    }

    pub const fn to_be_bytes(self) -> [u8; 2] {
        self.0.to_be_bytes()
    }
}

/// Screen rectangle in controller pixel coordinates
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Rect {
    pub x: u16,
    pub y: u16,
    pub width: u16,
    pub height: u16,
}

impl Rect {
    pub const fn new(x: u16, y: u16, width: u16, height: u16) -> Self {
        Self {
            x,
            y,
            width,
            height,
        }
    }

    pub const fn is_empty(&self) -> bool {
        self.width == 0 || self.height == 0
    }

    /// Number of pixels covered
    pub const fn area(&self) -> u32 {
        self.width as u32 * self.height as u32
    }

    /// Inclusive end column
    pub const fn x_end(&self) -> u16 {
        self.x + self.width.saturating_sub(1)
    }

    /// Inclusive end row
    pub const fn y_end(&self) -> u16 {
        self.y + self.height.saturating_sub(1)
    }
}

/// What to paint inside a region
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum RegionContent {
    /// Solid color
    Fill(Rgb565),
    /// Right-aligned seven-segment number
    Number { value: u32, fg: Rgb565, bg: Rgb565 },
    /// Horizontal bar filled to `percent` (clamped to 100)
    Gauge { percent: u8, fg: Rgb565, bg: Rgb565 },
}

/// One queued piece of the next frame
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub struct Region {
    pub area: Rect,
    pub content: RegionContent,
}

impl Region {
    pub const fn new(area: Rect, content: RegionContent) -> Self {
        Self { area, content }
    }
}

/// Trait for ST7735-class display controllers
///
/// The caller holds the QSPI bus through the arbiter for the whole call.
pub trait DisplayController {
    /// Reset the controller and run its power-on command sequence
    fn init_sequence(&mut self) -> Result<(), DisplayError>;

    /// Set the address window to `region.area` and stream its pixels
    fn write_region(&mut self, region: &Region) -> Result<(), DisplayError>;
}

//! Per-pixel rendering of region content
//!
//! No frame buffer: the driver asks for each pixel's color while streaming
//! the region, row by row.

use airmon_core::traits::{Rect, RegionContent, Rgb565};

/// Segment bits per digit: a=0 (top), b=1, c=2, d=3 (bottom), e=4, f=5, g=6 (middle)
const SEGMENTS: [u8; 10] = [0x3F, 0x06, 0x5B, 0x4F, 0x66, 0x6D, 0x7D, 0x07, 0x7F, 0x6F];

const SEG_A: u8 = 1 << 0;
const SEG_B: u8 = 1 << 1;
const SEG_C: u8 = 1 << 2;
const SEG_D: u8 = 1 << 3;
const SEG_E: u8 = 1 << 4;
const SEG_F: u8 = 1 << 5;
const SEG_G: u8 = 1 << 6;

/// Digit cell geometry for a region of the given height
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct DigitCell {
    width: u16,
    height: u16,
    stroke: u16,
    pitch: u16,
}

impl DigitCell {
    fn for_height(height: u16) -> Self {
        let stroke = (height / 8).max(1);
        let width = (height / 2).max(3);
        Self {
            width,
            height,
            stroke,
            pitch: width + stroke,
        }
    }

    /// Whether pixel (x, y) of the cell is lit for `digit`
    fn lit(&self, digit: u8, x: u16, y: u16) -> bool {
        let segments = SEGMENTS[(digit % 10) as usize];
        let t = self.stroke;
        let half = self.height / 2;
        let upper = y < half;
        let left = x < t;
        let right = x + t >= self.width;
        let mid_top = half.saturating_sub(t / 2);

        (segments & SEG_A != 0 && y < t)
            || (segments & SEG_D != 0 && y + t >= self.height)
            || (segments & SEG_G != 0 && y >= mid_top && y < mid_top + t)
            || (segments & SEG_F != 0 && left && upper)
            || (segments & SEG_B != 0 && right && upper)
            || (segments & SEG_E != 0 && left && !upper)
            || (segments & SEG_C != 0 && right && !upper)
    }
}

fn digit_count(mut value: u32) -> u16 {
    let mut count = 1;
    while value >= 10 {
        value /= 10;
        count += 1;
    }
    count
}

/// Color of pixel (x, y), relative to the region's top-left corner
pub fn pixel(area: &Rect, content: &RegionContent, x: u16, y: u16) -> Rgb565 {
    match *content {
        RegionContent::Fill(color) => color,
        RegionContent::Gauge { percent, fg, bg } => {
            let filled = (area.width as u32 * percent.min(100) as u32 / 100) as u16;
            if x < filled {
                fg
            } else {
                bg
            }
        }
        RegionContent::Number { value, fg, bg } => {
            let cell = DigitCell::for_height(area.height);
            // Digits are right-aligned: slot 0 is the least significant
            let from_right = area.width - 1 - x;
            let slot = from_right / cell.pitch;
            // Each cell starts with its gap column(s)
            let within = cell.pitch - 1 - from_right % cell.pitch;
            let gap = cell.pitch - cell.width;
            if slot >= digit_count(value) || within < gap {
                return bg;
            }
            let digit = (value / 10u32.pow(slot as u32)) % 10;
            if cell.lit(digit as u8, within - gap, y) {
                fg
            } else {
                bg
            }
        }
    }
}

/// Iterator over a region's pixels in controller write order (row-major)
pub struct Pixels<'a> {
    area: &'a Rect,
    content: &'a RegionContent,
    x: u16,
    y: u16,
}

impl<'a> Pixels<'a> {
    pub fn new(area: &'a Rect, content: &'a RegionContent) -> Self {
        Self {
            area,
            content,
            x: 0,
            y: 0,
        }
    }
}

impl Iterator for Pixels<'_> {
    type Item = Rgb565;

    fn next(&mut self) -> Option<Rgb565> {
        if self.area.is_empty() || self.y >= self.area.height {
            return None;
        }
        let color = pixel(self.area, self.content, self.x, self.y);
        self.x += 1;
        if self.x == self.area.width {
            self.x = 0;
            self.y += 1;
        }
        Some(color)
    }
}

//! ST7735-class TFT controller over QSPI
//!
//! Commands go in the QSPI command phase and parameters or pixel data in the
//! data phase. Pixel data is generated on the fly and streamed in FIFO-sized
//! bursts, so no frame buffer is needed.

use airmon_core::traits::{DisplayController, DisplayError, Region};
use airmon_hal::qspi::chunk_len;
use airmon_hal::{Delay, OutputPin, QspiBus, QspiFault};

use super::render::Pixels;

/// ST7735 commands
mod cmd {
    pub const SWRESET: u8 = 0x01;
    pub const SLPOUT: u8 = 0x11;
    pub const NORON: u8 = 0x13;
    pub const INVOFF: u8 = 0x20;
    pub const DISPON: u8 = 0x29;
    pub const CASET: u8 = 0x2A;
    pub const RASET: u8 = 0x2B;
    pub const RAMWR: u8 = 0x2C;
    pub const MADCTL: u8 = 0x36;
    pub const COLMOD: u8 = 0x3A;
}

/// 16 bits per pixel
const COLMOD_RGB565: u8 = 0x05;

/// Row/column order: portrait, RGB
const MADCTL_PORTRAIT: u8 = 0x00;

/// Largest data phase in bytes (32 FIFO words)
const MAX_BURST_BYTES: usize = 128;

fn map_fault(fault: QspiFault) -> DisplayError {
    match fault {
        QspiFault::Timeout => DisplayError::Timeout,
        QspiFault::ChipSelect | QspiFault::Other => DisplayError::Bus,
    }
}

pub struct St7735<Q, CS, RST, D> {
    qspi: Q,
    cs: CS,
    rst: RST,
    delay: D,
    /// Panel offset inside the controller's RAM
    col_offset: u16,
    row_offset: u16,
}

impl<Q, CS, RST, D> St7735<Q, CS, RST, D>
where
    Q: QspiBus,
    CS: OutputPin,
    RST: OutputPin,
    D: Delay,
{
    pub fn new(qspi: Q, mut cs: CS, mut rst: RST, delay: D) -> Self {
        cs.set_high();
        rst.set_high();
        Self {
            qspi,
            cs,
            rst,
            delay,
            col_offset: 0,
            row_offset: 0,
        }
    }

    /// Shift all addressing, for panels not mapped at RAM origin
    pub fn with_offset(mut self, col: u16, row: u16) -> Self {
        self.col_offset = col;
        self.row_offset = row;
        self
    }

    fn transfer(&mut self, command: &[u8], data: &[u8]) -> Result<(), DisplayError> {
        self.qspi
            .transfer(command, data)
            .map_err(|e| map_fault(e.into()))
    }

    /// Run `f` with chip select asserted, releasing it even on error
    fn selected<T>(
        &mut self,
        f: impl FnOnce(&mut Self) -> Result<T, DisplayError>,
    ) -> Result<T, DisplayError> {
        self.cs.set_low();
        let result = f(self);
        self.cs.set_high();
        result
    }

    fn command(&mut self, command: u8, params: &[u8]) -> Result<(), DisplayError> {
        self.selected(|this| this.transfer(&[command], params))
    }

    fn set_window(&mut self, region: &Region) -> Result<(), DisplayError> {
        let area = &region.area;
        let x0 = area.x + self.col_offset;
        let x1 = area.x_end() + self.col_offset;
        let y0 = area.y + self.row_offset;
        let y1 = area.y_end() + self.row_offset;
        let [x0h, x0l] = x0.to_be_bytes();
        let [x1h, x1l] = x1.to_be_bytes();
        let [y0h, y0l] = y0.to_be_bytes();
        let [y1h, y1l] = y1.to_be_bytes();
        self.command(cmd::CASET, &[x0h, x0l, x1h, x1l])?;
        self.command(cmd::RASET, &[y0h, y0l, y1h, y1l])
    }

    fn stream_pixels(&mut self, region: &Region) -> Result<(), DisplayError> {
        let mut pixels = Pixels::new(&region.area, &region.content);
        let mut remaining = region.area.area() as usize * 2;
        let mut buf = [0u8; MAX_BURST_BYTES];
        let mut command: &[u8] = &[cmd::RAMWR];

        while remaining > 0 {
            let words = chunk_len(remaining.div_ceil(4));
            let len = (words * 4).min(remaining).min(MAX_BURST_BYTES);
            for pair in buf[..len].chunks_exact_mut(2) {
                let color = pixels.next().unwrap_or_default();
                pair.copy_from_slice(&color.to_be_bytes());
            }
            self.transfer(command, &buf[..len])?;
            command = &[];
            remaining -= len;
        }
        Ok(())
    }

    pub fn release(self) -> (Q, CS, RST, D) {
        (self.qspi, self.cs, self.rst, self.delay)
    }
}

impl<Q, CS, RST, D> DisplayController for St7735<Q, CS, RST, D>
where
    Q: QspiBus,
    CS: OutputPin,
    RST: OutputPin,
    D: Delay,
{
    fn init_sequence(&mut self) -> Result<(), DisplayError> {
        self.rst.set_low();
        self.delay.delay_ms(10);
        self.rst.set_high();
        self.delay.delay_ms(120);

        self.command(cmd::SWRESET, &[])?;
        self.delay.delay_ms(150);
        self.command(cmd::SLPOUT, &[])?;
        self.delay.delay_ms(120);
        self.command(cmd::COLMOD, &[COLMOD_RGB565])?;
        self.delay.delay_ms(10);
        self.command(cmd::MADCTL, &[MADCTL_PORTRAIT])?;
        self.command(cmd::INVOFF, &[])?;
        self.command(cmd::NORON, &[])?;
        self.delay.delay_ms(10);
        self.command(cmd::DISPON, &[])?;
        self.delay.delay_ms(100);
        Ok(())
    }

    fn write_region(&mut self, region: &Region) -> Result<(), DisplayError> {
        if region.area.is_empty() {
            return Ok(());
        }
        self.set_window(region)?;
        self.selected(|this| this.stream_pixels(region))
    }
}

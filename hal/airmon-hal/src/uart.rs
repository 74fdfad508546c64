//! Serial ports
//!
//! Both directions are non-blocking at the trait level: reads return what
//! the receive FIFO holds right now and writes return how many bytes the
//! transmit FIFO accepted. Callers layer their own tick-bounded timeouts on
//! top.

use core::fmt;

pub trait UartTx {
    type Error;

    /// Queue as many bytes of `data` as the transmit FIFO can take
    ///
    /// Returns the number of bytes accepted; `Ok(0)` means the FIFO is full.
    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error>;
}

pub trait UartRx {
    type Error;

    /// Read whatever bytes are available without waiting
    ///
    /// Returns the number of bytes copied into `buf`; `Ok(0)` means the
    /// receive FIFO is empty.
    fn read_nonblocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error>;
}

/// Spin budget per byte before a console write gives up
const CONSOLE_SPIN_LIMIT: u32 = 100_000;

/// `core::fmt::Write` adapter for plain-text console output
///
/// Used on the system UART for boot banners; never for the host protocol.
pub struct UartWriter<'a, T: UartTx> {
    tx: &'a mut T,
}

impl<'a, T: UartTx> UartWriter<'a, T> {
    pub fn new(tx: &'a mut T) -> Self {
        Self { tx }
    }
}

impl<T: UartTx> fmt::Write for UartWriter<'_, T> {
    fn write_str(&mut self, s: &str) -> fmt::Result {
        let mut pending = s.as_bytes();
        let mut spins = 0;
        while !pending.is_empty() {
            let n = self.tx.write(pending).map_err(|_| fmt::Error)?;
            if n == 0 {
                spins += 1;
                if spins > CONSOLE_SPIN_LIMIT {
                    return Err(fmt::Error);
                }
                core::hint::spin_loop();
            } else {
                spins = 0;
                pending = &pending[n..];
            }
        }
        Ok(())
    }
}

/// Adapter for any `embedded-io` 0.6 serial port with readiness queries
pub struct IoUart<T>(pub T);

impl<T> UartRx for IoUart<T>
where
    T: embedded_io::Read + embedded_io::ReadReady,
{
    type Error = T::Error;

    fn read_nonblocking(&mut self, buf: &mut [u8]) -> Result<usize, Self::Error> {
        if buf.is_empty() || !self.0.read_ready()? {
            return Ok(0);
        }
        self.0.read(buf)
    }
}

impl<T> UartTx for IoUart<T>
where
    T: embedded_io::Write + embedded_io::WriteReady,
{
    type Error = T::Error;

    fn write(&mut self, data: &[u8]) -> Result<usize, Self::Error> {
        if data.is_empty() || !self.0.write_ready()? {
            return Ok(0);
        }
        self.0.write(data)
    }
}

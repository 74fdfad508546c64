//! I2C master
//!
//! Only the sensor driver talks I2C.
//! Every operation is bounded by the peripheral's own hardware timeout.

/// Hardware-reported I2C failure classes
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum I2cFault {
    /// Address or data byte not acknowledged
    Nack,
    /// Lost arbitration to another master
    ArbitrationLost,
    /// Hardware transfer timeout expired
    Timeout,
    /// Bus error or any other controller fault
    Other,
}

/// Blocking I2C master, 7-bit addressing
pub trait I2cBus {
    type Error: Into<I2cFault>;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), Self::Error>;

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), Self::Error>;

    /// Write followed by a repeated-start read
    ///
    /// The default issues two separate transfers; adapters that can do a
    /// real repeated start override it.
    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), Self::Error> {
        self.write(address, write_data)?;
        self.read(address, read_buf)
    }
}

/// Adapter for any `embedded-hal` 1.0 I2C master
pub struct EhI2c<T>(pub T);

impl<T: embedded_hal::i2c::I2c> I2cBus for EhI2c<T> {
    type Error = I2cFault;

    fn write(&mut self, address: u8, data: &[u8]) -> Result<(), I2cFault> {
        self.0.write(address, data).map_err(classify)
    }

    fn read(&mut self, address: u8, buf: &mut [u8]) -> Result<(), I2cFault> {
        self.0.read(address, buf).map_err(classify)
    }

    fn write_read(
        &mut self,
        address: u8,
        write_data: &[u8],
        read_buf: &mut [u8],
    ) -> Result<(), I2cFault> {
        self.0
            .write_read(address, write_data, read_buf)
            .map_err(classify)
    }
}

fn classify<E: embedded_hal::i2c::Error>(error: E) -> I2cFault {
    use embedded_hal::i2c::ErrorKind;

    match error.kind() {
        ErrorKind::NoAcknowledge(_) => I2cFault::Nack,
        ErrorKind::ArbitrationLoss => I2cFault::ArbitrationLost,
        _ => I2cFault::Other,
    }
}

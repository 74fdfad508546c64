//! SGP30-class gas sensor
//!
//! Command/response protocol over I2C. Every 16-bit word the sensor sends is
//! followed by a CRC-8 byte.

use airmon_core::traits::{GasSensor, SensorError};
use airmon_core::RawCounts;
use airmon_hal::{Delay, I2cBus, I2cFault};

/// Fixed 7-bit bus address
pub const SGP30_ADDR: u8 = 0x58;

mod cmd {
    pub const INIT: [u8; 2] = [0x20, 0x03];
    pub const MEASURE: [u8; 2] = [0x20, 0x08];
}

/// Worst-case measurement duration (ms)
const MEASURE_TIME_MS: u32 = 12;

/// Time the sensor needs to process the init command (ms)
const INIT_TIME_MS: u32 = 10;

const CRC_POLY: u8 = 0x31;
const CRC_INIT: u8 = 0xFF;

/// CRC-8 over one data word, as used by the sensor
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 {
                (crc << 1) ^ CRC_POLY
            } else {
                crc << 1
            };
        }
    }
    crc
}

fn checked_word(chunk: &[u8]) -> Result<u16, SensorError> {
    match chunk {
        &[hi, lo, crc] if crc8(&[hi, lo]) == crc => Ok(u16::from_be_bytes([hi, lo])),
        _ => Err(SensorError::Crc),
    }
}

fn map_fault(fault: I2cFault) -> SensorError {
    match fault {
        I2cFault::Timeout => SensorError::Timeout,
        I2cFault::Nack | I2cFault::ArbitrationLost | I2cFault::Other => SensorError::Bus,
    }
}

pub struct Sgp30<I2C, D> {
    i2c: I2C,
    delay: D,
}

impl<I2C, D> Sgp30<I2C, D>
where
    I2C: I2cBus,
    D: Delay,
{
    pub fn new(i2c: I2C, delay: D) -> Self {
        Self { i2c, delay }
    }

    fn command(&mut self, command: &[u8; 2]) -> Result<(), SensorError> {
        self.i2c
            .write(SGP30_ADDR, command)
            .map_err(|e| map_fault(e.into()))
    }

    pub fn release(self) -> (I2C, D) {
        (self.i2c, self.delay)
    }
}

impl<I2C, D> GasSensor for Sgp30<I2C, D>
where
    I2C: I2cBus,
    D: Delay,
{
    fn init(&mut self) -> Result<(), SensorError> {
        self.command(&cmd::INIT)?;
        self.delay.delay_ms(INIT_TIME_MS);
        Ok(())
    }

    fn measure(&mut self) -> Result<RawCounts, SensorError> {
        self.command(&cmd::MEASURE)?;
        self.delay.delay_ms(MEASURE_TIME_MS);

        let mut buf = [0u8; 6];
        self.i2c
            .read(SGP30_ADDR, &mut buf)
            .map_err(|e| map_fault(e.into()))?;

        Ok(RawCounts {
            gas: checked_word(&buf[0..3])?,
            humidity: checked_word(&buf[3..6])?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use heapless::Vec;

    #[derive(Default)]
    struct MockI2c {
        writes: Vec<(u8, [u8; 2]), 8>,
        response: [u8; 6],
        fail_with: Option<I2cFault>,
    }

    impl I2cBus for MockI2c {
        type Error = I2cFault;

        fn write(&mut self, address: u8, data: &[u8]) -> Result<(), I2cFault> {
            if let Some(fault) = self.fail_with {
                return Err(fault);
            }
            let _ = self.writes.push((address, [data[0], data[1]]));
            Ok(())
        }

        fn read(&mut self, _address: u8, buf: &mut [u8]) -> Result<(), I2cFault> {
            buf.copy_from_slice(&self.response);
            Ok(())
        }
    }

    #[derive(Default)]
    struct MockDelay {
        total_us: u32,
    }

    impl Delay for MockDelay {
        fn delay_us(&mut self, us: u32) {
            self.total_us += us;
        }
    }

    fn response(gas: u16, humidity: u16) -> [u8; 6] {
        let g = gas.to_be_bytes();
        let h = humidity.to_be_bytes();
        [g[0], g[1], crc8(&g), h[0], h[1], crc8(&h)]
    }

    #[test]
    fn test_crc_reference_value() {
        assert_eq!(crc8(&[0xBE, 0xEF]), 0x92);
    }

    #[test]
    fn test_init_sends_init_command() {
        let mut sensor = Sgp30::new(MockI2c::default(), MockDelay::default());
        sensor.init().unwrap();
        let (i2c, delay) = sensor.release();
        assert_eq!(&i2c.writes[..], &[(SGP30_ADDR, [0x20, 0x03])]);
        assert_eq!(delay.total_us, INIT_TIME_MS * 1000);
    }

    #[test]
    fn test_measure_decodes_words() {
        let i2c = MockI2c {
            response: response(400, 500),
            ..MockI2c::default()
        };
        let mut sensor = Sgp30::new(i2c, MockDelay::default());
        assert_eq!(sensor.measure(), Ok(RawCounts::new(400, 500)));
        let (i2c, delay) = sensor.release();
        assert_eq!(&i2c.writes[..], &[(SGP30_ADDR, [0x20, 0x08])]);
        assert!(delay.total_us >= MEASURE_TIME_MS * 1000);
    }

    #[test]
    fn test_measure_rejects_bad_crc() {
        let mut bytes = response(400, 500);
        bytes[5] ^= 0x01;
        let i2c = MockI2c {
            response: bytes,
            ..MockI2c::default()
        };
        let mut sensor = Sgp30::new(i2c, MockDelay::default());
        assert_eq!(sensor.measure(), Err(SensorError::Crc));
    }

    #[test]
    fn test_nack_maps_to_bus_error() {
        let i2c = MockI2c {
            fail_with: Some(I2cFault::Nack),
            ..MockI2c::default()
        };
        let mut sensor = Sgp30::new(i2c, MockDelay::default());
        assert_eq!(sensor.measure(), Err(SensorError::Bus));
    }

    #[test]
    fn test_timeout_maps_to_timeout() {
        let i2c = MockI2c {
            fail_with: Some(I2cFault::Timeout),
            ..MockI2c::default()
        };
        let mut sensor = Sgp30::new(i2c, MockDelay::default());
        assert_eq!(sensor.init(), Err(SensorError::Timeout));
    }
}

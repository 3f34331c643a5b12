//! SHT4x temperature / humidity sensor over I²C.
//!
//! A single high-precision measurement command returns two 16-bit words,
//! each followed by a CRC-8 byte.  The driver is generic over the
//! `embedded-hal` 1.0 `I2c` and `DelayNs` traits so it runs against the
//! ESP-IDF I²C driver on target and against a scripted bus in tests.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;

use crate::app::ports::ClimateSample;
use crate::error::SensorError;

/// Default 7-bit address of SHT40-AD1B parts.
pub const SHT4X_ADDR: u8 = 0x44;

/// Measure T & RH with high precision (no heater).
const CMD_MEASURE_HIGH: u8 = 0xFD;
/// Worst-case conversion time for the high-precision mode is 8.3 ms.
const MEASURE_DELAY_MS: u32 = 10;

const CRC_POLY: u8 = 0x31;
const CRC_INIT: u8 = 0xFF;

/// Sensirion CRC-8 over one data word.
pub fn crc8(data: &[u8]) -> u8 {
    let mut crc = CRC_INIT;
    for &byte in data {
        crc ^= byte;
        for _ in 0..8 {
            crc = if crc & 0x80 != 0 { (crc << 1) ^ CRC_POLY } else { crc << 1 };
        }
    }
    crc
}

/// Convert a checked 6-byte response into physical units.
pub fn decode_measurement(buf: &[u8; 6]) -> Result<ClimateSample, SensorError> {
    if crc8(&buf[0..2]) != buf[2] || crc8(&buf[3..5]) != buf[5] {
        return Err(SensorError::CrcMismatch);
    }
    let raw_t = f32::from(u16::from_be_bytes([buf[0], buf[1]]));
    let raw_rh = f32::from(u16::from_be_bytes([buf[3], buf[4]]));
    Ok(ClimateSample {
        temperature_c: -45.0 + 175.0 * raw_t / 65_535.0,
        humidity_pct: (-6.0 + 125.0 * raw_rh / 65_535.0).clamp(0.0, 100.0),
    })
}

pub struct ClimateSensor<I, D> {
    i2c: I,
    delay: D,
    addr: u8,
}

impl<I: I2c, D: DelayNs> ClimateSensor<I, D> {
    pub fn new(i2c: I, delay: D) -> Self {
        Self { i2c, delay, addr: SHT4X_ADDR }
    }

    /// Trigger a measurement and block for the conversion time (~10 ms).
    pub fn measure(&mut self) -> Result<ClimateSample, SensorError> {
        self.i2c
            .write(self.addr, &[CMD_MEASURE_HIGH])
            .map_err(|_| SensorError::BusError)?;
        self.delay.delay_ms(MEASURE_DELAY_MS);
        let mut buf = [0u8; 6];
        self.i2c
            .read(self.addr, &mut buf)
            .map_err(|_| SensorError::BusError)?;
        decode_measurement(&buf)
    }
}

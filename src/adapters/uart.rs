//! Serial line adapter for the CO2 sensor.
//!
//! Implements [`ByteChannel`] over the ESP-IDF UART driver.  Every call is
//! non-blocking: reads use `NON_BLOCK` and are only issued once the driver
//! reports enough buffered bytes.
//!
//! - **`target_os = "espidf"`**: wraps `esp_idf_hal::uart::UartDriver`.
//! - **`not(target_os = "espidf")`**: a loopback-free byte queue; tests
//!   inject sensor responses with [`UartChannel::sim_inject`].

use crate::app::ports::ByteChannel;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use esp_idf_hal::delay::NON_BLOCK;
#[cfg(target_os = "espidf")]
use esp_idf_hal::uart::UartDriver;

#[cfg(target_os = "espidf")]
pub struct UartChannel {
    uart: UartDriver<'static>,
}

#[cfg(target_os = "espidf")]
impl UartChannel {
    pub fn new(uart: UartDriver<'static>) -> Self {
        Self { uart }
    }
}

#[cfg(target_os = "espidf")]
impl ByteChannel for UartChannel {
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), CommsError> {
        match self.uart.write(bytes) {
            Ok(n) if n == bytes.len() => Ok(()),
            Ok(n) => {
                log::warn!("UART: short write {}/{}", n, bytes.len());
                Err(CommsError::UartWriteFailed)
            }
            Err(_) => Err(CommsError::UartWriteFailed),
        }
    }

    fn available(&mut self) -> usize {
        self.uart.remaining_read().unwrap_or(0)
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CommsError> {
        let mut filled = 0;
        while filled < buf.len() {
            match self.uart.read(&mut buf[filled..], NON_BLOCK) {
                Ok(0) | Err(_) => return Err(CommsError::UartReadFailed),
                Ok(n) => filled += n,
            }
        }
        Ok(())
    }

    fn discard_buffered(&mut self) {
        if let Err(e) = self.uart.clear_rx() {
            log::warn!("UART: clear_rx failed: {}", e);
        }
    }
}

// ── Simulation ────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
use std::collections::VecDeque;

#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
pub struct UartChannel {
    rx: VecDeque<u8>,
    tx_log: Vec<Vec<u8>>,
}

#[cfg(not(target_os = "espidf"))]
impl UartChannel {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append bytes to the receive buffer as if the sensor sent them.
    pub fn sim_inject(&mut self, bytes: &[u8]) {
        self.rx.extend(bytes.iter().copied());
    }

    /// Every frame written so far.
    pub fn sim_written(&self) -> &[Vec<u8>] {
        &self.tx_log
    }
}

#[cfg(not(target_os = "espidf"))]
impl ByteChannel for UartChannel {
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), CommsError> {
        self.tx_log.push(bytes.to_vec());
        Ok(())
    }

    fn available(&mut self) -> usize {
        self.rx.len()
    }

    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CommsError> {
        let n = buf.len();
        if self.rx.len() < n {
            return Err(CommsError::UartReadFailed);
        }
        for (dst, src) in buf.iter_mut().zip(self.rx.drain(..n)) {
            *dst = src;
        }
        Ok(())
    }

    fn discard_buffered(&mut self) {
        self.rx.clear();
    }
}

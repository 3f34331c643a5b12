//! Unified error types for the Airwatch firmware.
//!
//! A single `Error` enum that every subsystem can convert into, keeping the
//! top-level loop's error handling uniform. All variants are `Copy` so they
//! can be passed through ports and log sinks without allocation.
//!
//! Protocol faults on the CO2 serial line are *not* errors: they are
//! outcomes recorded in [`ResultCode`](crate::app::state::ResultCode) and
//! recovered by rescheduling.

use core::fmt;

// ---------------------------------------------------------------------------
// Top-level firmware error
// ---------------------------------------------------------------------------

/// Every fallible operation in the firmware funnels into this type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Error {
    /// A sensor could not be read or returned implausible data.
    Sensor(SensorError),
    /// A communication subsystem failed.
    Comms(CommsError),
    /// Peripheral initialisation failed.
    Init(&'static str),
    /// Configuration is invalid or could not be loaded.
    Config(&'static str),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Sensor(e) => write!(f, "sensor: {e}"),
            Self::Comms(e) => write!(f, "comms: {e}"),
            Self::Init(msg) => write!(f, "init: {msg}"),
            Self::Config(msg) => write!(f, "config: {msg}"),
        }
    }
}

impl core::error::Error for Error {}

// ---------------------------------------------------------------------------
// Sensor errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SensorError {
    /// I²C transaction failed (NACK, arbitration loss, bus timeout).
    BusError,
    /// A data word failed its CRC-8 check.
    CrcMismatch,
    /// ADC read returned an error.
    AdcReadFailed,
}

impl fmt::Display for SensorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BusError => write!(f, "I2C bus error"),
            Self::CrcMismatch => write!(f, "CRC mismatch"),
            Self::AdcReadFailed => write!(f, "ADC read failed"),
        }
    }
}

impl From<SensorError> for Error {
    fn from(e: SensorError) -> Self {
        Self::Sensor(e)
    }
}

// ---------------------------------------------------------------------------
// Communications errors
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommsError {
    /// Bytes could not be queued on the sensor UART.
    UartWriteFailed,
    /// The UART driver refused a read of bytes it reported as available.
    UartReadFailed,
    WifiConnectFailed,
    /// The notification endpoint could not be reached.
    NotifyFailed,
    /// The notification endpoint answered with a non-2xx status.
    NotifyRejected(u16),
}

impl fmt::Display for CommsError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UartWriteFailed => write!(f, "UART write failed"),
            Self::UartReadFailed => write!(f, "UART read failed"),
            Self::WifiConnectFailed => write!(f, "WiFi connect failed"),
            Self::NotifyFailed => write!(f, "notification send failed"),
            Self::NotifyRejected(status) => write!(f, "notification rejected (HTTP {status})"),
        }
    }
}

impl From<CommsError> for Error {
    fn from(e: CommsError) -> Self {
        Self::Comms(e)
    }
}

// ---------------------------------------------------------------------------
// Convenience Result alias
// ---------------------------------------------------------------------------

/// Firmware-wide `Result` alias.
pub type Result<T> = core::result::Result<T, Error>;

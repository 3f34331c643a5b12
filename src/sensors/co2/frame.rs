//! MH-Z19 frame codec.
//!
//! Every exchange on the sensor UART is a fixed 9-byte frame:
//!
//! ```text
//!  byte  0     1       2     3..=7    8
//!  req   0xFF  0x01    cmd   args     checksum
//!  resp  0xFF  cmd     hi    lo temp  checksum
//! ```
//!
//! The checksum is the two's complement of the sum of bytes 1..=7.

use core::fmt;

/// Length of every request and response frame.
pub const FRAME_LEN: usize = 9;

/// Start byte shared by requests and responses.
pub const START_BYTE: u8 = 0xFF;

/// Sensor number field in requests (always 1).
const SENSOR_ADDR: u8 = 0x01;

/// Offset subtracted from the raw temperature byte.
const TEMP_OFFSET: i16 = 40;

/// The command set the driver knows how to send.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    /// Request gas concentration. The only command answered by the sensor.
    ReadConcentration,
    /// Set the current concentration as the 400 ppm zero point.
    CalibrateZero,
    /// Enable or disable automatic baseline correction.
    SetAutoBaseline(bool),
}

impl Command {
    pub const fn code(self) -> u8 {
        match self {
            Self::ReadConcentration => 0x86,
            Self::CalibrateZero => 0x87,
            Self::SetAutoBaseline(_) => 0x79,
        }
    }

    /// Whether the sensor sends a 9-byte reply to this command.
    pub const fn expects_response(self) -> bool {
        matches!(self, Self::ReadConcentration)
    }
}

/// Checksum over bytes 1..=7 of a frame: `0xFF - sum + 1` modulo 256.
pub fn checksum(frame: &[u8; FRAME_LEN]) -> u8 {
    frame[1..8]
        .iter()
        .fold(0u8, |acc, b| acc.wrapping_add(*b))
        .wrapping_neg()
}

/// Build the request frame for `cmd`.
pub fn encode_command(cmd: Command) -> [u8; FRAME_LEN] {
    let mut frame = [0u8; FRAME_LEN];
    frame[0] = START_BYTE;
    frame[1] = SENSOR_ADDR;
    frame[2] = cmd.code();
    if let Command::SetAutoBaseline(on) = cmd {
        frame[3] = if on { 0xA0 } else { 0x00 };
    }
    frame[8] = checksum(&frame);
    frame
}

/// A decoded concentration response.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Co2Frame {
    pub ppm: u16,
    pub temperature_c: i16,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FrameError {
    /// Bytes 0..2 were not `FF 86`; the stream is out of alignment.
    BadHeader,
    BadChecksum { expected: u8, actual: u8 },
}

impl fmt::Display for FrameError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BadHeader => write!(f, "bad frame header"),
            Self::BadChecksum { expected, actual } => {
                write!(f, "checksum mismatch (expected 0x{expected:02X}, got 0x{actual:02X})")
            }
        }
    }
}

/// Decode a concentration response.
///
/// The header is checked before the checksum so a misaligned stream is
/// reported as [`FrameError::BadHeader`] rather than a checksum fault.
pub fn decode_response(frame: &[u8; FRAME_LEN]) -> Result<Co2Frame, FrameError> {
    if frame[0] != START_BYTE || frame[1] != Command::ReadConcentration.code() {
        return Err(FrameError::BadHeader);
    }
    let expected = checksum(frame);
    if frame[8] != expected {
        return Err(FrameError::BadChecksum { expected, actual: frame[8] });
    }
    Ok(Co2Frame {
        ppm: u16::from_be_bytes([frame[2], frame[3]]),
        temperature_c: i16::from(frame[4]) - TEMP_OFFSET,
    })
}

//! Device state owned by the scheduler.
//!
//! [`DeviceState`] is written only by [`AppService`](super::service::AppService).
//! Everything else (web handlers, display, logs) works on a cloned snapshot.

use serde::Serialize;

/// Colour as (R, G, B) tuple, each 0–255.
pub type Rgb = (u8, u8, u8);

/// Longest display message accepted from the web surface.
pub const MESSAGE_CAPACITY: usize = 24;

/// Free-text message shown on the panel.
pub type Message = heapless::String<MESSAGE_CAPACITY>;

// ───────────────────────────────────────────────────────────────
// CO2
// ───────────────────────────────────────────────────────────────

/// Outcome of the most recent CO2 request cycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum ResultCode {
    /// A checksum-valid frame was decoded.
    Ok,
    /// No outcome yet, or the transport refused the request.
    NoResponse,
    /// Fewer than 9 bytes arrived inside the response window.
    Timeout,
    /// A frame arrived with the wrong header bytes.
    Desync,
    /// Header was correct but the checksum byte did not match.
    ChecksumError,
    /// Checksum-valid frame carrying an implausible concentration.
    Filtered,
}

impl ResultCode {
    /// Short tag used on the display and in log lines.
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Ok => "OK",
            Self::NoResponse => "NR",
            Self::Timeout => "TMO",
            Self::Desync => "SYN",
            Self::ChecksumError => "CRC",
            Self::Filtered => "FLT",
        }
    }
}

/// Latest CO2 measurement plus the result of the last cycle.
///
/// When `result != Ok` the numeric fields hold the last known-good values.
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Co2Reading {
    pub ppm: u16,
    pub temperature_c: i16,
    pub result: ResultCode,
    /// At least one frame has decoded successfully since boot.
    pub sampled: bool,
    /// Time of the last `Ok` sample.
    pub sample_time_ms: u64,
    /// Time of the last outcome of any kind.
    pub updated_at_ms: u64,
    /// The sensor is still inside its preheat window.
    pub warming_up: bool,
}

impl Default for Co2Reading {
    fn default() -> Self {
        Self {
            ppm: 0,
            temperature_c: 0,
            result: ResultCode::NoResponse,
            sampled: false,
            sample_time_ms: 0,
            updated_at_ms: 0,
            warming_up: true,
        }
    }
}

impl Co2Reading {
    /// True once at least one frame has decoded successfully.
    pub fn has_sample(&self) -> bool {
        self.sampled
    }
}

// ───────────────────────────────────────────────────────────────
// Periodic sensors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClimateReading {
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub valid: bool,
    pub sample_time_ms: u64,
}

/// Battery voltage. Anything below [`NO_BATTERY_V`] means nothing is attached.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct BatteryReading {
    pub voltage: f32,
    pub valid: bool,
    pub sample_time_ms: u64,
}

/// Voltages at or below this are the "no battery connected" sentinel.
pub const NO_BATTERY_V: f32 = 0.5;

impl BatteryReading {
    pub fn is_present(&self) -> bool {
        self.valid && self.voltage > NO_BATTERY_V
    }
}

// ───────────────────────────────────────────────────────────────
// Actuators
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum StripMode {
    Solid,
    Rainbow,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct StripState {
    pub on: bool,
    pub brightness: u8,
    pub mode: StripMode,
    pub color: Rgb,
}

impl Default for StripState {
    fn default() -> Self {
        Self {
            on: false,
            brightness: 64,
            mode: StripMode::Solid,
            color: (255, 255, 255),
        }
    }
}

// ───────────────────────────────────────────────────────────────
// Aggregate
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DeviceState {
    pub led_on: bool,
    pub relay_on: bool,
    pub strip: StripState,
    pub co2: Co2Reading,
    pub climate: ClimateReading,
    pub battery: BatteryReading,
    pub message: Message,
}

impl Default for DeviceState {
    fn default() -> Self {
        let mut message = Message::new();
        let _ = message.push_str("Hello!");
        Self {
            led_on: false,
            relay_on: false,
            strip: StripState::default(),
            co2: Co2Reading::default(),
            climate: ClimateReading::default(),
            battery: BatteryReading::default(),
            message,
        }
    }
}

/// Normalise a user-supplied display message.
///
/// Surrounding whitespace is trimmed and an empty result becomes a single
/// space so the panel row is still cleared.  The panel font only has
/// printable ASCII, so anything else is replaced with `?`, which also keeps
/// one character per byte for the row split.  Anything past
/// [`MESSAGE_CAPACITY`] characters is dropped.
pub fn normalize_message(raw: &str) -> Message {
    let trimmed = raw.trim();
    let mut out = Message::new();
    if trimmed.is_empty() {
        let _ = out.push(' ');
        return out;
    }
    for ch in trimmed.chars() {
        let ch = if ch.is_ascii_graphic() || ch == ' ' { ch } else { '?' };
        if out.push(ch).is_err() {
            break;
        }
    }
    out
}

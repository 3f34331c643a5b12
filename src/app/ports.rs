//! Port traits: the hexagonal boundary between domain logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ AppService (domain)
//! ```
//!
//! Driven adapters (serial line, sensors, actuators, display, notifier,
//! storage) implement these traits.  The
//! [`AppService`](super::service::AppService) consumes them via generics, so
//! the domain core never touches hardware directly.

use crate::config::SystemConfig;
use crate::error::{CommsError, SensorError};

use super::commands::AppCommand;
use super::events::AppEvent;
use super::state::Rgb;

// ───────────────────────────────────────────────────────────────
// Byte channel (half-duplex serial line to the CO2 sensor)
// ───────────────────────────────────────────────────────────────

/// Non-blocking byte transport owned exclusively by the CO2 driver.
pub trait ByteChannel {
    /// Queue a complete command frame for transmission.
    fn write_frame(&mut self, bytes: &[u8]) -> Result<(), CommsError>;

    /// Number of received bytes that can be read without waiting.
    fn available(&mut self) -> usize;

    /// Fill `buf` from the receive buffer.
    ///
    /// Only valid when `available() >= buf.len()`; implementations never
    /// block waiting for more bytes.
    fn read_exact(&mut self, buf: &mut [u8]) -> Result<(), CommsError>;

    /// Drop every byte currently buffered on the receive side.
    fn discard_buffered(&mut self);
}

// ───────────────────────────────────────────────────────────────
// Sensor port (driven adapter: hardware → domain)
// ───────────────────────────────────────────────────────────────

/// Result of a synchronous sensor read: the value plus whether it can be trusted.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorRead<T> {
    pub value: T,
    pub valid: bool,
}

impl<T: Default> SensorRead<T> {
    pub fn ok(value: T) -> Self {
        Self { value, valid: true }
    }

    /// An invalid read carrying the type's default value.
    pub fn invalid() -> Self {
        Self { value: T::default(), valid: false }
    }
}

impl<T: Default> From<Result<T, SensorError>> for SensorRead<T> {
    fn from(r: Result<T, SensorError>) -> Self {
        match r {
            Ok(v) => Self::ok(v),
            Err(_) => Self::invalid(),
        }
    }
}

/// One temperature / humidity sample.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct ClimateSample {
    pub temperature_c: f32,
    pub humidity_pct: f32,
}

/// Read-side port for the periodically polled sensors.
pub trait SensorPort {
    fn read_climate(&mut self) -> SensorRead<ClimateSample>;

    /// Battery terminal voltage in volts (after the divider is undone).
    fn read_battery_voltage(&mut self) -> SensorRead<f32>;
}

// ───────────────────────────────────────────────────────────────
// Actuator port (driven adapter: domain → hardware)
// ───────────────────────────────────────────────────────────────

pub trait ActuatorPort {
    /// Logical LED state; adapters handle the active-low pin.
    fn set_led(&mut self, on: bool);

    fn set_relay(&mut self, on: bool);

    /// Push one frame of pixel colours to the strip.
    fn show_strip(&mut self, pixels: &[Rgb]);
}

// ───────────────────────────────────────────────────────────────
// Display port
// ───────────────────────────────────────────────────────────────

/// Renders a composed frame to the status panel.
pub trait DisplayPort {
    fn render(&mut self, frame: &crate::display::DisplayFrame);
}

// ───────────────────────────────────────────────────────────────
// Notifier port (outbound alerts)
// ───────────────────────────────────────────────────────────────

/// Sends a short text notification.  Fire-and-forget from the domain's view:
/// errors are logged by the caller and never retried.
pub trait NotifierPort {
    fn notify(&mut self, message: &str) -> Result<(), CommsError>;
}

/// Everything the scheduler pass touches besides the serial line.
///
/// Blanket-implemented, so a single adapter (or mock) that satisfies every
/// port can be passed as one `&mut` without double borrows.
pub trait Board: SensorPort + ActuatorPort + DisplayPort + NotifierPort {}

impl<T: SensorPort + ActuatorPort + DisplayPort + NotifierPort> Board for T {}

// ───────────────────────────────────────────────────────────────
// Command source (driving adapter: web → domain)
// ───────────────────────────────────────────────────────────────

/// Pending commands from the control surface, drained once per pass.
pub trait CommandSource {
    fn poll_command(&mut self) -> Option<AppCommand>;
}

// ───────────────────────────────────────────────────────────────
// Event sink port (driven adapter: domain → logging / telemetry)
// ───────────────────────────────────────────────────────────────

/// The domain emits structured [`AppEvent`]s through this port.
pub trait EventSink {
    fn emit(&mut self, event: &AppEvent);
}

// ───────────────────────────────────────────────────────────────
// Configuration port (driven adapter: domain ↔ persistent config)
// ───────────────────────────────────────────────────────────────

/// Loads and persists system configuration.
///
/// Implementations MUST validate config values before persisting.
/// Invalid ranges are rejected with [`ConfigError::ValidationFailed`],
/// not silently clamped.
pub trait ConfigPort {
    /// Load configuration from persistent storage.
    /// Returns [`SystemConfig::default()`] if no stored config exists.
    fn load(&self) -> Result<SystemConfig, ConfigError>;

    /// Validate and persist configuration.
    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`ConfigPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    /// The `&'static str` describes which field and why.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

impl core::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        match self {
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl From<ConfigError> for crate::error::Error {
    fn from(e: ConfigError) -> Self {
        match e {
            ConfigError::Corrupted => Self::Config("stored config corrupted"),
            ConfigError::ValidationFailed(msg) => Self::Config(msg),
            ConfigError::IoError => Self::Config("config storage I/O error"),
        }
    }
}

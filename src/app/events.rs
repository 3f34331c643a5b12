//! Outbound application events.
//!
//! The [`AppService`](super::service::AppService) emits these through the
//! [`EventSink`](super::ports::EventSink) port.  Adapters on the other
//! side decide what to do with them (serial log, test recorder).

use super::state::{Co2Reading, ResultCode};

/// Which actuator changed in an [`AppEvent::ActuatorChanged`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Actuator {
    Led,
    Relay,
    Strip,
}

/// Structured events emitted by the application core.
#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// The application service has started.
    Started,

    /// A CO2 frame decoded cleanly.
    Co2Sample(Co2Reading),

    /// A CO2 cycle ended without a usable frame.
    Co2Fault(ResultCode),

    /// The alert policy fired for this battery voltage.
    LowBattery(f32),

    /// An actuator was switched by a command.
    ActuatorChanged { actuator: Actuator, on: bool },

    /// Periodic sensors were polled this pass.
    Telemetry(TelemetryData),
}

/// A point-in-time summary suitable for logging.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TelemetryData {
    pub co2_ppm: u16,
    pub co2_result: ResultCode,
    pub temperature_c: f32,
    pub humidity_pct: f32,
    pub climate_valid: bool,
    pub battery_v: f32,
    pub battery_valid: bool,
}

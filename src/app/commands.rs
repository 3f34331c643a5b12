//! Inbound commands to the application service.
//!
//! These represent actions requested by the web control surface that the
//! [`AppService`](super::service::AppService) applies between scheduler
//! passes.

use super::state::{Message, Rgb, StripMode};

/// Partial strip update; `None` fields keep their current value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct StripUpdate {
    pub on: Option<bool>,
    pub brightness: Option<u8>,
    pub mode: Option<StripMode>,
    pub color: Option<Rgb>,
}

/// Commands that external adapters can send into the application core.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AppCommand {
    SetLed(bool),
    /// Flip the onboard LED (the `/led` route).
    ToggleLed,
    SetRelay(bool),
    ToggleRelay,
    SetStrip(StripUpdate),
    /// Replace the display message (already normalised).
    SetMessage(Message),
    /// Queue a zero-point calibration on the CO2 sensor.
    CalibrateCo2Zero,
}

//! Log-based event sink adapter.
//!
//! Implements [`EventSink`] by writing structured application events to
//! the ESP-IDF logger (which goes to UART / USB-CDC in production).
//! One line per event, prefixed with a fixed tag so the serial console can
//! be grepped.

use log::{info, warn};

use crate::app::events::AppEvent;
use crate::app::ports::EventSink;

/// Adapter that logs every [`AppEvent`] to the serial console.
#[derive(Debug, Default)]
pub struct LogEventSink;

impl LogEventSink {
    pub fn new() -> Self {
        Self
    }
}

impl EventSink for LogEventSink {
    fn emit(&mut self, event: &AppEvent) {
        match event {
            AppEvent::Telemetry(t) => {
                info!(
                    "TELEM | CO2={}ppm ({}) | T={:.1}\u{00b0}C RH={:.0}% ({}) | bat={:.2}V ({})",
                    t.co2_ppm,
                    t.co2_result.tag(),
                    t.temperature_c,
                    t.humidity_pct,
                    if t.climate_valid { "ok" } else { "invalid" },
                    t.battery_v,
                    if t.battery_valid { "ok" } else { "invalid" },
                );
            }
            AppEvent::Co2Sample(r) => {
                info!(
                    "CO2 | {} ppm | T={}\u{00b0}C{}",
                    r.ppm,
                    r.temperature_c,
                    if r.warming_up { " | warming up" } else { "" },
                );
            }
            AppEvent::Co2Fault(code) => {
                warn!("CO2 | fault {:?} ({})", code, code.tag());
            }
            AppEvent::LowBattery(v) => {
                warn!("ALERT | battery low {:.2} V", v);
            }
            AppEvent::ActuatorChanged { actuator, on } => {
                info!("STATE | {:?} -> {}", actuator, if *on { "on" } else { "off" });
            }
            AppEvent::Started => {
                info!("START | scheduler running");
            }
        }
    }
}

//! Application service: the hexagonal core.
//!
//! [`AppService`] owns the [`DeviceState`], the CO2 protocol driver, the
//! periodic poller, the alert policy and the display / strip controllers.
//! One call to [`AppService::tick`] is one cooperative scheduler pass.
//! All I/O flows through port traits injected at call sites, so the whole
//! pass runs against mock adapters on the host.
//!
//! ```text
//!  CommandSource ──▶ ┌─────────────────────────────┐ ──▶ EventSink
//!                    │          AppService          │
//!    ByteChannel ◀──▶│ Co2Driver · Poller · Alert   │──▶ Board
//!                    │ Display · Strip              │   (sensors, actuators,
//!                    └─────────────────────────────┘    display, notifier)
//! ```
//!
//! Pass order is fixed: commands, CO2 step, polls, alert, display, strip.

use core::fmt::Write as _;

use log::{info, warn};

use crate::alert::{AlertPolicy, AlertState};
use crate::config::SystemConfig;
use crate::display::DisplayController;
use crate::drivers::strip::StripAnimator;
use crate::poller::{PeriodicPoller, PollOutcome};
use crate::sensors::co2::frame::Command;
use crate::sensors::co2::{Co2Driver, Co2Step, Co2Timing};

use super::commands::{AppCommand, StripUpdate};
use super::events::{Actuator, AppEvent, TelemetryData};
use super::ports::{
    ActuatorPort, Board, ByteChannel, CommandSource, DisplayPort, EventSink, NotifierPort,
};
use super::state::{DeviceState, ResultCode};

/// Upper bound on commands applied in one pass, so a flood of web
/// requests cannot starve the CO2 driver.
pub const MAX_COMMANDS_PER_PASS: usize = 8;

/// Notification body buffer.
pub type Notification = heapless::String<64>;

/// What one [`AppService::tick`] did, for callers and tests.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PassReport {
    pub commands_applied: usize,
    pub co2: Co2Step,
    pub polled: PollOutcome,
    pub alert_fired: bool,
    pub display_refreshed: bool,
    pub strip_advanced: bool,
}

// ───────────────────────────────────────────────────────────────
// AppService
// ───────────────────────────────────────────────────────────────

/// The application service orchestrates all domain logic.
pub struct AppService<C: ByteChannel> {
    config: SystemConfig,
    state: DeviceState,
    co2: Co2Driver<C>,
    poller: PeriodicPoller,
    alert: AlertPolicy,
    display: DisplayController,
    strip: StripAnimator,
    pass_count: u64,
}

impl<C: ByteChannel> AppService<C> {
    /// Construct the service.  The CO2 driver takes ownership of the
    /// serial channel and its first request is due at `now_ms`.
    pub fn new(config: SystemConfig, channel: C, now_ms: u64) -> Self {
        let co2 = Co2Driver::new(channel, Co2Timing::from(&config), now_ms);
        Self {
            poller: PeriodicPoller::new(&config),
            alert: AlertPolicy::new(&config),
            display: DisplayController::new(&config),
            strip: StripAnimator::new(&config),
            state: DeviceState::default(),
            co2,
            config,
            pass_count: 0,
        }
    }

    // ── Lifecycle ─────────────────────────────────────────────

    /// Drive every actuator to the initial state and draw the first frame.
    pub fn start(&mut self, now_ms: u64, hw: &mut impl Board, sink: &mut impl EventSink) {
        hw.set_led(self.state.led_on);
        hw.set_relay(self.state.relay_on);
        hw.show_strip(&self.strip.render(&self.state.strip));
        if let Some(frame) = self.display.update(now_ms, &self.state) {
            hw.render(&frame);
        }
        sink.emit(&AppEvent::Started);
        info!("AppService started ({} strip pixels)", self.strip.len());
    }

    // ── Per-pass orchestration ────────────────────────────────

    /// Run one cooperative scheduler pass.
    ///
    /// The `hw` parameter satisfies every driven port at once, which avoids
    /// a double mutable borrow while keeping the port boundary explicit.
    pub fn tick(
        &mut self,
        now_ms: u64,
        commands: &mut impl CommandSource,
        hw: &mut impl Board,
        sink: &mut impl EventSink,
    ) -> PassReport {
        self.pass_count += 1;

        // (a) Pending web commands, bounded.
        let mut commands_applied = 0;
        while commands_applied < MAX_COMMANDS_PER_PASS {
            let Some(cmd) = commands.poll_command() else { break };
            self.handle_command(cmd, hw, sink);
            commands_applied += 1;
        }

        // (b) Exactly one CO2 protocol step.
        let co2 = self.co2.step(now_ms);
        if let Co2Step::Completed(reading) = co2 {
            self.state.co2 = reading;
            if reading.result == ResultCode::Ok {
                sink.emit(&AppEvent::Co2Sample(reading));
            } else {
                sink.emit(&AppEvent::Co2Fault(reading.result));
            }
        }

        // (c) Due periodic reads.
        let polled = self.poller.run(now_ms, hw, &mut self.state);
        if polled.any() {
            sink.emit(&AppEvent::Telemetry(self.build_telemetry()));
        }

        // (d) Alert policy, only on a fresh battery sample.
        let mut alert_fired = false;
        if polled.battery_polled
            && self.state.battery.valid
            && self.alert.evaluate(now_ms, self.state.battery.voltage)
        {
            alert_fired = true;
            let voltage = self.state.battery.voltage;
            sink.emit(&AppEvent::LowBattery(voltage));
            let mut body = Notification::new();
            let _ = write!(body, "{}: battery low ({:.2} V)", self.config.device_name, voltage);
            send_notification(hw, &body);
        }

        // (e) Display, only when the frame changed.
        let display_refreshed = match self.display.update(now_ms, &self.state) {
            Some(frame) => {
                hw.render(&frame);
                true
            }
            None => false,
        };

        // (f) Rainbow animation.
        let strip_advanced = match self.strip.advance(now_ms, &self.state.strip) {
            Some(pixels) => {
                hw.show_strip(&pixels);
                true
            }
            None => false,
        };

        PassReport {
            commands_applied,
            co2,
            polled,
            alert_fired,
            display_refreshed,
            strip_advanced,
        }
    }

    // ── Command handling ──────────────────────────────────────

    /// Apply one command from the control surface.
    pub fn handle_command(
        &mut self,
        cmd: AppCommand,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        match cmd {
            AppCommand::SetLed(on) => self.apply_led(on, hw, sink),
            AppCommand::ToggleLed => self.apply_led(!self.state.led_on, hw, sink),
            AppCommand::SetRelay(on) => self.apply_relay(on, hw, sink),
            AppCommand::ToggleRelay => self.apply_relay(!self.state.relay_on, hw, sink),
            AppCommand::SetStrip(update) => self.apply_strip(update, hw, sink),
            AppCommand::SetMessage(message) => {
                info!("Display message set to {:?}", message.as_str());
                self.state.message = message;
            }
            AppCommand::CalibrateCo2Zero => {
                if self.co2.queue_command(Command::CalibrateZero) {
                    info!("CO2 zero calibration queued");
                } else {
                    warn!("CO2 zero calibration rejected: a command is already queued");
                }
            }
        }
    }

    fn apply_led(&mut self, on: bool, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.state.led_on = on;
        hw.set_led(on);
        sink.emit(&AppEvent::ActuatorChanged { actuator: Actuator::Led, on });
    }

    fn apply_relay(&mut self, on: bool, hw: &mut impl ActuatorPort, sink: &mut impl EventSink) {
        self.state.relay_on = on;
        hw.set_relay(on);
        sink.emit(&AppEvent::ActuatorChanged { actuator: Actuator::Relay, on });
    }

    fn apply_strip(
        &mut self,
        update: StripUpdate,
        hw: &mut impl ActuatorPort,
        sink: &mut impl EventSink,
    ) {
        let strip = &mut self.state.strip;
        let was_on = strip.on;
        if let Some(on) = update.on {
            strip.on = on;
        }
        if let Some(brightness) = update.brightness {
            strip.brightness = brightness;
        }
        if let Some(mode) = update.mode {
            strip.mode = mode;
        }
        if let Some(color) = update.color {
            strip.color = color;
        }
        let strip = *strip;
        hw.show_strip(&self.strip.render(&strip));
        if strip.on != was_on {
            sink.emit(&AppEvent::ActuatorChanged { actuator: Actuator::Strip, on: strip.on });
        }
    }

    // ── Outbound notifications ────────────────────────────────

    /// One-off "online" notification after network bring-up.
    pub fn announce_online(&self, ip: &str, hw: &mut impl NotifierPort) {
        if !self.config.notify_on_boot {
            return;
        }
        let mut body = Notification::new();
        let _ = write!(body, "{} online at {}", self.config.device_name, ip);
        send_notification(hw, &body);
    }

    // ── Queries ───────────────────────────────────────────────

    /// Snapshot of the device state for the web and display layers.
    pub fn snapshot(&self) -> DeviceState {
        self.state.clone()
    }

    pub fn device_state(&self) -> &DeviceState {
        &self.state
    }

    /// Replace the display status row (normally the station IP).
    pub fn set_status_line(&mut self, text: &str) {
        self.display.set_status(text);
    }

    pub fn co2_driver(&self) -> &Co2Driver<C> {
        &self.co2
    }

    pub fn co2_driver_mut(&mut self) -> &mut Co2Driver<C> {
        &mut self.co2
    }

    pub fn alert_state(&self) -> AlertState {
        self.alert.state()
    }

    pub fn config(&self) -> &SystemConfig {
        &self.config
    }

    /// Total scheduler passes executed since startup.
    pub fn pass_count(&self) -> u64 {
        self.pass_count
    }

    /// Build a telemetry summary from the current state.
    pub fn build_telemetry(&self) -> TelemetryData {
        let s = &self.state;
        TelemetryData {
            co2_ppm: s.co2.ppm,
            co2_result: s.co2.result,
            temperature_c: s.climate.temperature_c,
            humidity_pct: s.climate.humidity_pct,
            climate_valid: s.climate.valid,
            battery_v: s.battery.voltage,
            battery_valid: s.battery.valid,
        }
    }
}

/// Fire-and-forget send; failures are logged and go no further.
fn send_notification(hw: &mut impl NotifierPort, body: &str) {
    match hw.notify(body) {
        Ok(()) => info!("Notification sent: {}", body),
        Err(e) => warn!("Notification failed: {}", e),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::app::state::StripMode;
    use crate::error::CommsError;

    struct NullLine;

    impl ByteChannel for NullLine {
        fn write_frame(&mut self, _bytes: &[u8]) -> Result<(), CommsError> {
            Ok(())
        }
        fn available(&mut self) -> usize {
            0
        }
        fn read_exact(&mut self, _buf: &mut [u8]) -> Result<(), CommsError> {
            Err(CommsError::UartReadFailed)
        }
        fn discard_buffered(&mut self) {}
    }

    #[derive(Default)]
    struct Actuators {
        led: bool,
        frames: usize,
    }

    impl ActuatorPort for Actuators {
        fn set_led(&mut self, on: bool) {
            self.led = on;
        }
        fn set_relay(&mut self, _on: bool) {}
        fn show_strip(&mut self, _pixels: &[crate::app::state::Rgb]) {
            self.frames += 1;
        }
    }

    struct Events(Vec<AppEvent>);

    impl EventSink for Events {
        fn emit(&mut self, event: &AppEvent) {
            self.0.push(event.clone());
        }
    }

    fn service() -> AppService<NullLine> {
        AppService::new(SystemConfig::default(), NullLine, 0)
    }

    #[test]
    fn toggle_led_flips_state_and_pin() {
        let mut app = service();
        let mut hw = Actuators::default();
        let mut sink = Events(Vec::new());
        app.handle_command(AppCommand::ToggleLed, &mut hw, &mut sink);
        assert!(app.device_state().led_on);
        assert!(hw.led);
        app.handle_command(AppCommand::ToggleLed, &mut hw, &mut sink);
        assert!(!app.device_state().led_on);
        assert_eq!(sink.0.len(), 2);
    }

    #[test]
    fn partial_strip_update_keeps_other_fields() {
        let mut app = service();
        let mut hw = Actuators::default();
        let mut sink = Events(Vec::new());
        let update = StripUpdate { on: Some(true), mode: Some(StripMode::Rainbow), ..Default::default() };
        app.handle_command(AppCommand::SetStrip(update), &mut hw, &mut sink);

        let s = app.device_state().strip;
        assert!(s.on);
        assert_eq!(s.mode, StripMode::Rainbow);
        assert_eq!(s.brightness, 64);
        assert_eq!(hw.frames, 1);
        assert_eq!(sink.0, vec![AppEvent::ActuatorChanged { actuator: Actuator::Strip, on: true }]);
    }

    #[test]
    fn calibration_is_queued_once() {
        let mut app = service();
        let mut hw = Actuators::default();
        let mut sink = Events(Vec::new());
        app.handle_command(AppCommand::CalibrateCo2Zero, &mut hw, &mut sink);
        assert!(!app.co2_driver_mut().queue_command(Command::CalibrateZero));
    }

    #[test]
    fn telemetry_reflects_state() {
        let app = service();
        let t = app.build_telemetry();
        assert_eq!(t.co2_result, ResultCode::NoResponse);
        assert!(!t.climate_valid);
    }
}

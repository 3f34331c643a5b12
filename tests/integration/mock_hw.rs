//! Mock board for integration tests.
//!
//! Records every actuator, display and notifier call so tests can assert
//! on the full history without touching GPIO, RMT or the network.  Sensor
//! reads come from scripted values the test sets up front.

use std::collections::VecDeque;

use airwatch::app::commands::AppCommand;
use airwatch::app::events::AppEvent;
use airwatch::app::ports::{
    ActuatorPort, ClimateSample, CommandSource, DisplayPort, EventSink, NotifierPort, SensorPort,
    SensorRead,
};
use airwatch::app::state::Rgb;
use airwatch::display::DisplayFrame;
use airwatch::error::CommsError;

// ── Call record ───────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq)]
pub enum BoardCall {
    Led(bool),
    Relay(bool),
    Strip(Vec<Rgb>),
    Render(DisplayFrame),
    Notify(String),
    ClimateRead,
    BatteryRead,
}

// ── MockBoard ─────────────────────────────────────────────────

pub struct MockBoard {
    pub calls: Vec<BoardCall>,
    pub climate: SensorRead<ClimateSample>,
    pub battery: SensorRead<f32>,
    pub notify_fails: bool,
}

#[allow(dead_code)]
impl MockBoard {
    pub fn new() -> Self {
        Self {
            calls: Vec::new(),
            climate: SensorRead::ok(ClimateSample { temperature_c: 21.5, humidity_pct: 40.0 }),
            battery: SensorRead::ok(3.9),
            notify_fails: false,
        }
    }

    pub fn with_battery(volts: f32) -> Self {
        Self { battery: SensorRead::ok(volts), ..Self::new() }
    }

    pub fn clear(&mut self) {
        self.calls.clear();
    }

    pub fn notifications(&self) -> Vec<&str> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BoardCall::Notify(m) => Some(m.as_str()),
                _ => None,
            })
            .collect()
    }

    pub fn frames(&self) -> Vec<&DisplayFrame> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                BoardCall::Render(f) => Some(f),
                _ => None,
            })
            .collect()
    }

    pub fn last_frame(&self) -> Option<&DisplayFrame> {
        self.frames().last().copied()
    }

    pub fn last_strip(&self) -> Option<&[Rgb]> {
        self.calls.iter().rev().find_map(|c| match c {
            BoardCall::Strip(px) => Some(px.as_slice()),
            _ => None,
        })
    }

    pub fn led_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                BoardCall::Led(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    pub fn relay_on(&self) -> bool {
        self.calls
            .iter()
            .rev()
            .find_map(|c| match c {
                BoardCall::Relay(on) => Some(*on),
                _ => None,
            })
            .unwrap_or(false)
    }

    /// Position of the first call matching `pred`, for ordering checks.
    pub fn position(&self, pred: impl Fn(&BoardCall) -> bool) -> Option<usize> {
        self.calls.iter().position(pred)
    }
}

impl Default for MockBoard {
    fn default() -> Self {
        Self::new()
    }
}

impl SensorPort for MockBoard {
    fn read_climate(&mut self) -> SensorRead<ClimateSample> {
        self.calls.push(BoardCall::ClimateRead);
        self.climate
    }

    fn read_battery_voltage(&mut self) -> SensorRead<f32> {
        self.calls.push(BoardCall::BatteryRead);
        self.battery
    }
}

impl ActuatorPort for MockBoard {
    fn set_led(&mut self, on: bool) {
        self.calls.push(BoardCall::Led(on));
    }

    fn set_relay(&mut self, on: bool) {
        self.calls.push(BoardCall::Relay(on));
    }

    fn show_strip(&mut self, pixels: &[Rgb]) {
        self.calls.push(BoardCall::Strip(pixels.to_vec()));
    }
}

impl DisplayPort for MockBoard {
    fn render(&mut self, frame: &DisplayFrame) {
        self.calls.push(BoardCall::Render(frame.clone()));
    }
}

impl NotifierPort for MockBoard {
    fn notify(&mut self, message: &str) -> Result<(), CommsError> {
        self.calls.push(BoardCall::Notify(message.to_string()));
        if self.notify_fails { Err(CommsError::NotifyFailed) } else { Ok(()) }
    }
}

// ── Command queue ─────────────────────────────────────────────

#[derive(Default)]
pub struct QueuedCommands(pub VecDeque<AppCommand>);

#[allow(dead_code)]
impl QueuedCommands {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, cmd: AppCommand) {
        self.0.push_back(cmd);
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }
}

impl CommandSource for QueuedCommands {
    fn poll_command(&mut self) -> Option<AppCommand> {
        self.0.pop_front()
    }
}

// ── Event recorder ────────────────────────────────────────────

#[derive(Default)]
pub struct RecordingSink {
    pub events: Vec<AppEvent>,
}

#[allow(dead_code)]
impl RecordingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn count(&self, pred: impl Fn(&AppEvent) -> bool) -> usize {
        self.events.iter().filter(|e| pred(e)).count()
    }
}

impl EventSink for RecordingSink {
    fn emit(&mut self, event: &AppEvent) {
        self.events.push(event.clone());
    }
}

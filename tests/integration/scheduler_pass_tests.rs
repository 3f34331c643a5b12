//! Scheduler pass tests: fixed step order, bounded command draining,
//! idle passes, strip animation and the display refresh rules.

use crate::mock_hw::{BoardCall, MockBoard, QueuedCommands, RecordingSink};

use airwatch::adapters::uart::UartChannel;
use airwatch::app::commands::{AppCommand, StripUpdate};
use airwatch::app::events::{Actuator, AppEvent};
use airwatch::app::service::{AppService, MAX_COMMANDS_PER_PASS, PassReport};
use airwatch::app::state::StripMode;
use airwatch::config::SystemConfig;
use airwatch::poller::PollOutcome;
use airwatch::sensors::co2::Co2Step;
use airwatch::sensors::co2::frame::{Command, encode_command};

pub fn make_app() -> (AppService<UartChannel>, MockBoard, RecordingSink) {
    let mut app = AppService::new(SystemConfig::default(), UartChannel::new(), 0);
    let mut hw = MockBoard::new();
    let mut sink = RecordingSink::new();
    app.start(0, &mut hw, &mut sink);
    hw.clear();
    (app, hw, sink)
}

#[test]
fn start_drives_actuators_and_draws_boot_frame() {
    let mut app = AppService::new(SystemConfig::default(), UartChannel::new(), 0);
    let mut hw = MockBoard::new();
    let mut sink = RecordingSink::new();
    app.start(0, &mut hw, &mut sink);

    assert_eq!(hw.calls[0], BoardCall::Led(false));
    assert_eq!(hw.calls[1], BoardCall::Relay(false));
    assert!(matches!(&hw.calls[2], BoardCall::Strip(px) if px.len() == 30));
    let frame = hw.last_frame().expect("boot frame");
    assert_eq!(frame.rows[0].as_str(), "CO2 --- NR");
    assert_eq!(frame.rows[1].as_str(), "Hello!");
    assert_eq!(sink.events, vec![AppEvent::Started]);
}

#[test]
fn first_pass_runs_steps_in_fixed_order() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    cmds.push(AppCommand::SetLed(true));

    let report = app.tick(0, &mut cmds, &mut hw, &mut sink);

    assert_eq!(report.commands_applied, 1);
    assert_eq!(report.co2, Co2Step::RequestSent);
    assert!(report.polled.battery_polled && report.polled.climate_polled);
    assert!(!report.alert_fired);
    assert!(report.display_refreshed);
    assert!(!report.strip_advanced);

    let led = hw.position(|c| *c == BoardCall::Led(true)).expect("led");
    let battery = hw.position(|c| *c == BoardCall::BatteryRead).expect("battery");
    let climate = hw.position(|c| *c == BoardCall::ClimateRead).expect("climate");
    let render = hw.position(|c| matches!(c, BoardCall::Render(_))).expect("render");
    assert!(led < battery && battery < climate && climate < render);

    let written = app.co2_driver().channel().sim_written();
    assert_eq!(written.len(), 1);
    assert_eq!(written[0], encode_command(Command::ReadConcentration).to_vec());
    assert_eq!(written[0], vec![0xFF, 0x01, 0x86, 0, 0, 0, 0, 0, 0x79]);
}

#[test]
fn commands_are_applied_before_the_co2_step() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    cmds.push(AppCommand::CalibrateCo2Zero);

    let report = app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert_eq!(report.co2, Co2Step::CommandSent(Command::CalibrateZero));

    let report = app.tick(1, &mut cmds, &mut hw, &mut sink);
    assert_eq!(report.co2, Co2Step::RequestSent);

    let written = app.co2_driver().channel().sim_written();
    assert_eq!(written[0], vec![0xFF, 0x01, 0x87, 0, 0, 0, 0, 0, 0x78]);
    assert_eq!(written[1][2], 0x86);
}

#[test]
fn command_drain_is_bounded_per_pass() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    for _ in 0..10 {
        cmds.push(AppCommand::ToggleRelay);
    }

    let first = app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert_eq!(first.commands_applied, MAX_COMMANDS_PER_PASS);
    assert_eq!(cmds.len(), 2);
    let relay_calls = hw.calls.iter().filter(|c| matches!(c, BoardCall::Relay(_))).count();
    assert_eq!(relay_calls, MAX_COMMANDS_PER_PASS);

    let second = app.tick(1, &mut cmds, &mut hw, &mut sink);
    assert_eq!(second.commands_applied, 2);
    assert_eq!(cmds.len(), 0);
    assert!(!app.device_state().relay_on, "ten toggles end where they started");
}

#[test]
fn pass_with_nothing_due_touches_nothing() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    app.tick(0, &mut cmds, &mut hw, &mut sink);
    hw.clear();

    let report = app.tick(1, &mut cmds, &mut hw, &mut sink);

    assert_eq!(
        report,
        PassReport {
            commands_applied: 0,
            co2: Co2Step::Idle,
            polled: PollOutcome::default(),
            alert_fired: false,
            display_refreshed: false,
            strip_advanced: false,
        }
    );
    assert!(hw.calls.is_empty());
    assert_eq!(app.pass_count(), 2);
}

#[test]
fn periodic_reads_follow_their_intervals() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    assert!(app.tick(0, &mut cmds, &mut hw, &mut sink).polled.any());
    let r = app.tick(9_999, &mut cmds, &mut hw, &mut sink);
    assert!(!r.polled.any());
    let r = app.tick(10_000, &mut cmds, &mut hw, &mut sink);
    assert!(r.polled.climate_polled && !r.polled.battery_polled);
    let r = app.tick(30_000, &mut cmds, &mut hw, &mut sink);
    assert!(r.polled.climate_polled && r.polled.battery_polled);
}

#[test]
fn invalid_climate_read_is_stored_as_invalid() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    hw.climate.valid = false;

    let r = app.tick(0, &mut cmds, &mut hw, &mut sink);

    assert!(r.polled.climate_polled);
    assert!(!app.device_state().climate.valid);
    // The boot frame already has an empty climate row, so nothing is redrawn.
    assert!(!r.display_refreshed);
    assert!(hw.frames().is_empty());
    assert_eq!(
        sink.count(|e| matches!(e, AppEvent::Telemetry(t) if !t.climate_valid)),
        1
    );

    hw.climate.valid = true;
    let r = app.tick(10_000, &mut cmds, &mut hw, &mut sink);
    assert!(r.display_refreshed);
    assert_eq!(hw.last_frame().expect("climate frame").rows[2].as_str(), "21.5C 40%");
}

#[test]
fn rainbow_strip_advances_on_frame_interval() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    cmds.push(AppCommand::SetStrip(StripUpdate {
        on: Some(true),
        mode: Some(StripMode::Rainbow),
        ..StripUpdate::default()
    }));

    let r = app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert!(!r.strip_advanced);
    let shown = hw.last_strip().expect("strip shown by command").to_vec();
    assert_eq!(shown.len(), 30);
    assert_ne!(shown[0], (0, 0, 0));
    assert_eq!(
        sink.count(|e| *e == AppEvent::ActuatorChanged { actuator: Actuator::Strip, on: true }),
        1
    );

    assert!(!app.tick(29, &mut cmds, &mut hw, &mut sink).strip_advanced);
    assert!(app.tick(30, &mut cmds, &mut hw, &mut sink).strip_advanced);
    assert_ne!(hw.last_strip().expect("advanced frame"), shown.as_slice());
}

#[test]
fn solid_strip_never_animates() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    cmds.push(AppCommand::SetStrip(StripUpdate {
        on: Some(true),
        color: Some((255, 0, 0)),
        brightness: Some(255),
        ..StripUpdate::default()
    }));
    app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert!(hw.last_strip().expect("strip").iter().all(|&px| px == (255, 0, 0)));

    for t in [100, 200, 300] {
        assert!(!app.tick(t, &mut cmds, &mut hw, &mut sink).strip_advanced);
    }
}

#[test]
fn long_status_line_scrolls() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    app.set_status_line("192.168.4.100 airwatch");

    app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert_eq!(hw.last_frame().expect("frame").scroll_px, 0);

    hw.clear();
    let r = app.tick(299, &mut cmds, &mut hw, &mut sink);
    assert!(!r.display_refreshed);

    let r = app.tick(300, &mut cmds, &mut hw, &mut sink);
    assert!(r.display_refreshed);
    assert_eq!(hw.last_frame().expect("scrolled").scroll_px, 2);
}

#[test]
fn short_status_line_stays_put() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    app.set_status_line("10.0.0.7");
    app.tick(0, &mut cmds, &mut hw, &mut sink);
    hw.clear();

    for t in [100, 200, 300, 400] {
        assert!(!app.tick(t, &mut cmds, &mut hw, &mut sink).display_refreshed);
    }
    assert!(hw.frames().is_empty());
}

#[test]
fn message_fills_two_rows_and_hides_climate() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    cmds.push(AppCommand::SetMessage(airwatch::app::state::normalize_message(
        "abcdefghijklmnopqrstuvwxyz",
    )));

    app.tick(0, &mut cmds, &mut hw, &mut sink);

    let frame = hw.last_frame().expect("frame");
    assert_eq!(frame.rows[1].as_str(), "abcdefghijkl");
    assert_eq!(frame.rows[2].as_str(), "mnopqrstuvwx");
}

#[test]
fn short_message_leaves_room_for_climate() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    app.tick(0, &mut cmds, &mut hw, &mut sink);

    let frame = hw.last_frame().expect("frame");
    assert_eq!(frame.rows[1].as_str(), "Hello!");
    assert_eq!(frame.rows[2].as_str(), "21.5C 40%");
}

//! Low-battery alert and boot notification behaviour.

use crate::mock_hw::{BoardCall, MockBoard, QueuedCommands, RecordingSink};

use airwatch::adapters::uart::UartChannel;
use airwatch::app::events::AppEvent;
use airwatch::app::service::AppService;
use airwatch::config::SystemConfig;

fn app_with(config: SystemConfig, hw: &mut MockBoard) -> (AppService<UartChannel>, RecordingSink) {
    let mut app = AppService::new(config, UartChannel::new(), 0);
    let mut sink = RecordingSink::new();
    app.start(0, hw, &mut sink);
    hw.clear();
    (app, sink)
}

#[test]
fn low_battery_notifies_once_per_resend_window() {
    let mut hw = MockBoard::with_battery(3.0);
    let (mut app, mut sink) = app_with(SystemConfig::default(), &mut hw);
    let mut cmds = QueuedCommands::new();

    assert!(app.tick(0, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert_eq!(hw.notifications(), vec!["airwatch: battery low (3.00 V)"]);
    assert_eq!(sink.count(|e| *e == AppEvent::LowBattery(3.0)), 1);

    assert!(!app.tick(30_000, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert!(!app.tick(3_570_000, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert_eq!(hw.notifications().len(), 1);

    assert!(app.tick(3_600_000, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert_eq!(hw.notifications().len(), 2);
    assert_eq!(app.alert_state().suppressed_until_ms, 7_200_000);
}

#[test]
fn alert_is_only_evaluated_on_battery_polls() {
    let mut hw = MockBoard::with_battery(3.0);
    let config = SystemConfig { battery_alert_resend_ms: 5_000, ..SystemConfig::default() };
    let (mut app, mut sink) = app_with(config, &mut hw);
    let mut cmds = QueuedCommands::new();

    assert!(app.tick(0, &mut cmds, &mut hw, &mut sink).alert_fired);

    // Past the resend window, but only the climate task is due.
    let r = app.tick(10_000, &mut cmds, &mut hw, &mut sink);
    assert!(r.polled.climate_polled && !r.polled.battery_polled);
    assert!(!r.alert_fired);

    let r = app.tick(30_000, &mut cmds, &mut hw, &mut sink);
    assert!(r.polled.battery_polled && r.alert_fired);
}

#[test]
fn missing_battery_never_alerts() {
    let mut hw = MockBoard::with_battery(0.0);
    let (mut app, mut sink) = app_with(SystemConfig::default(), &mut hw);
    let mut cmds = QueuedCommands::new();

    for t in (0..=120_000).step_by(30_000) {
        assert!(!app.tick(t, &mut cmds, &mut hw, &mut sink).alert_fired);
    }
    assert!(hw.notifications().is_empty());
    assert!(!app.alert_state().has_fired_once);
}

#[test]
fn invalid_battery_read_never_alerts() {
    let mut hw = MockBoard::with_battery(3.0);
    hw.battery.valid = false;
    let (mut app, mut sink) = app_with(SystemConfig::default(), &mut hw);
    let mut cmds = QueuedCommands::new();

    assert!(!app.tick(0, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert!(hw.notifications().is_empty());
}

#[test]
fn healthy_battery_never_alerts() {
    let mut hw = MockBoard::with_battery(3.4);
    let (mut app, mut sink) = app_with(SystemConfig::default(), &mut hw);
    let mut cmds = QueuedCommands::new();

    assert!(!app.tick(0, &mut cmds, &mut hw, &mut sink).alert_fired);
}

#[test]
fn failed_notification_is_not_retried() {
    let mut hw = MockBoard::with_battery(3.0);
    hw.notify_fails = true;
    let (mut app, mut sink) = app_with(SystemConfig::default(), &mut hw);
    let mut cmds = QueuedCommands::new();

    assert!(app.tick(0, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert!(app.alert_state().has_fired_once);

    app.tick(30_000, &mut cmds, &mut hw, &mut sink);
    app.tick(60_000, &mut cmds, &mut hw, &mut sink);
    let attempts = hw.calls.iter().filter(|c| matches!(c, BoardCall::Notify(_))).count();
    assert_eq!(attempts, 1);
}

#[test]
fn recovered_battery_does_not_rearm_alert() {
    let mut hw = MockBoard::with_battery(3.0);
    let (mut app, mut sink) = app_with(SystemConfig::default(), &mut hw);
    let mut cmds = QueuedCommands::new();

    assert!(app.tick(0, &mut cmds, &mut hw, &mut sink).alert_fired);
    hw.battery.value = 4.1;
    assert!(!app.tick(30_000, &mut cmds, &mut hw, &mut sink).alert_fired);
    hw.battery.value = 3.0;
    assert!(!app.tick(60_000, &mut cmds, &mut hw, &mut sink).alert_fired);
    assert_eq!(hw.notifications().len(), 1);
}

#[test]
fn boot_announcement_respects_config() {
    let mut hw = MockBoard::new();
    let (app, _) = app_with(SystemConfig::default(), &mut hw);
    app.announce_online("192.168.4.2", &mut hw);
    assert_eq!(hw.notifications(), vec!["airwatch online at 192.168.4.2"]);

    let mut quiet = MockBoard::new();
    let (app, _) = app_with(
        SystemConfig { notify_on_boot: false, ..SystemConfig::default() },
        &mut quiet,
    );
    app.announce_online("192.168.4.2", &mut quiet);
    assert!(quiet.notifications().is_empty());
}

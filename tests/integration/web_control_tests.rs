//! Web routes feeding commands into scheduler passes.
//!
//! Only `handler_round_trip_through_shared_channel` touches the global
//! command channel; every other test uses a local queue.

use crate::mock_hw::{BoardCall, QueuedCommands};
use crate::scheduler_pass_tests::make_app;

use airwatch::adapters::web::{Reply, dispatch, route};
use airwatch::app::commands::AppCommand;
use airwatch::app::state::StripMode;
use airwatch::channels::{self, ChannelCommandSource};

#[test]
fn led_route_toggles_against_snapshot() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    let action = route("/led", &app.snapshot());
    assert_eq!(action.reply, Reply::Text("ON"));
    cmds.push(action.command.expect("led command"));
    app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert!(app.device_state().led_on);
    assert!(hw.led_on());

    assert_eq!(route("/status", &app.snapshot()).reply, Reply::Text("ON"));

    let action = route("/led", &app.snapshot());
    assert_eq!(action.reply, Reply::Text("OFF"));
    cmds.push(action.command.expect("led command"));
    app.tick(1, &mut cmds, &mut hw, &mut sink);
    assert!(!hw.led_on());
}

#[test]
fn two_clicks_in_one_idle_window_both_toggle() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    // Both handlers see the same snapshot before the scheduler runs.
    let stale = app.snapshot();
    cmds.push(route("/relay", &stale).command.expect("relay command"));
    cmds.push(route("/relay", &stale).command.expect("relay command"));
    app.tick(0, &mut cmds, &mut hw, &mut sink);

    assert!(!app.device_state().relay_on);
    let relay_calls: Vec<_> = hw
        .calls
        .iter()
        .filter(|c| matches!(c, BoardCall::Relay(_)))
        .collect();
    assert_eq!(relay_calls, vec![&BoardCall::Relay(true), &BoardCall::Relay(false)]);
}

#[test]
fn rejected_command_is_reported_busy() {
    let (app, _, _) = make_app();
    assert_eq!(dispatch("/strip?on=1", &app.snapshot(), |_| false), Reply::Busy);
    assert_eq!(dispatch("/strip?on=1", &app.snapshot(), |_| true), Reply::Text("OK"));
}

#[test]
fn relay_route_accepts_explicit_state() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    let action = route("/relay?on=1", &app.snapshot());
    assert_eq!(action.command, Some(AppCommand::SetRelay(true)));
    cmds.push(AppCommand::SetRelay(true));
    app.tick(0, &mut cmds, &mut hw, &mut sink);
    assert!(hw.relay_on());

    assert!(matches!(route("/relay?on=maybe", &app.snapshot()).reply, Reply::BadRequest(_)));
}

#[test]
fn message_route_updates_display() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    let action = route("/msg?t=++Open+window%21++", &app.snapshot());
    assert_eq!(action.reply, Reply::Redirect("/"));
    cmds.push(action.command.expect("message command"));
    app.tick(0, &mut cmds, &mut hw, &mut sink);

    assert_eq!(app.device_state().message.as_str(), "Open window!");
    assert_eq!(hw.last_frame().expect("frame").rows[1].as_str(), "Open window!");
}

#[test]
fn blank_message_clears_the_row() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    cmds.push(route("/msg?t=+++", &app.snapshot()).command.expect("message command"));
    app.tick(0, &mut cmds, &mut hw, &mut sink);

    assert_eq!(app.device_state().message.as_str(), " ");
}

#[test]
fn strip_route_sets_colour_and_mode() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    let action = route("/strip?on=1&mode=solid&color=00ff00&brightness=255", &app.snapshot());
    assert_eq!(action.reply, Reply::Text("OK"));
    cmds.push(action.command.expect("strip command"));
    app.tick(0, &mut cmds, &mut hw, &mut sink);

    let strip = app.device_state().strip;
    assert!(strip.on);
    assert_eq!(strip.mode, StripMode::Solid);
    assert!(hw.last_strip().expect("strip").iter().all(|&px| px == (0, 255, 0)));
}

#[test]
fn calibrate_route_queues_sensor_command() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();

    let action = route("/co2/calibrate", &app.snapshot());
    assert_eq!(action.reply, Reply::Text("QUEUED"));
    cmds.push(action.command.expect("calibrate command"));
    app.tick(0, &mut cmds, &mut hw, &mut sink);

    let written = app.co2_driver().channel().sim_written();
    assert_eq!(written[0][2], 0x87);
}

#[test]
fn state_route_reflects_applied_commands() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    cmds.push(AppCommand::SetRelay(true));
    app.tick(0, &mut cmds, &mut hw, &mut sink);

    let Reply::Json(body) = route("/api/state", &app.snapshot()).reply else {
        panic!("expected json");
    };
    let v: serde_json::Value = serde_json::from_str(&body).expect("valid json");
    assert_eq!(v["relay_on"], serde_json::Value::Bool(true));
    assert_eq!(v["battery"]["valid"], serde_json::Value::Bool(true));
}

#[test]
fn state_route_flags_a_timed_out_reading() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut cmds = QueuedCommands::new();
    app.tick(0, &mut cmds, &mut hw, &mut sink);
    app.tick(500, &mut cmds, &mut hw, &mut sink);

    let Reply::Json(body) = route("/api/state", &app.snapshot()).reply else {
        panic!("expected json");
    };
    let v: serde_json::Value = serde_json::from_str(&body).expect("valid json");
    assert_eq!(v["co2"]["result"], "Timeout");
    assert_eq!(v["co2"]["sampled"], false);
    assert_eq!(v["co2"]["warming_up"], true);
}

#[test]
fn handler_round_trip_through_shared_channel() {
    let (mut app, mut hw, mut sink) = make_app();
    let mut source = ChannelCommandSource;
    channels::publish(app.device_state());

    // What a handler does: route against the published snapshot, submit.
    let action = route("/led", &channels::snapshot());
    assert!(channels::submit(action.command.expect("led command")));

    let report = app.tick(0, &mut source, &mut hw, &mut sink);
    assert_eq!(report.commands_applied, 1);
    channels::publish(app.device_state());

    assert_eq!(route("/status", &channels::snapshot()).reply, Reply::Text("ON"));
}

//! CO2 request/response cycles driven through full scheduler passes.

use crate::mock_hw::{MockBoard, QueuedCommands, RecordingSink};
use crate::scheduler_pass_tests::make_app;

use airwatch::adapters::uart::UartChannel;
use airwatch::app::events::AppEvent;
use airwatch::app::ports::ByteChannel;
use airwatch::app::service::AppService;
use airwatch::app::state::ResultCode;
use airwatch::sensors::co2::Co2Step;
use airwatch::sensors::co2::SessionState;

/// 400 ppm, 0 °C.
const FRAME_400PPM: [u8; 9] = [0xFF, 0x86, 0x01, 0x90, 0x28, 0x00, 0x00, 0x00, 0xC1];

/// 12000 ppm: valid checksum, above the plausibility ceiling.
const FRAME_12000PPM: [u8; 9] = [0xFF, 0x86, 0x2E, 0xE0, 0x28, 0x00, 0x00, 0x00, 0x44];

struct Rig {
    app: AppService<UartChannel>,
    hw: MockBoard,
    sink: RecordingSink,
    cmds: QueuedCommands,
}

impl Rig {
    fn new() -> Self {
        let (app, hw, sink) = make_app();
        Self { app, hw, sink, cmds: QueuedCommands::new() }
    }

    fn tick(&mut self, now: u64) -> Co2Step {
        self.app.tick(now, &mut self.cmds, &mut self.hw, &mut self.sink).co2
    }

    fn inject(&mut self, bytes: &[u8]) {
        self.app.co2_driver_mut().channel_mut().sim_inject(bytes);
    }

    fn requests_sent(&self) -> usize {
        self.app.co2_driver().channel().sim_written().len()
    }

    /// Run one successful 400 ppm cycle starting at `t`.
    fn good_cycle(&mut self, t: u64) {
        assert_eq!(self.tick(t), Co2Step::RequestSent);
        self.inject(&FRAME_400PPM);
        assert!(matches!(self.tick(t + 10), Co2Step::Completed(r) if r.result == ResultCode::Ok));
    }
}

#[test]
fn valid_frame_publishes_reading() {
    let mut rig = Rig::new();
    assert_eq!(rig.tick(0), Co2Step::RequestSent);
    rig.inject(&FRAME_400PPM);

    let Co2Step::Completed(reading) = rig.tick(20) else {
        panic!("expected a completed cycle");
    };
    assert_eq!(reading.result, ResultCode::Ok);
    assert_eq!(reading.ppm, 400);
    assert_eq!(reading.temperature_c, 0);
    assert_eq!(reading.sample_time_ms, 20);
    assert!(reading.warming_up);

    assert_eq!(rig.app.device_state().co2, reading);
    assert_eq!(rig.sink.count(|e| matches!(e, AppEvent::Co2Sample(_))), 1);
    assert_eq!(rig.hw.last_frame().expect("frame").rows[0].as_str(), "CO2 400 WU");
}

#[test]
fn next_request_waits_for_the_poll_interval() {
    let mut rig = Rig::new();
    rig.good_cycle(0);

    assert_eq!(rig.app.co2_driver().session().next_poll_due_at_ms, 5_010);
    assert_eq!(rig.tick(5_009), Co2Step::Idle);
    assert_eq!(rig.requests_sent(), 1);
    assert_eq!(rig.tick(5_010), Co2Step::RequestSent);
    assert_eq!(rig.requests_sent(), 2);
}

#[test]
fn partial_frame_waits_for_all_nine_bytes() {
    let mut rig = Rig::new();
    rig.tick(0);
    rig.inject(&FRAME_400PPM[..5]);
    assert_eq!(rig.tick(10), Co2Step::Idle);
    assert_eq!(rig.app.co2_driver().session().state, SessionState::AwaitingResponse);

    rig.inject(&FRAME_400PPM[5..]);
    assert!(matches!(rig.tick(20), Co2Step::Completed(r) if r.ppm == 400));
}

#[test]
fn silence_times_out_and_keeps_last_value() {
    let mut rig = Rig::new();
    rig.good_cycle(0);

    assert_eq!(rig.tick(5_010), Co2Step::RequestSent);
    assert_eq!(rig.tick(5_509), Co2Step::Idle);
    let Co2Step::Completed(reading) = rig.tick(5_510) else {
        panic!("expected timeout");
    };
    assert_eq!(reading.result, ResultCode::Timeout);
    assert_eq!(reading.ppm, 400, "last good value is retained");
    assert_eq!(reading.updated_at_ms, 5_510);
    assert_eq!(rig.sink.count(|e| *e == AppEvent::Co2Fault(ResultCode::Timeout)), 1);
    assert_eq!(rig.hw.last_frame().expect("frame").rows[0].as_str(), "CO2 400 TMO");

    // Recovery delay is the interval plus one second.
    assert_eq!(rig.app.co2_driver().session().next_poll_due_at_ms, 5_510 + 6_000);
}

#[test]
fn misaligned_stream_is_flushed_as_desync() {
    let mut rig = Rig::new();
    rig.tick(0);
    rig.inject(&[0x42; 9]);
    rig.inject(&[0x86, 0x01, 0x90]);

    let Co2Step::Completed(reading) = rig.tick(10) else {
        panic!("expected desync");
    };
    assert_eq!(reading.result, ResultCode::Desync);
    assert_eq!(rig.app.co2_driver_mut().channel_mut().available(), 0);

    assert_eq!(rig.tick(6_009), Co2Step::Idle);
    assert_eq!(rig.tick(6_010), Co2Step::RequestSent);
}

#[test]
fn bad_checksum_uses_normal_interval() {
    let mut rig = Rig::new();
    rig.tick(0);
    let mut corrupt = FRAME_400PPM;
    corrupt[8] = 0xC2;
    rig.inject(&corrupt);

    let Co2Step::Completed(reading) = rig.tick(10) else {
        panic!("expected checksum error");
    };
    assert_eq!(reading.result, ResultCode::ChecksumError);
    assert!(!reading.has_sample());
    assert_eq!(rig.app.co2_driver().session().next_poll_due_at_ms, 5_010);
}

#[test]
fn implausible_concentration_is_filtered() {
    let mut rig = Rig::new();
    rig.good_cycle(0);
    rig.tick(5_010);
    rig.inject(&FRAME_12000PPM);

    let Co2Step::Completed(reading) = rig.tick(5_020) else {
        panic!("expected filtered");
    };
    assert_eq!(reading.result, ResultCode::Filtered);
    assert_eq!(reading.ppm, 400);
    assert_eq!(rig.hw.last_frame().expect("frame").rows[0].as_str(), "CO2 400 FLT");
}

#[test]
fn warmup_flag_clears_after_preheat() {
    let mut rig = Rig::new();
    rig.good_cycle(0);

    // Walk the clock past the three minute preheat with good cycles.
    let mut t = 5_010;
    while t < 180_000 {
        rig.good_cycle(t);
        t += 5_010;
    }
    rig.good_cycle(t);
    let reading = rig.app.device_state().co2;
    assert_eq!(reading.result, ResultCode::Ok);
    assert!(!reading.warming_up);
    assert_eq!(rig.hw.last_frame().expect("frame").rows[0].as_str(), "CO2 400");
}

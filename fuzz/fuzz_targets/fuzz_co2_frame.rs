//! Fuzz target: CO2 response decoding and the driver's receive path.
//!
//! The first 9 bytes go straight to `decode_response`; the whole input is
//! then streamed in 4-byte chunks into a `Co2Driver`, each chunk also
//! advancing the clock by 16 ms per unit of its first byte.  Neither may
//! panic, and the driver must never report an implausible reading as `Ok`.
//!
//! cargo fuzz run fuzz_co2_frame

#![no_main]

use airwatch::adapters::uart::UartChannel;
use airwatch::app::state::ResultCode;
use airwatch::sensors::co2::frame::{FRAME_LEN, decode_response};
use airwatch::sensors::co2::{Co2Driver, Co2Step, Co2Timing};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    if let Ok(frame) = <[u8; FRAME_LEN]>::try_from(data.get(..FRAME_LEN).unwrap_or_default()) {
        let _ = decode_response(&frame);
    }

    let timing = Co2Timing::default();
    let mut driver = Co2Driver::new(UartChannel::new(), timing, 0);
    let mut now = 0u64;
    for chunk in data.chunks(4) {
        driver.channel_mut().sim_inject(chunk);
        now += u64::from(chunk[0]) * 16;
        if let Co2Step::Completed(r) = driver.step(now) {
            if r.result == ResultCode::Ok {
                assert!(r.ppm <= timing.max_plausible_ppm);
            }
        }
    }
});

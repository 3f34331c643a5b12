//! Hardware adapter: bridges real peripherals to domain port traits.
//!
//! Owns the [`SensorHub`], the actuator drivers, the panel and the
//! notifier, exposing them through [`SensorPort`], [`ActuatorPort`],
//! [`DisplayPort`] and [`NotifierPort`] so the scheduler takes a single
//! `&mut` [`Board`](crate::app::ports::Board).  On non-espidf targets the
//! underlying drivers use cfg-gated simulation stubs.

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{
    ActuatorPort, ClimateSample, DisplayPort, NotifierPort, SensorPort, SensorRead,
};
use crate::app::state::Rgb;
use crate::display::DisplayFrame;
use crate::drivers::led::OnboardLed;
use crate::drivers::relay::Relay;
use crate::drivers::ws2812::Ws2812;
use crate::error::CommsError;
use crate::sensors::SensorHub;

/// Concrete adapter that combines all hardware behind port traits.
pub struct HardwareAdapter<I, D, P, N> {
    sensor_hub: SensorHub<I, D>,
    led: OnboardLed,
    relay: Relay,
    strip: Ws2812,
    panel: P,
    notifier: N,
}

impl<I, D, P, N> HardwareAdapter<I, D, P, N> {
    pub fn new(
        sensor_hub: SensorHub<I, D>,
        led: OnboardLed,
        relay: Relay,
        strip: Ws2812,
        panel: P,
        notifier: N,
    ) -> Self {
        Self {
            sensor_hub,
            led,
            relay,
            strip,
            panel,
            notifier,
        }
    }

    pub fn panel_mut(&mut self) -> &mut P {
        &mut self.panel
    }

    pub fn notifier_mut(&mut self) -> &mut N {
        &mut self.notifier
    }

    pub fn strip(&self) -> &Ws2812 {
        &self.strip
    }
}

// ── SensorPort implementation ─────────────────────────────────

impl<I: I2c, D: DelayNs, P, N> SensorPort for HardwareAdapter<I, D, P, N> {
    fn read_climate(&mut self) -> SensorRead<ClimateSample> {
        self.sensor_hub.read_climate()
    }

    fn read_battery_voltage(&mut self) -> SensorRead<f32> {
        self.sensor_hub.read_battery()
    }
}

// ── ActuatorPort implementation ───────────────────────────────

impl<I, D, P, N> ActuatorPort for HardwareAdapter<I, D, P, N> {
    fn set_led(&mut self, on: bool) {
        self.led.set(on);
    }

    fn set_relay(&mut self, on: bool) {
        self.relay.set(on);
    }

    fn show_strip(&mut self, pixels: &[Rgb]) {
        if let Err(e) = self.strip.write(pixels) {
            warn!("Strip write failed: {:?}", e);
        }
    }
}

// ── DisplayPort / NotifierPort delegation ─────────────────────

impl<I, D, P: DisplayPort, N> DisplayPort for HardwareAdapter<I, D, P, N> {
    fn render(&mut self, frame: &DisplayFrame) {
        self.panel.render(frame);
    }
}

impl<I, D, P, N: NotifierPort> NotifierPort for HardwareAdapter<I, D, P, N> {
    fn notify(&mut self, message: &str) -> Result<(), CommsError> {
        self.notifier.notify(message)
    }
}

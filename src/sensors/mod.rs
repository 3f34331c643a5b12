//! Sensor subsystem: individual drivers and the aggregating [`SensorHub`].
//!
//! The CO2 sensor is not part of the hub: its UART is owned exclusively by
//! the [`co2::Co2Driver`] state machine.  The hub only covers the sensors
//! the periodic poller reads synchronously.

pub mod battery;
pub mod climate;
pub mod co2;

use embedded_hal::delay::DelayNs;
use embedded_hal::i2c::I2c;
use log::warn;

use crate::app::ports::{ClimateSample, SensorRead};
use battery::BatterySensor;
use climate::ClimateSensor;

/// Owns the polled sensor drivers.
pub struct SensorHub<I, D> {
    pub climate: ClimateSensor<I, D>,
    pub battery: BatterySensor,
}

impl<I: I2c, D: DelayNs> SensorHub<I, D> {
    /// Construct a new hub.  Pass in pre-built drivers (built in main
    /// where peripheral ownership is established).
    pub fn new(climate: ClimateSensor<I, D>, battery: BatterySensor) -> Self {
        Self { climate, battery }
    }

    /// One climate measurement; failures are logged and reported as invalid.
    pub fn read_climate(&mut self) -> SensorRead<ClimateSample> {
        let r = self.climate.measure();
        if let Err(e) = r {
            warn!("Climate read failed: {}", e);
        }
        r.into()
    }

    pub fn read_battery(&mut self) -> SensorRead<f32> {
        let r = self.battery.read_volts();
        if let Err(e) = r {
            warn!("Battery read failed: {}", e);
        }
        r.into()
    }
}

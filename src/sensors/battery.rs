//! Battery voltage sense through a 2:1 resistor divider.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: reads ADC1 via the oneshot API (initialised by hw_init).
//! On host/test: reads from a static `AtomicU16` for injection.

#[cfg(not(target_os = "espidf"))]
use core::sync::atomic::{AtomicU16, Ordering};

#[cfg(target_os = "espidf")]
use crate::drivers::hw_init;
use crate::error::SensorError;
use crate::pins;

#[cfg(not(target_os = "espidf"))]
static SIM_BATTERY_ADC: AtomicU16 = AtomicU16::new(0);

/// Inject a raw 12-bit ADC code for the next read.
#[cfg(not(target_os = "espidf"))]
pub fn sim_set_battery_adc(raw: u16) {
    SIM_BATTERY_ADC.store(raw, Ordering::Relaxed);
}

const ADC_MAX: f32 = 4095.0;
/// Full-scale input at 12 dB attenuation.
const V_REF: f32 = 3.3;

/// Convert a raw ADC code to battery terminal volts.
pub fn adc_to_volts(raw: u16) -> f32 {
    f32::from(raw.min(4095)) / ADC_MAX * V_REF * pins::BATTERY_DIVIDER_RATIO
}

pub struct BatterySensor {
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    channel: u32,
}

impl BatterySensor {
    pub fn new(channel: u32) -> Self {
        Self { channel }
    }

    /// Battery voltage in volts.  A floating input reads near 0 V, which the
    /// domain treats as "no battery" rather than a low cell.
    pub fn read_volts(&self) -> Result<f32, SensorError> {
        self.read_adc().map(adc_to_volts)
    }

    #[cfg(target_os = "espidf")]
    fn read_adc(&self) -> Result<u16, SensorError> {
        hw_init::adc1_read(self.channel)
    }

    #[cfg(not(target_os = "espidf"))]
    fn read_adc(&self) -> Result<u16, SensorError> {
        Ok(SIM_BATTERY_ADC.load(Ordering::Relaxed))
    }
}

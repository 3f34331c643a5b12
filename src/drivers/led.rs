//! Onboard LED driver.
//!
//! The SuperMini's blue LED is wired active-low: driving the pin LOW turns
//! it on.  Callers only ever see the logical state.
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes the GPIO configured by hw_init.
//! On host/test: tracks state in-memory only.

use crate::drivers::hw_init;
use crate::pins;

pub struct OnboardLed {
    on: bool,
}

impl OnboardLed {
    /// Takes the pin over and drives it to the "off" level.
    pub fn new() -> Self {
        let mut led = Self { on: true };
        led.set(false);
        led
    }

    /// Pin level for a logical state.
    pub const fn level_for(on: bool) -> bool {
        !on
    }

    pub fn set(&mut self, on: bool) {
        hw_init::gpio_write(pins::LED_GPIO, Self::level_for(on));
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Default for OnboardLed {
    fn default() -> Self {
        Self::new()
    }
}

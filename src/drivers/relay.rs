//! Relay module driver (active-high input).
//!
//! ## Dual-target design
//!
//! On ESP-IDF: writes the GPIO configured by hw_init.
//! On host/test: tracks state in-memory only.

use log::info;

use crate::drivers::hw_init;
use crate::pins;

pub struct Relay {
    on: bool,
}

impl Relay {
    pub fn new() -> Self {
        hw_init::gpio_write(pins::RELAY_GPIO, false);
        Self { on: false }
    }

    pub fn set(&mut self, on: bool) {
        if on != self.on {
            info!("Relay: {}", if on { "closed" } else { "open" });
        }
        hw_init::gpio_write(pins::RELAY_GPIO, on);
        self.on = on;
    }

    pub fn is_on(&self) -> bool {
        self.on
    }
}

impl Default for Relay {
    fn default() -> Self {
        Self::new()
    }
}

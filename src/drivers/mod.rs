//! Actuator drivers, hardware initialisation, and peripheral helpers.

pub mod hw_init;
pub mod led;
pub mod relay;
pub mod strip;
pub mod watchdog;
pub mod ws2812;

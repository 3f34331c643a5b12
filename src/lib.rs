//! Airwatch firmware library.
//!
//! Exposes the pure-logic modules (CO2 frame codec and driver, poller,
//! alert policy, display composition, application service) for host-side
//! testing.  All ESP-IDF-specific code is guarded by
//! `#[cfg(target_os = "espidf")]` within each module.

#![deny(unused_must_use)]

pub mod alert;
pub mod app;
pub mod channels;
pub mod config;
pub mod display;
pub mod error;
pub mod pins;
pub mod poller;

pub mod adapters;
pub mod drivers;
pub mod sensors;

mod esp_link_shims;

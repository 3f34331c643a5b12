//! Application core: pure domain logic, zero I/O.
//!
//! This module holds the scheduler pass that ties the CO2 protocol driver,
//! the periodic poller, the alert policy and the display / strip
//! controllers together around one owned [`state::DeviceState`].
//! All interaction with hardware happens through **port traits** defined
//! in [`ports`], keeping this layer fully testable without real peripherals.

pub mod commands;
pub mod events;
pub mod ports;
pub mod service;
pub mod state;

//! Integration test driver for the `tests/integration/` submodules.
//!
//! Each `mod` below maps to a file that exercises a specific subsystem
//! against mock adapters.  All tests run on the host (x86_64) with no
//! real hardware required.

mod alert_tests;
mod co2_protocol_tests;
mod mock_hw;
mod scheduler_pass_tests;
mod web_control_tests;

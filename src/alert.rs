//! Low-battery alert policy.
//!
//! Evaluated once per battery poll.  The policy decides whether a
//! notification should go out; sending it is the caller's job.
//!
//! ## Alert lifecycle
//!
//! 1. A valid reading below the threshold (and above the "no battery"
//!    sentinel) fires immediately the first time.
//! 2. After firing, repeats are suppressed until `now >= suppressed_until_ms`.
//! 3. Recovery above the threshold does **not** re-arm the first-fire path;
//!    the next alert still waits out the suppression window.

use log::{info, warn};

use crate::app::state::NO_BATTERY_V;
use crate::config::SystemConfig;

/// Debounce bookkeeping.  Created once at startup.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct AlertState {
    pub suppressed_until_ms: u64,
    pub has_fired_once: bool,
}

pub struct AlertPolicy {
    low_threshold_v: f32,
    resend_interval_ms: u64,
    state: AlertState,
}

impl AlertPolicy {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            low_threshold_v: config.battery_low_threshold_v,
            resend_interval_ms: u64::from(config.battery_alert_resend_ms),
            state: AlertState::default(),
        }
    }

    pub fn state(&self) -> AlertState {
        self.state
    }

    /// Returns `true` when a low-battery notification should be sent now.
    pub fn evaluate(&mut self, now_ms: u64, voltage: f32) -> bool {
        if voltage <= NO_BATTERY_V || voltage >= self.low_threshold_v {
            return false;
        }
        if self.state.has_fired_once && now_ms < self.state.suppressed_until_ms {
            return false;
        }

        if self.state.has_fired_once {
            info!("ALERT: resend window elapsed, battery still low");
        }
        warn!("ALERT: battery low ({:.2} V < {:.2} V)", voltage, self.low_threshold_v);
        self.state.has_fired_once = true;
        self.state.suppressed_until_ms = now_ms + self.resend_interval_ms;
        true
    }
}

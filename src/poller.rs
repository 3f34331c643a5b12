//! Periodic sensor poller.
//!
//! A fixed task table of `(target, interval, last_read)` entries.  Each
//! scheduler pass asks the table which tasks are due and performs their
//! synchronous reads through the [`SensorPort`], writing the results into
//! [`DeviceState`].  There are no priorities and no dynamic registration:
//! the table is built once from configuration.
//!
//! ```text
//!   now ──▶ PeriodicPoller::run ──▶ SensorPort::read_*()
//!                 │
//!                 └──▶ DeviceState.{battery, climate}
//! ```

use log::debug;

use crate::app::ports::SensorPort;
use crate::app::state::{BatteryReading, ClimateReading, DeviceState};
use crate::config::SystemConfig;

// ═══════════════════════════════════════════════════════════════
//  Task types
// ═══════════════════════════════════════════════════════════════

/// What a poll task reads.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PollTarget {
    Battery,
    Climate,
}

/// One row of the task table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PollTask {
    pub target: PollTarget,
    pub interval_ms: u64,
    /// `None` until the first read; a task that has never run is due.
    pub last_read_at_ms: Option<u64>,
}

impl PollTask {
    pub fn new(target: PollTarget, interval_ms: u64) -> Self {
        Self { target, interval_ms, last_read_at_ms: None }
    }

    pub fn is_due(&self, now_ms: u64) -> bool {
        match self.last_read_at_ms {
            None => true,
            Some(last) => now_ms.saturating_sub(last) >= self.interval_ms,
        }
    }
}

/// Which tasks ran during a pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PollOutcome {
    pub battery_polled: bool,
    pub climate_polled: bool,
}

impl PollOutcome {
    pub fn any(&self) -> bool {
        self.battery_polled || self.climate_polled
    }
}

// ═══════════════════════════════════════════════════════════════
//  Poller
// ═══════════════════════════════════════════════════════════════

const TASK_COUNT: usize = 2;

pub struct PeriodicPoller {
    tasks: [PollTask; TASK_COUNT],
}

impl PeriodicPoller {
    pub fn new(config: &SystemConfig) -> Self {
        Self {
            tasks: [
                PollTask::new(PollTarget::Battery, u64::from(config.battery_poll_interval_ms)),
                PollTask::new(PollTarget::Climate, u64::from(config.climate_poll_interval_ms)),
            ],
        }
    }

    pub fn tasks(&self) -> &[PollTask] {
        &self.tasks
    }

    /// Run every due task once.  Reads are passed through as-is: an invalid
    /// read is stored as invalid and not retried until the next interval.
    pub fn run(
        &mut self,
        now_ms: u64,
        sensors: &mut impl SensorPort,
        state: &mut DeviceState,
    ) -> PollOutcome {
        let mut outcome = PollOutcome::default();

        for task in self.tasks.iter_mut() {
            if !task.is_due(now_ms) {
                continue;
            }
            task.last_read_at_ms = Some(now_ms);

            match task.target {
                PollTarget::Battery => {
                    let r = sensors.read_battery_voltage();
                    state.battery = BatteryReading {
                        voltage: r.value,
                        valid: r.valid,
                        sample_time_ms: now_ms,
                    };
                    debug!("Poller: battery {:.2} V (valid={})", r.value, r.valid);
                    outcome.battery_polled = true;
                }
                PollTarget::Climate => {
                    let r = sensors.read_climate();
                    state.climate = ClimateReading {
                        temperature_c: r.value.temperature_c,
                        humidity_pct: r.value.humidity_pct,
                        valid: r.valid,
                        sample_time_ms: now_ms,
                    };
                    debug!(
                        "Poller: climate {:.1} C {:.1} % (valid={})",
                        r.value.temperature_c, r.value.humidity_pct, r.valid
                    );
                    outcome.climate_polled = true;
                }
            }
        }

        outcome
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

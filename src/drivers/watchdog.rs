//! Scheduler-loop watchdog.
//!
//! The task watchdog resets the chip when the main loop stops feeding it
//! for longer than [`SystemConfig::watchdog_timeout_ms`].  Each feed also
//! records the gap since the previous one, so slow passes show up in the
//! log long before they turn into a reset.

use log::{info, warn};

use crate::config::SystemConfig;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;

/// A feed gap at or above this share of the budget is logged.
const SLOW_PASS_PERCENT: u64 = 50;

/// Running feed statistics.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct FeedStats {
    pub feeds: u64,
    pub slow_passes: u32,
    pub longest_gap_ms: u64,
}

pub struct Watchdog {
    timeout_ms: u32,
    last_feed_ms: Option<u64>,
    stats: FeedStats,
    #[cfg(target_os = "espidf")]
    subscribed: bool,
}

impl Watchdog {
    /// Subscribe the calling task with a budget derived from `config`.
    pub fn for_loop(config: &SystemConfig) -> Self {
        let timeout_ms = config.watchdog_timeout_ms();
        info!(
            "Watchdog: {} ms budget (idle {} ms, notify timeout {} ms)",
            timeout_ms, config.loop_idle_ms, config.notify_timeout_ms
        );
        Self {
            timeout_ms,
            last_feed_ms: None,
            stats: FeedStats::default(),
            #[cfg(target_os = "espidf")]
            subscribed: subscribe(timeout_ms),
        }
    }

    pub fn timeout_ms(&self) -> u32 {
        self.timeout_ms
    }

    pub fn stats(&self) -> FeedStats {
        self.stats
    }

    /// Feed after pass `pass` finished at `now_ms`.  Returns the gap since
    /// the previous feed (zero for the first one).
    pub fn feed(&mut self, now_ms: u64, pass: u64) -> u64 {
        let gap = self.last_feed_ms.map_or(0, |t| now_ms.saturating_sub(t));
        self.last_feed_ms = Some(now_ms);
        self.stats.feeds += 1;
        self.stats.longest_gap_ms = self.stats.longest_gap_ms.max(gap);

        if gap * 100 >= u64::from(self.timeout_ms) * SLOW_PASS_PERCENT {
            self.stats.slow_passes += 1;
            warn!(
                "Watchdog: pass {} fed after {} ms ({} ms budget, {} slow so far)",
                pass, gap, self.timeout_ms, self.stats.slow_passes
            );
        }

        #[cfg(target_os = "espidf")]
        if self.subscribed {
            // SAFETY: resets the TWDT entry of the task that subscribed.
            unsafe {
                esp_task_wdt_reset();
            }
        }
        gap
    }
}

#[cfg(target_os = "espidf")]
fn subscribe(timeout_ms: u32) -> bool {
    let cfg = esp_task_wdt_config_t {
        timeout_ms,
        idle_core_mask: 0,
        trigger_panic: true,
    };
    // SAFETY: plain FFI calls; the config outlives the reconfigure call and
    // a null handle subscribes the calling task.
    let ret = unsafe { esp_task_wdt_reconfigure(&cfg) };
    if ret != ESP_OK {
        warn!("Watchdog: reconfigure returned {}", ret);
    }
    let ret = unsafe { esp_task_wdt_add(core::ptr::null_mut()) };
    if ret != ESP_OK {
        warn!("Watchdog: subscribe failed ({}), running unguarded", ret);
    }
    ret == ESP_OK
}

//! System configuration parameters
//!
//! All tunable parameters for the Airwatch node. Values can be overridden
//! via NVS (non-volatile storage); see [`crate::adapters::nvs`].

use core::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::app::ports::ConfigError;

/// Slack on top of the longest blocking call before the watchdog fires.
const WATCHDOG_MARGIN_MS: u32 = 5_000;

/// Core system configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SystemConfig {
    // --- CO2 sensor (UART) ---
    /// Normal interval between concentration requests (milliseconds)
    pub co2_poll_interval_ms: u32,
    /// How long to wait for a complete 9-byte response (milliseconds)
    pub co2_response_timeout_ms: u32,
    /// Extra delay added to the normal interval after a timeout or desync
    pub co2_recovery_extra_ms: u32,
    /// Sensor preheat window after power-up (milliseconds)
    pub co2_warmup_ms: u32,
    /// Checksum-valid readings above this are rejected as implausible
    pub co2_max_plausible_ppm: u16,

    // --- Periodic sensors ---
    /// Temperature / humidity read interval (milliseconds)
    pub climate_poll_interval_ms: u32,
    /// Battery voltage read interval (milliseconds)
    pub battery_poll_interval_ms: u32,

    // --- Low-battery alert ---
    /// Voltage below which a low-battery alert fires
    pub battery_low_threshold_v: f32,
    /// Minimum time between repeated alerts (milliseconds)
    pub battery_alert_resend_ms: u32,
    /// Send a notification once the network is up after boot
    pub notify_on_boot: bool,
    /// HTTP timeout for one notification POST (milliseconds)
    pub notify_timeout_ms: u32,

    // --- Display ---
    /// Status row scroll step period (milliseconds)
    pub display_scroll_interval_ms: u32,

    // --- LED strip ---
    /// Number of pixels on the strip
    pub strip_len: u8,
    /// Frame period of the rainbow animation (milliseconds)
    pub strip_frame_interval_ms: u32,

    // --- Main loop / network ---
    /// Sleep between scheduler passes (milliseconds)
    pub loop_idle_ms: u32,
    /// WiFi association attempts before giving up
    pub wifi_max_attempts: u8,
    /// Name used in notifications and the web page title
    pub device_name: heapless::String<24>,
}

impl Default for SystemConfig {
    fn default() -> Self {
        let mut device_name = heapless::String::new();
        let _ = device_name.push_str("airwatch");

        Self {
            // CO2
            co2_poll_interval_ms: 5_000,
            co2_response_timeout_ms: 500,
            co2_recovery_extra_ms: 1_000,
            co2_warmup_ms: 180_000, // 3 min preheat
            co2_max_plausible_ppm: 10_000,

            // Periodic sensors
            climate_poll_interval_ms: 10_000,
            battery_poll_interval_ms: 30_000,

            // Alert
            battery_low_threshold_v: 3.4,
            battery_alert_resend_ms: 3_600_000, // 1/h
            notify_on_boot: true,
            notify_timeout_ms: 10_000,

            // Display
            display_scroll_interval_ms: 300,

            // Strip
            strip_len: 30,
            strip_frame_interval_ms: 30,

            // Loop / network
            loop_idle_ms: 5,
            wifi_max_attempts: 30,
            device_name,
        }
    }
}

impl SystemConfig {
    /// Delay before the next CO2 request after a timeout or desync.
    pub fn co2_recovery_delay_ms(&self) -> u32 {
        self.co2_poll_interval_ms + self.co2_recovery_extra_ms
    }

    /// Watchdog budget for one scheduler pass: the idle sleep plus a
    /// notification POST, which is the slowest thing a pass can block on.
    pub fn watchdog_timeout_ms(&self) -> u32 {
        self.loop_idle_ms + self.notify_timeout_ms + WATCHDOG_MARGIN_MS
    }

    /// Set one field from its textual form, as sent by `/config?key=value`.
    ///
    /// Only parses; range checks happen in
    /// [`validate_config`](crate::adapters::nvs::validate_config) on save.
    pub fn apply_setting(&mut self, key: &str, value: &str) -> Result<(), ConfigError> {
        fn num<T: FromStr>(value: &str) -> Result<T, ConfigError> {
            value
                .trim()
                .parse()
                .map_err(|_| ConfigError::ValidationFailed("value is not a number"))
        }

        match key {
            "co2_poll_interval_ms" => self.co2_poll_interval_ms = num(value)?,
            "co2_response_timeout_ms" => self.co2_response_timeout_ms = num(value)?,
            "co2_recovery_extra_ms" => self.co2_recovery_extra_ms = num(value)?,
            "co2_warmup_ms" => self.co2_warmup_ms = num(value)?,
            "co2_max_plausible_ppm" => self.co2_max_plausible_ppm = num(value)?,
            "climate_poll_interval_ms" => self.climate_poll_interval_ms = num(value)?,
            "battery_poll_interval_ms" => self.battery_poll_interval_ms = num(value)?,
            "battery_low_threshold_v" => self.battery_low_threshold_v = num(value)?,
            "battery_alert_resend_ms" => self.battery_alert_resend_ms = num(value)?,
            "notify_on_boot" => {
                self.notify_on_boot = match value {
                    "1" | "true" | "on" => true,
                    "0" | "false" | "off" => false,
                    _ => return Err(ConfigError::ValidationFailed("notify_on_boot must be 0 or 1")),
                }
            }
            "notify_timeout_ms" => self.notify_timeout_ms = num(value)?,
            "display_scroll_interval_ms" => self.display_scroll_interval_ms = num(value)?,
            "strip_len" => self.strip_len = num(value)?,
            "strip_frame_interval_ms" => self.strip_frame_interval_ms = num(value)?,
            "loop_idle_ms" => self.loop_idle_ms = num(value)?,
            "wifi_max_attempts" => self.wifi_max_attempts = num(value)?,
            "device_name" => {
                self.device_name.clear();
                self.device_name
                    .push_str(value.trim())
                    .map_err(|_| ConfigError::ValidationFailed("device_name is at most 24 bytes"))?;
            }
            _ => return Err(ConfigError::ValidationFailed("unknown config key")),
        }
        Ok(())
    }
}

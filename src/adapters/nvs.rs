//! NVS (Non-Volatile Storage) adapter.
//!
//! Implements [`ConfigPort`] for the Airwatch node: the whole
//! [`SystemConfig`] is stored as one `postcard` blob.
//!
//! - Config validation: all fields are range-checked before persistence.
//! - Atomic writes: ESP-IDF NVS commits are atomic per `nvs_commit()`.
//! - Host builds keep the blob in an in-memory map.

use crate::app::ports::{ConfigError, ConfigPort};
use crate::config::SystemConfig;
use crate::drivers::strip::MAX_STRIP_LEN;
use log::info;

#[cfg(not(target_os = "espidf"))]
use std::collections::HashMap;

#[cfg(target_os = "espidf")]
use esp_idf_svc::sys::*;
#[cfg(target_os = "espidf")]
use log::warn;

const CONFIG_NAMESPACE: &str = "airwatch";
const CONFIG_KEY: &str = "syscfg";

#[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
const MAX_BLOB_SIZE: usize = 512;

pub struct NvsAdapter {
    #[cfg(not(target_os = "espidf"))]
    store: std::cell::RefCell<HashMap<String, Vec<u8>>>,
}

impl NvsAdapter {
    /// Create a new NvsAdapter and initialise NVS flash.
    ///
    /// Returns `Err(ConfigError::IoError)` if flash initialisation fails
    /// unrecoverably. On first boot or after a version mismatch the NVS
    /// partition is erased and re-initialised automatically.
    pub fn new() -> Result<Self, ConfigError> {
        #[cfg(target_os = "espidf")]
        {
            // SAFETY: nvs_flash_init / nvs_flash_erase are called from the
            // single main-task context before any concurrent NVS access.
            let ret = unsafe { nvs_flash_init() };
            if ret == ESP_ERR_NVS_NO_FREE_PAGES || ret == ESP_ERR_NVS_NEW_VERSION_FOUND {
                warn!("NVS: erasing and re-initialising flash partition");
                if unsafe { nvs_flash_erase() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
                if unsafe { nvs_flash_init() } != ESP_OK {
                    return Err(ConfigError::IoError);
                }
            } else if ret != ESP_OK {
                return Err(ConfigError::IoError);
            }
            info!("NvsAdapter: ESP-IDF NVS initialised");
        }

        #[cfg(not(target_os = "espidf"))]
        info!("NvsAdapter: simulation backend");

        Ok(Self {
            #[cfg(not(target_os = "espidf"))]
            store: std::cell::RefCell::new(HashMap::new()),
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn composite_key(namespace: &str, key: &str) -> String {
        format!("{}::{}", namespace, key)
    }

    /// Overwrite the raw stored blob (host only, used to test corruption).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_put_raw(&self, bytes: &[u8]) {
        let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
        self.store.borrow_mut().insert(key, bytes.to_vec());
    }

    /// Open an NVS namespace, execute a closure with the handle, then close.
    #[cfg(target_os = "espidf")]
    fn with_nvs_handle<F, T>(namespace: &str, write: bool, f: F) -> Result<T, i32>
    where
        F: FnOnce(nvs_handle_t) -> Result<T, i32>,
    {
        let mut ns_buf = [0u8; 16];
        let ns_bytes = namespace.as_bytes();
        let len = ns_bytes.len().min(15);
        ns_buf[..len].copy_from_slice(&ns_bytes[..len]);

        let mut handle: nvs_handle_t = 0;
        let mode = if write {
            nvs_open_mode_t_NVS_READWRITE
        } else {
            nvs_open_mode_t_NVS_READONLY
        };

        let ret = unsafe { nvs_open(ns_buf.as_ptr() as *const _, mode, &mut handle) };
        if ret != ESP_OK {
            return Err(ret);
        }

        let result = f(handle);
        unsafe {
            nvs_close(handle);
        }
        result
    }
}

/// Range-check every tunable.  Out-of-range values are rejected, never clamped.
pub fn validate_config(cfg: &SystemConfig) -> Result<(), ConfigError> {
    if !(1_000..=600_000).contains(&cfg.co2_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "co2_poll_interval_ms must be 1000–600000",
        ));
    }
    if !(100..=2_000).contains(&cfg.co2_response_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "co2_response_timeout_ms must be 100–2000",
        ));
    }
    if cfg.co2_response_timeout_ms >= cfg.co2_poll_interval_ms {
        return Err(ConfigError::ValidationFailed(
            "co2_response_timeout_ms must be < co2_poll_interval_ms",
        ));
    }
    if cfg.co2_recovery_extra_ms > 60_000 {
        return Err(ConfigError::ValidationFailed(
            "co2_recovery_extra_ms must be 0–60000",
        ));
    }
    if cfg.co2_warmup_ms > 600_000 {
        return Err(ConfigError::ValidationFailed("co2_warmup_ms must be 0–600000"));
    }
    if !(2_000..=10_000).contains(&cfg.co2_max_plausible_ppm) {
        return Err(ConfigError::ValidationFailed(
            "co2_max_plausible_ppm must be 2000–10000",
        ));
    }
    if !(1_000..=3_600_000).contains(&cfg.climate_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "climate_poll_interval_ms must be 1000–3600000",
        ));
    }
    if !(1_000..=3_600_000).contains(&cfg.battery_poll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "battery_poll_interval_ms must be 1000–3600000",
        ));
    }
    if !(2.5..=4.2).contains(&cfg.battery_low_threshold_v) {
        return Err(ConfigError::ValidationFailed(
            "battery_low_threshold_v must be 2.5–4.2",
        ));
    }
    if !(60_000..=86_400_000).contains(&cfg.battery_alert_resend_ms) {
        return Err(ConfigError::ValidationFailed(
            "battery_alert_resend_ms must be 60000–86400000",
        ));
    }
    if !(1_000..=30_000).contains(&cfg.notify_timeout_ms) {
        return Err(ConfigError::ValidationFailed(
            "notify_timeout_ms must be 1000–30000",
        ));
    }
    if !(50..=5_000).contains(&cfg.display_scroll_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "display_scroll_interval_ms must be 50–5000",
        ));
    }
    if cfg.strip_len == 0 || usize::from(cfg.strip_len) > MAX_STRIP_LEN {
        return Err(ConfigError::ValidationFailed("strip_len must be 1–64"));
    }
    if !(10..=1_000).contains(&cfg.strip_frame_interval_ms) {
        return Err(ConfigError::ValidationFailed(
            "strip_frame_interval_ms must be 10–1000",
        ));
    }
    if !(1..=100).contains(&cfg.loop_idle_ms) {
        return Err(ConfigError::ValidationFailed("loop_idle_ms must be 1–100"));
    }
    if !(1..=100).contains(&cfg.wifi_max_attempts) {
        return Err(ConfigError::ValidationFailed("wifi_max_attempts must be 1–100"));
    }
    if cfg.device_name.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("device_name must not be empty"));
    }
    Ok(())
}

impl ConfigPort for NvsAdapter {
    fn load(&self) -> Result<SystemConfig, ConfigError> {
        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            if let Some(bytes) = self.store.borrow().get(&key) {
                let cfg: SystemConfig =
                    postcard::from_bytes(bytes).map_err(|_| ConfigError::Corrupted)?;
                info!("NvsAdapter: loaded config from store");
                Ok(cfg)
            } else {
                info!("NvsAdapter: no stored config, using defaults");
                Ok(SystemConfig::default())
            }
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, false, |handle| {
                let key_cstr = b"syscfg\0";
                let mut size: usize = 0;

                // First call: get size
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        core::ptr::null_mut(),
                        &mut size,
                    )
                };
                if ret == ESP_ERR_NVS_NOT_FOUND {
                    return Err(ESP_ERR_NVS_NOT_FOUND);
                }
                if ret != ESP_OK || size == 0 || size > MAX_BLOB_SIZE {
                    return Err(ret);
                }

                let mut buf = vec![0u8; size];
                let ret = unsafe {
                    nvs_get_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        buf.as_mut_ptr() as *mut _,
                        &mut size,
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(buf)
            });

            match result {
                Ok(bytes) => {
                    let cfg: SystemConfig =
                        postcard::from_bytes(&bytes).map_err(|_| ConfigError::Corrupted)?;
                    info!("NvsAdapter: loaded config from NVS ({} bytes)", bytes.len());
                    Ok(cfg)
                }
                Err(e) if e == ESP_ERR_NVS_NOT_FOUND => {
                    info!("NvsAdapter: no stored config, using defaults");
                    Ok(SystemConfig::default())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS read error {}, using defaults", e);
                    Ok(SystemConfig::default())
                }
            }
        }
    }

    fn save(&self, config: &SystemConfig) -> Result<(), ConfigError> {
        validate_config(config)?;
        let bytes = postcard::to_allocvec(config).map_err(|_| ConfigError::IoError)?;

        #[cfg(not(target_os = "espidf"))]
        {
            let key = Self::composite_key(CONFIG_NAMESPACE, CONFIG_KEY);
            self.store.borrow_mut().insert(key, bytes);
            info!("NvsAdapter: config saved (simulation)");
            Ok(())
        }

        #[cfg(target_os = "espidf")]
        {
            let result = Self::with_nvs_handle(CONFIG_NAMESPACE, true, |handle| {
                let key_cstr = b"syscfg\0";
                let ret = unsafe {
                    nvs_set_blob(
                        handle,
                        key_cstr.as_ptr() as *const _,
                        bytes.as_ptr() as *const _,
                        bytes.len(),
                    )
                };
                if ret != ESP_OK {
                    return Err(ret);
                }
                let ret = unsafe { nvs_commit(handle) };
                if ret != ESP_OK {
                    return Err(ret);
                }
                Ok(())
            });
            match result {
                Ok(()) => {
                    info!("NvsAdapter: config saved to NVS ({} bytes)", bytes.len());
                    Ok(())
                }
                Err(e) => {
                    warn!("NvsAdapter: NVS write error {}", e);
                    Err(ConfigError::IoError)
                }
            }
        }
    }
}

/// Load the stored config, falling back to defaults when it is unreadable
/// or no longer passes validation.
pub fn load_or_default(port: &impl ConfigPort) -> SystemConfig {
    match port.load() {
        Ok(cfg) => match validate_config(&cfg) {
            Ok(()) => cfg,
            Err(e) => {
                log::warn!("Stored config rejected ({}), using defaults", e);
                SystemConfig::default()
            }
        },
        Err(e) => {
            log::warn!("Config load failed ({}), using defaults", e);
            SystemConfig::default()
        }
    }
}

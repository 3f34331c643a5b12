//! WiFi station-mode adapter.
//!
//! Brings the station interface up once at boot with a bounded retry.
//! There is no runtime reconnect: if every attempt fails the adapter ends
//! in [`WifiState::Failed`] and `main()` shows the failure on the panel
//! and halts.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Retry policy
//!
//! Attempt `n` (0-based) that fails waits `base << n` ms, capped at
//! [`RetryPolicy::max_backoff_ms`], before the next try.

use core::fmt;
use core::fmt::Write as _;
use log::{error, info, warn};

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, BlockingWifi, ClientConfiguration, Configuration, EspWifi};

/// Dotted-quad station address.
pub type IpString = heapless::String<16>;

// ───────────────────────────────────────────────────────────────
// Errors
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
    AttemptsExhausted(u8),
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (must be 8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
            Self::AttemptsExhausted(n) => write!(f, "WiFi gave up after {} attempts", n),
        }
    }
}

impl From<ConnectivityError> for crate::error::Error {
    fn from(_: ConnectivityError) -> Self {
        Self::Comms(crate::error::CommsError::WifiConnectFailed)
    }
}

// ───────────────────────────────────────────────────────────────
// Credentials
// ───────────────────────────────────────────────────────────────

/// Build-time credentials (`AIRWATCH_WIFI_SSID` / `AIRWATCH_WIFI_PASS`).
pub fn build_credentials() -> (&'static str, &'static str) {
    (
        option_env!("AIRWATCH_WIFI_SSID").unwrap_or(""),
        option_env!("AIRWATCH_WIFI_PASS").unwrap_or(""),
    )
}

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() {
        return Err(ConnectivityError::NoCredentials);
    }
    if ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(ConnectivityError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), ConnectivityError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(ConnectivityError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// Retry policy
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u8,
    pub base_backoff_ms: u32,
    pub max_backoff_ms: u32,
}

impl RetryPolicy {
    pub fn new(max_attempts: u8) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_backoff_ms: 500,
            max_backoff_ms: 8_000,
        }
    }

    /// Wait after failed attempt `attempt` (0-based).
    pub fn backoff_ms(&self, attempt: u8) -> u32 {
        let shift = u32::from(attempt).min(16);
        self.base_backoff_ms.saturating_mul(1 << shift).min(self.max_backoff_ms)
    }
}

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connecting { attempt: u8 },
    Connected,
    /// Terminal: retries exhausted or credentials unusable.
    Failed,
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    ip: IpString,
    #[cfg(target_os = "espidf")]
    wifi: BlockingWifi<EspWifi<'static>>,
    /// Simulation: number of connect attempts that fail before one succeeds.
    #[cfg(not(target_os = "espidf"))]
    sim_failures_left: u32,
    #[cfg(not(target_os = "espidf"))]
    sim_attempts: u32,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: BlockingWifi<EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            ip: IpString::new(),
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            ip: IpString::new(),
            sim_failures_left: 0,
            sim_attempts: 0,
        }
    }

    /// Make the next `n` simulated attempts fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim_failures_left = n;
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim_attempts
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    /// Station address once connected, empty before.
    pub fn ip(&self) -> &str {
        &self.ip
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Try to associate up to `policy.max_attempts` times.
    ///
    /// `sleep_ms` is called with the backoff between attempts so tests can
    /// run without real delays.  On success the station IP is returned.
    pub fn connect_with_retry(
        &mut self,
        policy: RetryPolicy,
        mut sleep_ms: impl FnMut(u32),
    ) -> Result<IpString, ConnectivityError> {
        if self.ssid.is_empty() {
            self.state = WifiState::Failed;
            return Err(ConnectivityError::NoCredentials);
        }
        if let Err(e) = self.platform_configure() {
            self.state = WifiState::Failed;
            return Err(e);
        }

        for attempt in 0..policy.max_attempts {
            self.state = WifiState::Connecting { attempt };
            info!("WiFi: connecting to '{}' ({}/{})", self.ssid, attempt + 1, policy.max_attempts);
            match self.platform_connect() {
                Ok(ip) => {
                    self.ip = ip.clone();
                    self.state = WifiState::Connected;
                    info!("WiFi: connected, IP {}", self.ip);
                    return Ok(ip);
                }
                Err(e) => {
                    let wait = policy.backoff_ms(attempt);
                    warn!("WiFi: attempt {} failed ({}), retry in {} ms", attempt + 1, e, wait);
                    if attempt + 1 < policy.max_attempts {
                        sleep_ms(wait);
                    }
                }
            }
        }

        self.state = WifiState::Failed;
        error!("WiFi: giving up after {} attempts", policy.max_attempts);
        Err(ConnectivityError::AttemptsExhausted(policy.max_attempts))
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&conf).map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi.start().map_err(|_| ConnectivityError::ConnectionFailed)?;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<IpString, ConnectivityError> {
        self.wifi.connect().map_err(|_| ConnectivityError::ConnectionFailed)?;
        self.wifi.wait_netif_up().map_err(|_| ConnectivityError::ConnectionFailed)?;
        let info = self
            .wifi
            .wifi()
            .sta_netif()
            .get_ip_info()
            .map_err(|_| ConnectivityError::ConnectionFailed)?;
        let mut ip = IpString::new();
        let _ = write!(ip, "{}", info.ip);
        Ok(ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(&mut self) -> Result<(), ConnectivityError> {
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<IpString, ConnectivityError> {
        self.sim_attempts += 1;
        if self.sim_failures_left > 0 {
            self.sim_failures_left -= 1;
            return Err(ConnectivityError::ConnectionFailed);
        }
        let mut ip = IpString::new();
        let _ = write!(ip, "192.168.4.{}", 1 + self.sim_attempts);
        Ok(ip)
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

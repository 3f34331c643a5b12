//! Outbound push notifications over HTTP (ntfy-style topic URL).
//!
//! Implements [`NotifierPort`]: one POST per message, plain-text body,
//! no retry.  The topic URL comes from `AIRWATCH_NTFY_URL` at build time.
//!
//! - **`target_os = "espidf"`**: `EspHttpConnection` with the certificate
//!   bundle attached, so HTTPS topics work.
//! - **`not(target_os = "espidf")`**: records messages in memory.

use log::info;

use crate::app::ports::NotifierPort;
use crate::error::CommsError;

#[cfg(target_os = "espidf")]
use embedded_svc::http::Method;
#[cfg(target_os = "espidf")]
use embedded_svc::http::client::Client as HttpClient;
#[cfg(target_os = "espidf")]
use embedded_svc::io::Write;
#[cfg(target_os = "espidf")]
use esp_idf_svc::http::client::{Configuration as HttpClientConfiguration, EspHttpConnection};

/// Fallback topic when none was given at build time.
pub const DEFAULT_TOPIC_URL: &str = "https://ntfy.sh/airwatch";

/// Build-time topic URL.
pub fn topic_url() -> &'static str {
    option_env!("AIRWATCH_NTFY_URL").unwrap_or(DEFAULT_TOPIC_URL)
}

pub struct HttpNotifier {
    url: &'static str,
    title: heapless::String<24>,
    #[cfg_attr(not(target_os = "espidf"), allow(dead_code))]
    timeout_ms: u32,
    #[cfg(not(target_os = "espidf"))]
    sent: Vec<String>,
    #[cfg(not(target_os = "espidf"))]
    sim_fail: bool,
}

impl HttpNotifier {
    pub fn new(url: &'static str, title: &str) -> Self {
        let mut t = heapless::String::new();
        for ch in title.chars() {
            if t.push(ch).is_err() {
                break;
            }
        }
        Self {
            url,
            title: t,
            timeout_ms: 10_000,
            #[cfg(not(target_os = "espidf"))]
            sent: Vec::new(),
            #[cfg(not(target_os = "espidf"))]
            sim_fail: false,
        }
    }

    /// Per-request HTTP timeout.  The watchdog budget assumes this bound.
    pub fn with_timeout_ms(mut self, timeout_ms: u32) -> Self {
        self.timeout_ms = timeout_ms;
        self
    }

    pub fn url(&self) -> &str {
        self.url
    }

    /// Messages "sent" so far (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_sent(&self) -> &[String] {
        &self.sent
    }

    /// Make every following send fail (host only).
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_failing(&mut self, fail: bool) {
        self.sim_fail = fail;
    }

    #[cfg(target_os = "espidf")]
    fn post(&mut self, message: &str) -> Result<(), CommsError> {
        let http_conf = HttpClientConfiguration {
            timeout: Some(core::time::Duration::from_millis(u64::from(self.timeout_ms))),
            crt_bundle_attach: Some(esp_idf_svc::sys::esp_crt_bundle_attach),
            ..Default::default()
        };
        let conn = EspHttpConnection::new(&http_conf).map_err(|_| CommsError::NotifyFailed)?;
        let mut client = HttpClient::wrap(conn);

        let len = message.len().to_string();
        let headers = [
            ("Content-Type", "text/plain; charset=utf-8"),
            ("Content-Length", len.as_str()),
            ("Title", self.title.as_str()),
        ];
        let mut request = client
            .request(Method::Post, self.url, &headers)
            .map_err(|_| CommsError::NotifyFailed)?;
        request.write_all(message.as_bytes()).map_err(|_| CommsError::NotifyFailed)?;
        request.flush().map_err(|_| CommsError::NotifyFailed)?;
        let response = request.submit().map_err(|_| CommsError::NotifyFailed)?;

        let status = response.status();
        if !(200..300).contains(&status) {
            return Err(CommsError::NotifyRejected(status));
        }
        Ok(())
    }

    #[cfg(not(target_os = "espidf"))]
    fn post(&mut self, message: &str) -> Result<(), CommsError> {
        if self.sim_fail {
            return Err(CommsError::NotifyFailed);
        }
        self.sent.push(message.to_string());
        Ok(())
    }
}

impl NotifierPort for HttpNotifier {
    fn notify(&mut self, message: &str) -> Result<(), CommsError> {
        info!("Notify: POST {} ({} bytes, title {:?})", self.url, message.len(), self.title.as_str());
        self.post(message)
    }
}

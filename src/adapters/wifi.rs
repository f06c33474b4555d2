//! WiFi station-mode adapter.
//!
//! Implements [`LinkPort`] — the network link underneath the MQTT session.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: real ESP-IDF WiFi driver calls via `esp_idf_svc::wifi`.
//! - **all other targets**: simulation stubs for host-side tests.
//!
//! ## Reconnection policy
//!
//! Every driver call is non-blocking; association is observed on later
//! polls.  On disconnect, or when association does not complete within
//! [`CONNECT_TIMEOUT_MS`], the adapter waits an exponential backoff
//! (2 s → 4 s → 8 s … capped at 60 s) before retrying.

use log::{debug, error, info, warn};

use crate::app::ports::LinkPort;
use crate::error::LinkError;

#[cfg(target_os = "espidf")]
use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration, EspWifi};

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    /// Association requested.  `started_ms` is stamped on the first poll.
    Connecting { started_ms: Option<u64> },
    Connected,
    Reconnecting { attempt: u32, retry_at_ms: u64 },
}

const MIN_BACKOFF_MS: u32 = 2_000;
const MAX_BACKOFF_MS: u32 = 60_000;
/// Association attempts that take longer than this are abandoned.
pub const CONNECT_TIMEOUT_MS: u64 = 15_000;

/// Credentials baked in at build time (`WIFI_SSID`, `WIFI_PASS`).
pub fn env_credentials() -> Option<(&'static str, &'static str)> {
    option_env!("WIFI_SSID").map(|ssid| (ssid, option_env!("WIFI_PASS").unwrap_or("")))
}

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), LinkError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
        return Err(LinkError::InvalidSsid);
    }
    Ok(())
}

fn validate_password(password: &str) -> Result<(), LinkError> {
    if password.is_empty() {
        return Ok(());
    }
    if password.len() < 8 || password.len() > 64 {
        return Err(LinkError::InvalidPassword);
    }
    Ok(())
}

// ───────────────────────────────────────────────────────────────
// WiFi adapter
// ───────────────────────────────────────────────────────────────

/// Host-side stand-in for the radio.
#[cfg(not(target_os = "espidf"))]
#[derive(Debug, Default)]
struct SimRadio {
    associated: bool,
    /// Number of upcoming connect calls that fail.
    fail_next: u32,
    /// Association completes on the poll after the connect call.
    pending: bool,
    attempts: u32,
}

pub struct WifiAdapter {
    state: WifiState,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    backoff_ms: u32,
    last_rssi: Option<i8>,
    #[cfg(target_os = "espidf")]
    wifi: EspWifi<'static>,
    #[cfg(not(target_os = "espidf"))]
    sim: SimRadio,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: EspWifi<'static>) -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: MIN_BACKOFF_MS,
            last_rssi: None,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            backoff_ms: MIN_BACKOFF_MS,
            last_rssi: None,
            sim: SimRadio::default(),
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    /// Delay applied to the next failed attempt.
    pub fn backoff_ms(&self) -> u32 {
        self.backoff_ms
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), LinkError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid.push_str(ssid).map_err(|_| LinkError::InvalidSsid)?;
        self.password.clear();
        self.password.push_str(password).map_err(|_| LinkError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    fn schedule_retry(&mut self, attempt: u32, now_ms: u64) {
        self.state = WifiState::Reconnecting {
            attempt,
            retry_at_ms: now_ms + u64::from(self.backoff_ms),
        };
        info!("WiFi: retry {} in {}ms", attempt, self.backoff_ms);
        self.backoff_ms = self.backoff_ms.saturating_mul(2).min(MAX_BACKOFF_MS);
    }

    // ── Simulation hooks ──────────────────────────────────────

    /// Make the next `n` connect calls fail.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_fail_next(&mut self, n: u32) {
        self.sim.fail_next = n;
    }

    /// Drop the association as if the AP went away.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_drop_link(&mut self) {
        self.sim.associated = false;
        self.sim.pending = false;
    }

    /// Connect calls issued to the radio so far.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_attempts(&self) -> u32 {
        self.sim.attempts
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<(), LinkError> {
        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let config = Configuration::Client(ClientConfiguration {
            ssid: self.ssid.as_str().try_into().map_err(|_| LinkError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| LinkError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi.set_configuration(&config).map_err(|e| {
            error!("WiFi: set_configuration failed: {}", e);
            LinkError::ConnectionFailed
        })?;
        if !self.wifi.is_started().unwrap_or(false) {
            self.wifi.start().map_err(|e| {
                error!("WiFi: start failed: {}", e);
                LinkError::ConnectionFailed
            })?;
        }
        self.wifi.connect().map_err(|e| {
            warn!("WiFi: connect request failed: {}", e);
            LinkError::ConnectionFailed
        })
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<(), LinkError> {
        self.sim.attempts = self.sim.attempts.wrapping_add(1);
        if self.sim.fail_next > 0 {
            self.sim.fail_next -= 1;
            warn!("WiFi(sim): simulated connect failure (attempt {})", self.sim.attempts);
            return Err(LinkError::ConnectionFailed);
        }
        self.sim.pending = true;
        Ok(())
    }

    #[cfg(target_os = "espidf")]
    fn platform_disconnect(&mut self) {
        if let Err(e) = self.wifi.disconnect() {
            warn!("WiFi: disconnect failed: {}", e);
        }
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_disconnect(&mut self) {
        self.sim.associated = false;
        self.sim.pending = false;
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&mut self) -> bool {
        self.wifi.is_connected().unwrap_or(false) && self.wifi.sta_netif().is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&mut self) -> bool {
        if self.sim.pending {
            self.sim.pending = false;
            self.sim.associated = true;
        }
        self.sim.associated
    }

    #[cfg(target_os = "espidf")]
    fn platform_rssi(&self) -> Option<i8> {
        use esp_idf_svc::sys::{esp_wifi_sta_get_ap_info, wifi_ap_record_t, ESP_OK};

        let mut ap_info = wifi_ap_record_t::default();
        // SAFETY: ap_info is a valid out-pointer for the duration of the call.
        let ret = unsafe { esp_wifi_sta_get_ap_info(&mut ap_info) };
        (ret == ESP_OK as i32).then_some(ap_info.rssi)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_rssi(&self) -> Option<i8> {
        // Deterministic -55..-66 dBm wobble.
        let wobble = (self.sim.attempts % 12) as i8;
        Some(-55_i8.saturating_sub(wobble))
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// LinkPort
// ───────────────────────────────────────────────────────────────

impl LinkPort for WifiAdapter {
    fn connect(&mut self) -> Result<(), LinkError> {
        if self.ssid.is_empty() {
            return Err(LinkError::NoCredentials);
        }
        if self.state == WifiState::Connected {
            return Err(LinkError::AlreadyConnected);
        }

        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(()) => {
                self.state = WifiState::Connecting { started_ms: None };
                Ok(())
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                // Retried on the first poll.
                self.state = WifiState::Reconnecting {
                    attempt: 0,
                    retry_at_ms: 0,
                };
                Err(e)
            }
        }
    }

    fn disconnect(&mut self) {
        self.platform_disconnect();
        self.state = WifiState::Disconnected;
        self.last_rssi = None;
        info!("WiFi: disconnected");
    }

    fn is_connected(&self) -> bool {
        self.state == WifiState::Connected
    }

    fn poll(&mut self, now_ms: u64) {
        match self.state {
            WifiState::Disconnected => {}
            WifiState::Connecting { started_ms } => {
                let started_ms = started_ms.unwrap_or(now_ms);
                if self.platform_is_connected() {
                    self.state = WifiState::Connected;
                    self.backoff_ms = MIN_BACKOFF_MS;
                    self.last_rssi = self.platform_rssi();
                    debug!("WiFi: connected (RSSI={:?})", self.last_rssi);
                } else if now_ms.saturating_sub(started_ms) >= CONNECT_TIMEOUT_MS {
                    warn!("WiFi: association timed out");
                    self.platform_disconnect();
                    self.schedule_retry(0, now_ms);
                } else {
                    self.state = WifiState::Connecting {
                        started_ms: Some(started_ms),
                    };
                }
            }
            WifiState::Reconnecting { attempt, retry_at_ms } => {
                if now_ms < retry_at_ms {
                    return;
                }
                info!("WiFi: reconnect attempt {}", attempt + 1);
                match self.platform_connect() {
                    Ok(()) => {
                        self.state = WifiState::Connecting {
                            started_ms: Some(now_ms),
                        };
                    }
                    Err(_) => self.schedule_retry(attempt + 1, now_ms),
                }
            }
            WifiState::Connected => {
                if self.platform_is_connected() {
                    self.last_rssi = self.platform_rssi();
                } else {
                    debug!("WiFi: connection lost, entering reconnect");
                    self.last_rssi = None;
                    self.schedule_retry(0, now_ms);
                }
            }
        }
    }

    fn rssi(&self) -> Option<i8> {
        self.last_rssi
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

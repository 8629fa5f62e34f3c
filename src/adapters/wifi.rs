//! WiFi station-mode adapter.
//!
//! Brings the station up with the credentials from [`SystemConfig`] and
//! keeps it up: the main loop calls [`WifiAdapter::poll`] every pass and
//! a dropped link is retried on an exponential backoff (2 s → 4 s → 8 s …
//! capped at 60 s).
//!
//! Nothing here waits on the radio.  An attempt only issues the connect
//! request; later passes check whether the interface came up and give the
//! attempt up after [`CONNECT_TIMEOUT_MS`].
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `esp_idf_svc::wifi::BlockingWifi`, driven
//!   through its non-blocking `EspWifi` calls after start-up.
//! - **all other targets**: simulation for host-side tests.

use core::fmt;

use log::{info, warn};

use crate::config::SystemConfig;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 bytes)"),
            Self::InvalidPassword => {
                write!(f, "password invalid (8-64 bytes for WPA2, or empty for open)")
            }
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    /// Connect requested, waiting for the interface to come up.
    Connecting { attempt: u32, give_up_at_ms: u64 },
    Connected,
    Reconnecting { attempt: u32, retry_at_ms: u64 },
}

const INITIAL_BACKOFF_MS: u64 = 2_000;
const MAX_BACKOFF_MS: u64 = 60_000;
/// How long one attempt may take before it counts as failed.
pub const CONNECT_TIMEOUT_MS: u64 = 15_000;

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 {
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

pub struct WifiAdapter {
    state: WifiState,
    backoff_ms: u64,
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    /// Simulation: whether the access point is reachable.
    #[cfg(not(target_os = "espidf"))]
    sim_link_up: bool,
}

impl WifiAdapter {
    #[cfg(target_os = "espidf")]
    pub fn new(wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>) -> Self {
        Self {
            state: WifiState::Disconnected,
            backoff_ms: INITIAL_BACKOFF_MS,
            wifi,
        }
    }

    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            state: WifiState::Disconnected,
            backoff_ms: INITIAL_BACKOFF_MS,
            sim_link_up: true,
        }
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn is_connected(&self) -> bool {
        self.state == WifiState::Connected && self.platform_is_connected()
    }

    /// Configure the station and request a connection.  The link comes up
    /// on a later [`poll`](Self::poll); a rejected request leaves the
    /// adapter in `Reconnecting`, so `poll` keeps trying.
    pub fn connect(&mut self, cfg: &SystemConfig, now_ms: u64) -> Result<(), ConnectivityError> {
        validate_ssid(&cfg.wifi_ssid)?;
        validate_password(&cfg.wifi_password)?;
        self.platform_configure(&cfg.wifi_ssid, &cfg.wifi_password)?;

        info!("WiFi: connecting to '{}'", cfg.wifi_ssid);
        if self.begin_attempt(0, now_ms) {
            Ok(())
        } else {
            Err(ConnectivityError::ConnectionFailed)
        }
    }

    /// Drive the connection.  Never blocks.  Returns `true` on the pass the
    /// link came up.
    pub fn poll(&mut self, now_ms: u64) -> bool {
        match self.state {
            WifiState::Connected if !self.platform_is_connected() => {
                warn!("WiFi: connection lost, entering reconnect");
                self.backoff_ms = INITIAL_BACKOFF_MS;
                self.schedule_retry(0, now_ms);
                false
            }
            WifiState::Connecting { .. } if self.platform_is_connected() => {
                self.on_up();
                true
            }
            WifiState::Connecting {
                attempt,
                give_up_at_ms,
            } if now_ms >= give_up_at_ms => {
                warn!("WiFi: attempt {} timed out", attempt + 1);
                self.back_off(attempt, now_ms);
                false
            }
            WifiState::Reconnecting {
                attempt,
                retry_at_ms,
            } if now_ms >= retry_at_ms => {
                info!("WiFi: reconnect attempt {} (backoff {} ms)", attempt + 1, self.backoff_ms);
                self.begin_attempt(attempt, now_ms);
                false
            }
            _ => false,
        }
    }

    /// Issue a connect request and start the attempt's timeout.  A rejected
    /// request is logged and backed off; returns whether it went out.
    fn begin_attempt(&mut self, attempt: u32, now_ms: u64) -> bool {
        match self.platform_begin_connect() {
            Ok(()) => {
                self.state = WifiState::Connecting {
                    attempt,
                    give_up_at_ms: now_ms + CONNECT_TIMEOUT_MS,
                };
                true
            }
            Err(e) => {
                warn!("WiFi: connect request rejected: {}", e);
                self.back_off(attempt, now_ms);
                false
            }
        }
    }

    fn back_off(&mut self, attempt: u32, now_ms: u64) {
        self.backoff_ms = (self.backoff_ms * 2).min(MAX_BACKOFF_MS);
        self.schedule_retry(attempt + 1, now_ms);
    }

    fn on_up(&mut self) {
        self.state = WifiState::Connected;
        self.backoff_ms = INITIAL_BACKOFF_MS;
        info!("WiFi: connected");
    }

    fn schedule_retry(&mut self, attempt: u32, now_ms: u64) {
        self.state = WifiState::Reconnecting {
            attempt,
            retry_at_ms: now_ms + self.backoff_ms,
        };
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_configure(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPAWPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: ssid.try_into().map_err(|_| ConnectivityError::InvalidSsid)?,
            password: password
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });
        self.wifi
            .set_configuration(&conf)
            .and_then(|()| self.wifi.start())
            .map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_configure(&mut self, _ssid: &str, _password: &str) -> Result<(), ConnectivityError> {
        Ok(())
    }

    /// `esp_wifi_connect` only; association and DHCP finish in the
    /// background.
    #[cfg(target_os = "espidf")]
    fn platform_begin_connect(&mut self) -> Result<(), ConnectivityError> {
        let wifi = self.wifi.wifi_mut();
        let _ = wifi.disconnect();
        wifi.connect().map_err(|_| ConnectivityError::ConnectionFailed)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_begin_connect(&mut self) -> Result<(), ConnectivityError> {
        Ok(())
    }

    /// Associated and holding an IP address.
    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_up().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        self.sim_link_up
    }

    /// Simulation: drop or restore the access point.
    #[cfg(not(target_os = "espidf"))]
    pub fn sim_set_link(&mut self, up: bool) {
        self.sim_link_up = up;
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiAdapter {
    fn default() -> Self {
        Self::new()
    }
}

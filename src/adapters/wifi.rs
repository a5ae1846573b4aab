//! WiFi station-mode adapter.
//!
//! Joins the access point named in `config.json` and keeps the link up.
//! Provisioning (captive portal, BLE) is not handled here: without stored
//! credentials the station stays down and the gateway runs offline.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `BlockingWifi<EspWifi>` from `esp_idf_svc`.
//! - **all other targets**: the host network is used as-is; `connect`
//!   validates credentials and reports the host address.
//!
//! ## Reconnection policy
//!
//! On link loss the adapter retries with exponential backoff (2 s → 4 s →
//! 8 s … capped at 60 s), one attempt per [`WifiStation::poll`] deadline.

use core::fmt;
use core::net::Ipv4Addr;
use log::{error, info, warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectivityError {
    NoCredentials,
    InvalidSsid,
    InvalidPassword,
    ConnectionFailed,
}

impl fmt::Display for ConnectivityError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoCredentials => write!(f, "no WiFi credentials configured"),
            Self::InvalidSsid => write!(f, "SSID invalid (must be 1-32 printable ASCII bytes)"),
            Self::InvalidPassword => write!(
                f,
                "password invalid (must be 8-64 bytes for WPA2, or empty for open)"
            ),
            Self::ConnectionFailed => write!(f, "WiFi connection failed"),
        }
    }
}

impl std::error::Error for ConnectivityError {}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WifiState {
    Disconnected,
    Connected,
    Reconnecting { attempt: u32, next_retry_ms: u64 },
}

const INITIAL_BACKOFF_MS: u64 = 2_000;
const MAX_BACKOFF_MS: u64 = 60_000;

// ───────────────────────────────────────────────────────────────
// Validation
// ───────────────────────────────────────────────────────────────

fn is_printable_ascii(s: &str) -> bool {
    s.bytes().all(|b| (0x20..=0x7E).contains(&b))
}

fn validate_ssid(ssid: &str) -> Result<(), ConnectivityError> {
    if ssid.is_empty() || ssid.len() > 32 || !is_printable_ascii(ssid) {
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

/// Backoff before retry number `attempt` (0-based).
fn backoff_ms(attempt: u32) -> u64 {
    INITIAL_BACKOFF_MS
        .saturating_mul(1u64 << attempt.min(16))
        .min(MAX_BACKOFF_MS)
}

// ───────────────────────────────────────────────────────────────
// Station
// ───────────────────────────────────────────────────────────────

pub struct WifiStation {
    #[cfg(target_os = "espidf")]
    wifi: esp_idf_svc::wifi::BlockingWifi<esp_idf_svc::wifi::EspWifi<'static>>,
    ssid: heapless::String<32>,
    password: heapless::String<64>,
    state: WifiState,
    ip: Option<Ipv4Addr>,
}

impl WifiStation {
    #[cfg(not(target_os = "espidf"))]
    pub fn new() -> Self {
        Self {
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            state: WifiState::Disconnected,
            ip: None,
        }
    }

    #[cfg(target_os = "espidf")]
    pub fn new(
        modem: esp_idf_svc::hal::modem::Modem,
        sysloop: esp_idf_svc::eventloop::EspSystemEventLoop,
        nvs: Option<esp_idf_svc::nvs::EspDefaultNvsPartition>,
    ) -> Result<Self, esp_idf_svc::sys::EspError> {
        use esp_idf_svc::wifi::{BlockingWifi, EspWifi};

        let wifi = BlockingWifi::wrap(EspWifi::new(modem, sysloop.clone(), nvs)?, sysloop)?;
        Ok(Self {
            wifi,
            ssid: heapless::String::new(),
            password: heapless::String::new(),
            state: WifiState::Disconnected,
            ip: None,
        })
    }

    pub fn state(&self) -> WifiState {
        self.state
    }

    pub fn ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }

    pub fn set_credentials(&mut self, ssid: &str, password: &str) -> Result<(), ConnectivityError> {
        validate_ssid(ssid)?;
        validate_password(password)?;
        self.ssid.clear();
        self.ssid
            .push_str(ssid)
            .map_err(|_| ConnectivityError::InvalidSsid)?;
        self.password.clear();
        self.password
            .push_str(password)
            .map_err(|_| ConnectivityError::InvalidPassword)?;
        info!("WiFi: credentials set (SSID='{}')", self.ssid);
        Ok(())
    }

    /// Join the access point once.  On failure the station enters backoff.
    pub fn connect(&mut self, now_ms: u64) -> Result<Ipv4Addr, ConnectivityError> {
        if self.ssid.is_empty() {
            return Err(ConnectivityError::NoCredentials);
        }
        info!("WiFi: connecting to '{}'", self.ssid);
        match self.platform_connect() {
            Ok(ip) => {
                self.state = WifiState::Connected;
                self.ip = Some(ip);
                info!("WiFi: connected, ip {}", ip);
                Ok(ip)
            }
            Err(e) => {
                error!("WiFi: connection failed: {}", e);
                self.ip = None;
                self.state = WifiState::Reconnecting {
                    attempt: 0,
                    next_retry_ms: now_ms + backoff_ms(0),
                };
                Err(e)
            }
        }
    }

    /// Watch the link; reconnect on its deadline.  Returns the current IP.
    pub fn poll(&mut self, now_ms: u64) -> Option<Ipv4Addr> {
        match self.state {
            WifiState::Connected if !self.platform_is_connected() => {
                warn!("WiFi: connection lost, entering reconnect");
                self.ip = None;
                self.state = WifiState::Reconnecting {
                    attempt: 0,
                    next_retry_ms: now_ms + backoff_ms(0),
                };
            }
            WifiState::Reconnecting {
                attempt,
                next_retry_ms,
            } if now_ms >= next_retry_ms => match self.platform_connect() {
                Ok(ip) => {
                    info!("WiFi: reconnected, ip {}", ip);
                    self.ip = Some(ip);
                    self.state = WifiState::Connected;
                }
                Err(_) => {
                    let attempt = attempt.saturating_add(1);
                    info!("WiFi: reconnect attempt {} failed", attempt);
                    self.state = WifiState::Reconnecting {
                        attempt,
                        next_retry_ms: now_ms + backoff_ms(attempt),
                    };
                }
            },
            _ => {}
        }
        self.ip
    }

    // ── Platform-specific ─────────────────────────────────────

    #[cfg(target_os = "espidf")]
    fn platform_connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        use esp_idf_svc::wifi::{AuthMethod, ClientConfiguration, Configuration};

        let auth_method = if self.password.is_empty() {
            AuthMethod::None
        } else {
            AuthMethod::WPA2Personal
        };
        let conf = Configuration::Client(ClientConfiguration {
            ssid: self
                .ssid
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidSsid)?,
            password: self
                .password
                .as_str()
                .try_into()
                .map_err(|_| ConnectivityError::InvalidPassword)?,
            auth_method,
            ..Default::default()
        });

        let fail = |e: esp_idf_svc::sys::EspError| {
            warn!("WiFi: {}", e);
            ConnectivityError::ConnectionFailed
        };
        self.wifi.set_configuration(&conf).map_err(fail)?;
        if !self.wifi.is_started().map_err(fail)? {
            self.wifi.start().map_err(fail)?;
        }
        self.wifi.connect().map_err(fail)?;
        self.wifi.wait_netif_up().map_err(fail)?;
        let info = self.wifi.wifi().sta_netif().get_ip_info().map_err(fail)?;
        Ok(info.ip)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_connect(&mut self) -> Result<Ipv4Addr, ConnectivityError> {
        use crate::app::ports::SystemPort;

        Ok(crate::adapters::system::SystemInfo::new()
            .local_ip()
            .unwrap_or(Ipv4Addr::LOCALHOST))
    }

    #[cfg(target_os = "espidf")]
    fn platform_is_connected(&self) -> bool {
        self.wifi.is_connected().unwrap_or(false)
    }

    #[cfg(not(target_os = "espidf"))]
    fn platform_is_connected(&self) -> bool {
        true
    }
}

#[cfg(not(target_os = "espidf"))]
impl Default for WifiStation {
    fn default() -> Self {
        Self::new()
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

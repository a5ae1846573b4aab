//! Gateway configuration and compile-time constants.
//!
//! Two persisted records:
//!
//! | Record            | Backend              | Format     | Contents                       |
//! |-------------------|----------------------|------------|--------------------------------|
//! | [`GatewayConfig`] | flash fs `config.json` | JSON     | WiFi and broker credentials, topic prefix, autosend interval |
//! | [`DeviceSettings`]| NVS blob             | postcard   | autosend flag                  |
//!
//! `config.json` is removed by the `wipe` command; slot records and NVS
//! settings survive it.

use log::{info, warn};
use serde::{Deserialize, Serialize};

use crate::app::ports::{ConfigError, FilePort, StorageError};

// ---------------------------------------------------------------------------
// Slot store geometry
// ---------------------------------------------------------------------------

/// Number of addressable slots; valid IDs are `1..=SLOTS_NUMBER`.
pub const SLOTS_NUMBER: u32 = 20;
/// Maximum mark/space ticks in one slot.
pub const SLOT_SIZE: usize = 300;
/// Ticks plus the trailing carrier frequency element.
pub const WAVE_CAPACITY: usize = SLOT_SIZE + 1;
/// Maximum slot IDs in one `sendStoredRawSequence` payload.
pub const SEQ_SIZE: usize = 10;
/// Slot records above this many bytes are reported as oversized on load.
pub const MAX_RECORD_BYTES: u64 = 2500;
/// Slots mirrored in memory for the button and autosend.
pub const DEFAULT_SLOTS: (u32, u32) = (1, 2);

// ---------------------------------------------------------------------------
// IR transmitter
// ---------------------------------------------------------------------------

/// Carrier used when a stored frame carries frequency 0.
pub const TRANSMITTER_FREQ_KHZ: u32 = 38;

// ---------------------------------------------------------------------------
// Timing
// ---------------------------------------------------------------------------

pub const BUTTON_DEBOUNCE_MS: u64 = 50;
/// Delay between the first and second code of an autosend cycle.
pub const SECOND_CODE_DELAY_MS: u64 = 3_000;
pub const DEFAULT_AUTOSEND_INTERVAL_MS: u64 = 300_000;

/// Connection attempts per cycle before falling back to offline mode.
pub const MAX_CONNECT_ATTEMPTS: u8 = 2;
pub const CONNECT_BACKOFF_MS: u64 = 5_000;
/// Half-period of the indicator blink during connect backoff.
pub const BACKOFF_BLINK_MS: u64 = 500;
pub const OFFLINE_RETRY_MS: u64 = 60_000;
/// Wait after a dropped connection before reconnecting.
pub const RECONNECT_DELAY_MS: u64 = 2_000;

// ---------------------------------------------------------------------------
// Identity and topics
// ---------------------------------------------------------------------------

pub const DEVICE_TYPE: &str = "IR server";
pub const FIRMWARE_VERSION: &str = env!("CARGO_PKG_VERSION");
pub const CONFIG_PATH: &str = "config.json";

pub const TOPIC_STATUS: &str = "/status";
pub const TOPIC_SENDER: &str = "/sender/";
pub const TOPIC_SUBSCRIBE: &str = "/sender/#";
pub const TOPIC_CMD_RESULT: &str = "/sender/cmd/result";
pub const TOPIC_RAW_MODE_VAL: &str = "/sender/rawMode/val";
pub const TOPIC_AUTOSEND_VAL: &str = "/sender/autoSendMode/val";
pub const TOPIC_INFO_CLIENT: &str = "/info/client";
pub const TOPIC_INFO_IP: &str = "/info/ip";
pub const TOPIC_INFO_TYPE: &str = "/info/type";
pub const TOPIC_INFO_VERSION: &str = "/info/version";
pub const TOPIC_RECEIVER: &str = "/receiver/";

// ---------------------------------------------------------------------------
// Gateway config (config.json)
// ---------------------------------------------------------------------------

/// Broker connection and behaviour settings.
///
/// Every field has a default, so a partial `config.json` still loads.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GatewayConfig {
    /// Station credentials; unused by the host simulator.
    pub wifi_ssid: String,
    pub wifi_pass: String,
    pub mqtt_server: String,
    pub mqtt_port: u16,
    pub mqtt_user: String,
    pub mqtt_pass: String,
    /// Topic root; every topic is `<prefix><suffix>`.
    pub mqtt_prefix: String,
    pub autosend_interval_ms: u64,
    /// Trigger button level when pressed.  Debug boards pull down, production
    /// boards pull up.
    pub button_active_high: bool,
}

impl Default for GatewayConfig {
    fn default() -> Self {
        Self {
            wifi_ssid: String::new(),
            wifi_pass: String::new(),
            mqtt_server: String::from("localhost"),
            mqtt_port: 1883,
            mqtt_user: String::new(),
            mqtt_pass: String::new(),
            mqtt_prefix: String::from("irgw"),
            autosend_interval_ms: DEFAULT_AUTOSEND_INTERVAL_MS,
            button_active_high: false,
        }
    }
}

impl GatewayConfig {
    /// `<prefix><suffix>`
    pub fn topic(&self, suffix: &str) -> String {
        let mut t = String::with_capacity(self.mqtt_prefix.len() + suffix.len());
        t.push_str(&self.mqtt_prefix);
        t.push_str(suffix);
        t
    }
}

/// Range-check every field before it is persisted or used.
pub fn validate_config(cfg: &GatewayConfig) -> Result<(), ConfigError> {
    if cfg.mqtt_server.trim().is_empty() {
        return Err(ConfigError::ValidationFailed("mqtt_server must not be empty"));
    }
    if cfg.mqtt_port == 0 {
        return Err(ConfigError::ValidationFailed("mqtt_port must be 1–65535"));
    }
    if cfg.mqtt_prefix.is_empty() {
        return Err(ConfigError::ValidationFailed("mqtt_prefix must not be empty"));
    }
    if cfg.mqtt_prefix.contains(['#', '+']) {
        return Err(ConfigError::ValidationFailed(
            "mqtt_prefix must not contain MQTT wildcards",
        ));
    }
    if cfg.mqtt_prefix.ends_with('/') {
        return Err(ConfigError::ValidationFailed(
            "mqtt_prefix must not end with '/'",
        ));
    }
    if cfg.autosend_interval_ms <= SECOND_CODE_DELAY_MS {
        return Err(ConfigError::ValidationFailed(
            "autosend_interval_ms must exceed the second-code delay",
        ));
    }
    Ok(())
}

/// Load `config.json`.
///
/// Returns `ConfigError::NotFound` on first boot and `Corrupted` when the
/// file does not parse or fails validation.
pub fn load_config(fs: &impl FilePort) -> Result<GatewayConfig, ConfigError> {
    let bytes = match fs.read(CONFIG_PATH) {
        Ok(b) => b,
        Err(StorageError::NotFound) => return Err(ConfigError::NotFound),
        Err(_) => return Err(ConfigError::IoError),
    };
    let cfg: GatewayConfig = serde_json::from_slice(&bytes).map_err(|e| {
        warn!("Config: {} does not parse: {}", CONFIG_PATH, e);
        ConfigError::Corrupted
    })?;
    validate_config(&cfg).map_err(|e| {
        warn!("Config: stored config rejected: {}", e);
        ConfigError::Corrupted
    })?;
    info!("Config: loaded {} ({} bytes)", CONFIG_PATH, bytes.len());
    Ok(cfg)
}

/// Validate and write `config.json`.
pub fn save_config(fs: &mut impl FilePort, cfg: &GatewayConfig) -> Result<(), ConfigError> {
    validate_config(cfg)?;
    let bytes = serde_json::to_vec_pretty(cfg).map_err(|_| ConfigError::IoError)?;
    fs.write(CONFIG_PATH, &bytes).map_err(|_| ConfigError::IoError)?;
    info!("Config: saved {} ({} bytes)", CONFIG_PATH, bytes.len());
    Ok(())
}

/// Boot-time config: the stored file, or defaults.
///
/// A missing file is recreated from defaults so the next boot finds it; a
/// corrupted one is left in place for inspection.
pub fn load_or_init(fs: &mut impl FilePort) -> GatewayConfig {
    match load_config(fs) {
        Ok(cfg) => cfg,
        Err(ConfigError::NotFound) => {
            info!("Config: no {}, writing defaults", CONFIG_PATH);
            let cfg = GatewayConfig::default();
            if let Err(e) = save_config(fs, &cfg) {
                warn!("Config: defaults not persisted: {}", e);
            }
            cfg
        }
        Err(e) => {
            warn!("Config: {}, using defaults", e);
            GatewayConfig::default()
        }
    }
}

/// Remove `config.json`.  Slot records are left untouched.
pub fn wipe_config(fs: &mut impl FilePort) -> Result<(), ConfigError> {
    fs.remove(CONFIG_PATH).map_err(|_| ConfigError::IoError)?;
    info!("Config: {} wiped", CONFIG_PATH);
    Ok(())
}

// ---------------------------------------------------------------------------
// Device settings (NVS)
// ---------------------------------------------------------------------------

/// Runtime flags that survive reboot and config wipe.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceSettings {
    pub auto_send: bool,
}

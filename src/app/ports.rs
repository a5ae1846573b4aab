//! Port traits: the hexagonal boundary between gateway logic and the outside world.
//!
//! ```text
//!   Adapter ──▶ Port trait ──▶ GatewayService (domain)
//! ```
//!
//! Driven adapters (flash filesystem, NVS, IR transceiver, MQTT client,
//! chip info) implement these traits.  The dispatcher, scheduler and
//! session manager consume them via generics, so the domain core never
//! touches hardware or sockets directly.
//!
//! All port errors are typed; callers must handle every variant explicitly.

use core::fmt;
use core::net::Ipv4Addr;

use crate::config::DeviceSettings;

// ───────────────────────────────────────────────────────────────
// File port (driven adapter: domain ↔ SPIFFS / directory)
// ───────────────────────────────────────────────────────────────

/// One entry returned by [`FilePort::list`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    /// Path relative to the filesystem root, `/`-separated (e.g. `ir/3.dat`).
    pub path: String,
    pub size: u64,
}

/// Capacity figures reported by the filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StorageUsage {
    pub total_bytes: u64,
    pub used_bytes: u64,
}

/// Flat file storage holding slot records and `config.json`.
///
/// Paths are relative and `/`-separated.  `write` replaces any previous
/// content of the file in full.
pub trait FilePort {
    /// Read a whole file.
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError>;

    /// Create or truncate `path` and write `data`.
    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError>;

    /// Remove a file.  Returns `Ok(())` even if it didn't exist.
    fn remove(&mut self, path: &str) -> Result<(), StorageError>;

    /// Check whether a file exists without reading it.
    fn exists(&self, path: &str) -> bool;

    /// Every stored file with its size, in path order.
    fn list(&self) -> Result<Vec<FileEntry>, StorageError>;

    /// Total and used bytes of the backing partition.
    fn usage(&self) -> Result<StorageUsage, StorageError>;
}

// ───────────────────────────────────────────────────────────────
// Settings port (driven adapter: domain ↔ NVS)
// ───────────────────────────────────────────────────────────────

/// Persists the small runtime settings record (autosend flag).
///
/// Every call to [`save`](SettingsPort::save) must reach non-volatile
/// storage before returning; the dispatcher relies on write-through.
pub trait SettingsPort {
    /// Load settings.  Returns [`DeviceSettings::default()`] when nothing is stored.
    fn load(&self) -> Result<DeviceSettings, ConfigError>;

    /// Persist settings immediately.
    fn save(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError>;
}

// ───────────────────────────────────────────────────────────────
// IR port (driven adapter: domain ↔ IR LED / demodulator)
// ───────────────────────────────────────────────────────────────

/// Protocols the transmitter can encode on request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrProtocol {
    Nec,
    Rc5,
    Rc6,
    Lg,
    Sony,
    Samsung,
}

impl IrProtocol {
    /// Map a topic `kind` segment (`NEC`, `RC5`, …) to a protocol.
    pub fn from_kind(kind: &str) -> Option<Self> {
        match kind {
            "NEC" => Some(Self::Nec),
            "RC5" => Some(Self::Rc5),
            "RC6" => Some(Self::Rc6),
            "LG" => Some(Self::Lg),
            "SONY" => Some(Self::Sony),
            "SAMSUNG" => Some(Self::Samsung),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Nec => "NEC",
            Self::Rc5 => "RC5",
            Self::Rc6 => "RC6",
            Self::Lg => "LG",
            Self::Sony => "SONY",
            Self::Samsung => "SAMSUNG",
        }
    }
}

/// Protocol reported by the receiver's decoder.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReceivedProtocol {
    Unknown,
    Nec,
    Sony,
    Rc5,
    Rc6,
    Dish,
    Sharp,
    Jvc,
    Sanyo,
    Mitsubishi,
    Samsung,
    Lg,
    Whynter,
    Panasonic,
}

impl ReceivedProtocol {
    /// Topic segment used on `<prefix>/receiver/<protocol>/...`.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Unknown => "UNKNOWN",
            Self::Nec => "NEC",
            Self::Sony => "SONY",
            Self::Rc5 => "RC5",
            Self::Rc6 => "RC6",
            Self::Dish => "DISH",
            Self::Sharp => "SHARP",
            Self::Jvc => "JVC",
            Self::Sanyo => "SANYO",
            Self::Mitsubishi => "MITSUBISHI",
            Self::Samsung => "SAMSUNG",
            Self::Lg => "LG",
            Self::Whynter => "WHYNTER",
            Self::Panasonic => "PANASONIC",
        }
    }
}

/// A capture from the IR demodulator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceivedIr {
    /// The decoder recognised the frame.
    Decoded {
        protocol: ReceivedProtocol,
        bits: u16,
        value: u64,
        /// Only Panasonic frames carry an address.
        address: Option<u32>,
    },
    /// Undecodable capture: mark/space durations in microseconds.
    Raw { durations_us: Vec<u32> },
}

/// Transmit/receive capability of the IR peripheral.
///
/// Calls are synchronous: they return once the waveform has been emitted.
pub trait IrPort {
    /// Emit raw mark/space ticks on a carrier of `khz` kilohertz.
    fn send_raw(&mut self, ticks: &[u32], khz: u32) -> Result<(), IrError>;

    /// Emit a Global Caché sequence, forwarded opaquely.
    fn send_gc(&mut self, sequence: &[u32]) -> Result<(), IrError>;

    /// Emit `value` using the peripheral's encoder for `protocol`.
    fn send_encoded(&mut self, protocol: IrProtocol, value: u64, bits: u32) -> Result<(), IrError>;

    /// Take the next pending capture, if any.
    fn receive(&mut self) -> Option<ReceivedIr>;
}

// ───────────────────────────────────────────────────────────────
// Publish port (domain → broker)
// ───────────────────────────────────────────────────────────────

/// Outbound publish capability handed to the dispatcher for replies.
pub trait Publisher {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), TransportError>;
}

// ───────────────────────────────────────────────────────────────
// MQTT port (driven adapter: session manager ↔ broker)
// ───────────────────────────────────────────────────────────────

/// Parameters for one connection attempt.
#[derive(Debug, Clone)]
pub struct ConnectOptions<'a> {
    pub client_id: &'a str,
    pub host: &'a str,
    pub port: u16,
    pub username: &'a str,
    pub password: &'a str,
    /// Last-will topic; the broker publishes `will_payload` there (retained)
    /// when the connection drops.
    pub will_topic: &'a str,
    pub will_payload: &'a str,
}

/// A message delivered by the broker.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InboundMessage {
    pub topic: String,
    pub payload: Vec<u8>,
}

impl InboundMessage {
    pub fn new(topic: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            topic: topic.into(),
            payload: payload.into(),
        }
    }
}

/// Low-level pub/sub client.  The session manager owns the lifecycle.
pub trait MqttPort {
    /// Attempt one connection.  Must return within a bounded time.
    fn connect(&mut self, options: &ConnectOptions<'_>) -> Result<(), TransportError>;

    fn disconnect(&mut self);

    fn is_connected(&self) -> bool;

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TransportError>;

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError>;

    /// Pump the client's event loop without blocking; returns at most one
    /// inbound message.
    fn poll(&mut self) -> Option<InboundMessage>;
}

// ───────────────────────────────────────────────────────────────
// System port (chip identity, network address)
// ───────────────────────────────────────────────────────────────

/// SPI flash access mode reported by the bootloader header.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FlashMode {
    Qio,
    Qout,
    Dio,
    Dout,
    Unknown,
}

impl FlashMode {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Qio => "QIO",
            Self::Qout => "QOUT",
            Self::Dio => "DIO",
            Self::Dout => "DOUT",
            Self::Unknown => "UNKNOWN",
        }
    }
}

/// Chip and flash identification for the `sysinfo` query.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ChipInfo {
    pub chip_id: u32,
    pub flash_id: u32,
    /// Size detected from the flash chip itself.
    pub flash_real_size: u32,
    /// Size the firmware image was built for.
    pub flash_config_size: u32,
    pub flash_mode: FlashMode,
}

pub trait SystemPort {
    fn chip_info(&self) -> ChipInfo;

    /// Station IPv4 address, `None` before the network is up.
    fn local_ip(&self) -> Option<Ipv4Addr>;
}

// ───────────────────────────────────────────────────────────────
// Error types
// ───────────────────────────────────────────────────────────────

/// Errors from [`FilePort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageError {
    /// Requested file does not exist.
    NotFound,
    /// Partition is full.
    Full,
    /// Path is empty, absolute, or escapes the root.
    InvalidPath,
    /// Generic I/O error.
    IoError,
}

/// Errors from [`SettingsPort`] and config persistence.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigError {
    /// No config found in storage (first boot).
    NotFound,
    /// Stored config failed deserialization.
    Corrupted,
    /// A config field failed range validation.
    ValidationFailed(&'static str),
    /// Generic I/O error from the storage backend.
    IoError,
}

/// Errors from [`IrPort`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IrError {
    /// Nothing to transmit.
    EmptyWaveform,
    /// The peripheral has no encoder for this protocol.
    Unsupported,
    /// The transmitter driver reported a failure.
    TransmitFailed,
}

/// Errors from [`MqttPort`] and [`Publisher`] operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportError {
    /// Publish attempted while the session is not connected.
    Unavailable,
    /// Broker refused or could not be reached.
    ConnectFailed,
    PublishFailed,
    SubscribeFailed,
}

impl fmt::Display for StorageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "file not found"),
            Self::Full => write!(f, "storage full"),
            Self::InvalidPath => write!(f, "invalid path"),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotFound => write!(f, "config not found"),
            Self::Corrupted => write!(f, "config corrupted"),
            Self::ValidationFailed(msg) => write!(f, "validation failed: {}", msg),
            Self::IoError => write!(f, "I/O error"),
        }
    }
}

impl fmt::Display for IrError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyWaveform => write!(f, "empty waveform"),
            Self::Unsupported => write!(f, "protocol not supported by transmitter"),
            Self::TransmitFailed => write!(f, "transmit failed"),
        }
    }
}

impl fmt::Display for TransportError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Unavailable => write!(f, "transport unavailable"),
            Self::ConnectFailed => write!(f, "connect failed"),
            Self::PublishFailed => write!(f, "publish failed"),
            Self::SubscribeFailed => write!(f, "subscribe failed"),
        }
    }
}

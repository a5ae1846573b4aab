//! Mock adapters for integration tests.
//!
//! Every mock records what the gateway asked of it so tests can assert on
//! the full history without a broker, flash or IR hardware.

use irtrans::app::ports::{
    ChipInfo, ConfigError, ConnectOptions, FileEntry, FilePort, FlashMode, InboundMessage,
    IrError, IrPort, IrProtocol, MqttPort, ReceivedIr, SettingsPort, StorageError, StorageUsage,
    SystemPort, TransportError,
};
use irtrans::config::DeviceSettings;
use std::collections::{BTreeMap, VecDeque};
use std::net::Ipv4Addr;

// ── MemFs ─────────────────────────────────────────────────────

#[derive(Default)]
pub struct MemFs {
    pub files: BTreeMap<String, Vec<u8>>,
    pub capacity: u64,
}

#[allow(dead_code)]
impl MemFs {
    pub fn new() -> Self {
        Self {
            files: BTreeMap::new(),
            capacity: 1024 * 1024,
        }
    }

    pub fn with_file(mut self, path: &str, data: &[u8]) -> Self {
        self.files.insert(path.to_string(), data.to_vec());
        self
    }

    pub fn text(&self, path: &str) -> Option<String> {
        self.files
            .get(path)
            .map(|b| String::from_utf8_lossy(b).into_owned())
    }
}

impl FilePort for MemFs {
    fn read(&self, path: &str) -> Result<Vec<u8>, StorageError> {
        self.files.get(path).cloned().ok_or(StorageError::NotFound)
    }

    fn write(&mut self, path: &str, data: &[u8]) -> Result<(), StorageError> {
        self.files.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn remove(&mut self, path: &str) -> Result<(), StorageError> {
        self.files.remove(path);
        Ok(())
    }

    fn exists(&self, path: &str) -> bool {
        self.files.contains_key(path)
    }

    fn list(&self) -> Result<Vec<FileEntry>, StorageError> {
        Ok(self
            .files
            .iter()
            .map(|(p, d)| FileEntry {
                path: p.clone(),
                size: d.len() as u64,
            })
            .collect())
    }

    fn usage(&self) -> Result<StorageUsage, StorageError> {
        Ok(StorageUsage {
            total_bytes: self.capacity,
            used_bytes: self.files.values().map(|d| d.len() as u64).sum(),
        })
    }
}

// ── MockIr ────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IrCall {
    Raw { ticks: Vec<u32>, khz: u32 },
    Gc(Vec<u32>),
    Encoded { protocol: IrProtocol, value: u64, bits: u32 },
}

#[derive(Default)]
pub struct MockIr {
    pub calls: Vec<IrCall>,
    pub captures: VecDeque<ReceivedIr>,
}

#[allow(dead_code)]
impl MockIr {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn raw_sends(&self) -> Vec<(Vec<u32>, u32)> {
        self.calls
            .iter()
            .filter_map(|c| match c {
                IrCall::Raw { ticks, khz } => Some((ticks.clone(), *khz)),
                _ => None,
            })
            .collect()
    }
}

impl IrPort for MockIr {
    fn send_raw(&mut self, ticks: &[u32], khz: u32) -> Result<(), IrError> {
        if ticks.is_empty() {
            return Err(IrError::EmptyWaveform);
        }
        self.calls.push(IrCall::Raw {
            ticks: ticks.to_vec(),
            khz,
        });
        Ok(())
    }

    fn send_gc(&mut self, sequence: &[u32]) -> Result<(), IrError> {
        self.calls.push(IrCall::Gc(sequence.to_vec()));
        Ok(())
    }

    fn send_encoded(&mut self, protocol: IrProtocol, value: u64, bits: u32) -> Result<(), IrError> {
        self.calls.push(IrCall::Encoded {
            protocol,
            value,
            bits,
        });
        Ok(())
    }

    fn receive(&mut self) -> Option<ReceivedIr> {
        self.captures.pop_front()
    }
}

// ── MockMqtt ──────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Published {
    pub topic: String,
    pub payload: String,
    pub retain: bool,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConnectRecord {
    pub client_id: String,
    pub host: String,
    pub port: u16,
    pub username: String,
    pub will_topic: String,
    pub will_payload: String,
}

/// Broker stand-in.  Connects succeed unless `fail_connects` says otherwise.
#[derive(Default)]
pub struct MockMqtt {
    pub connected: bool,
    /// Remaining connect attempts that fail.
    pub fail_connects: u32,
    pub fail_subscribe: bool,
    pub connects: Vec<ConnectRecord>,
    pub subscriptions: Vec<String>,
    pub published: Vec<Published>,
    pub inbox: VecDeque<InboundMessage>,
    pub disconnects: u32,
}

#[allow(dead_code)]
impl MockMqtt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn failing(n: u32) -> Self {
        Self {
            fail_connects: n,
            ..Self::default()
        }
    }

    pub fn deliver(&mut self, topic: &str, payload: &str) {
        self.inbox
            .push_back(InboundMessage::new(topic, payload.as_bytes()));
    }

    pub fn published_on(&self, topic: &str) -> Vec<&Published> {
        self.published.iter().filter(|p| p.topic == topic).collect()
    }

    pub fn last_on(&self, topic: &str) -> Option<&str> {
        self.published
            .iter()
            .rev()
            .find(|p| p.topic == topic)
            .map(|p| p.payload.as_str())
    }

    /// Simulate the broker dropping the link.
    pub fn drop_link(&mut self) {
        self.connected = false;
    }
}

impl MqttPort for MockMqtt {
    fn connect(&mut self, o: &ConnectOptions<'_>) -> Result<(), TransportError> {
        self.connects.push(ConnectRecord {
            client_id: o.client_id.to_string(),
            host: o.host.to_string(),
            port: o.port,
            username: o.username.to_string(),
            will_topic: o.will_topic.to_string(),
            will_payload: o.will_payload.to_string(),
        });
        if self.fail_connects > 0 {
            self.fail_connects -= 1;
            return Err(TransportError::ConnectFailed);
        }
        self.connected = true;
        Ok(())
    }

    fn disconnect(&mut self) {
        self.connected = false;
        self.disconnects += 1;
    }

    fn is_connected(&self) -> bool {
        self.connected
    }

    fn publish(&mut self, topic: &str, payload: &[u8], retain: bool) -> Result<(), TransportError> {
        if !self.connected {
            return Err(TransportError::Unavailable);
        }
        self.published.push(Published {
            topic: topic.to_string(),
            payload: String::from_utf8_lossy(payload).into_owned(),
            retain,
        });
        Ok(())
    }

    fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
        if self.fail_subscribe {
            return Err(TransportError::SubscribeFailed);
        }
        self.subscriptions.push(topic.to_string());
        Ok(())
    }

    fn poll(&mut self) -> Option<InboundMessage> {
        if !self.connected {
            return None;
        }
        self.inbox.pop_front()
    }
}

// ── MockSettings ──────────────────────────────────────────────

#[derive(Default)]
pub struct MockSettings {
    pub stored: Option<DeviceSettings>,
    pub saves: u32,
    pub fail_load: bool,
}

impl SettingsPort for MockSettings {
    fn load(&self) -> Result<DeviceSettings, ConfigError> {
        if self.fail_load {
            return Err(ConfigError::Corrupted);
        }
        Ok(self.stored.unwrap_or_default())
    }

    fn save(&mut self, settings: &DeviceSettings) -> Result<(), ConfigError> {
        self.stored = Some(*settings);
        self.saves += 1;
        Ok(())
    }
}

// ── MockSys ───────────────────────────────────────────────────

pub struct MockSys {
    pub chip: ChipInfo,
    pub ip: Option<Ipv4Addr>,
}

impl Default for MockSys {
    fn default() -> Self {
        Self {
            chip: ChipInfo {
                chip_id: 0x00AB_CDEF,
                flash_id: 0x0016_40EF,
                flash_real_size: 4_194_304,
                flash_config_size: 4_194_304,
                flash_mode: FlashMode::Dio,
            },
            ip: Some(Ipv4Addr::new(192, 168, 1, 50)),
        }
    }
}

impl SystemPort for MockSys {
    fn chip_info(&self) -> ChipInfo {
        self.chip
    }

    fn local_ip(&self) -> Option<Ipv4Addr> {
        self.ip
    }
}

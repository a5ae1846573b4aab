//! Broker session lifecycle.
//!
//! Owns the [`MqttPort`] and decides when to connect, when to back off and
//! when to give up and run offline.  Nothing here blocks: every wait is a
//! deadline checked on the next [`SessionManager::poll`].
//!
//! ```text
//!                 ┌──────────────┐
//!                 │ Disconnected │
//!                 └──────┬───────┘
//!                        ▼
//!   ┌──── fail #1 ──┌────────────┐── ok ──▶┌───────────┐
//!   │  (5 s backoff)│ Connecting │         │ Connected │
//!   └──────────────▶└─────┬──────┘◀─ 2 s ──└───────────┘
//!                         │ fail #2        lost     ▲
//!                         ▼                         │ ok
//!                 ┌─────────────────┐               │
//!                 │ DegradedOffline │───────────────┘
//!                 └─────────────────┘  one attempt / 60 s
//! ```
//!
//! Only `Connected` delivers inbound messages or accepts publishes.

use core::net::Ipv4Addr;
use log::{debug, error, info, warn};

use crate::app::ports::{
    ConnectOptions, InboundMessage, MqttPort, Publisher, SystemPort, TransportError,
};
use crate::config::{
    GatewayConfig, BACKOFF_BLINK_MS, CONNECT_BACKOFF_MS, DEVICE_TYPE, FIRMWARE_VERSION,
    MAX_CONNECT_ATTEMPTS, OFFLINE_RETRY_MS, RECONNECT_DELAY_MS, TOPIC_INFO_CLIENT,
    TOPIC_INFO_IP, TOPIC_INFO_TYPE, TOPIC_INFO_VERSION, TOPIC_STATUS, TOPIC_SUBSCRIBE,
};

// ───────────────────────────────────────────────────────────────
// Connection state
// ───────────────────────────────────────────────────────────────

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    Disconnected,
    /// Waiting for `next_attempt_ms`; `failures` counts this cycle's misses.
    Connecting { failures: u8, next_attempt_ms: u64 },
    Connected,
    /// Broker unreachable; local functions keep running.
    DegradedOffline { next_retry_ms: u64 },
}

// ───────────────────────────────────────────────────────────────
// Session manager
// ───────────────────────────────────────────────────────────────

pub struct SessionManager<M: MqttPort> {
    mqtt: M,
    state: SessionState,
    config: GatewayConfig,
    client_id: String,
    /// Total connection attempts since boot.
    attempts: u32,
}

impl<M: MqttPort> SessionManager<M> {
    pub fn new(mqtt: M, config: GatewayConfig, client_id: impl Into<String>) -> Self {
        Self {
            mqtt,
            state: SessionState::Disconnected,
            config,
            client_id: client_id.into(),
            attempts: 0,
        }
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn is_online(&self) -> bool {
        self.state == SessionState::Connected
    }

    pub fn client_id(&self) -> &str {
        &self.client_id
    }

    pub fn attempts(&self) -> u32 {
        self.attempts
    }

    pub fn transport(&self) -> &M {
        &self.mqtt
    }

    pub fn transport_mut(&mut self) -> &mut M {
        &mut self.mqtt
    }

    /// Indicator level while a retry is pending (`Some`), `None` otherwise.
    pub fn backoff_blink(&self, now_ms: u64) -> Option<bool> {
        match self.state {
            SessionState::Connecting { failures, .. } if failures > 0 => {
                Some((now_ms / BACKOFF_BLINK_MS) % 2 == 0)
            }
            _ => None,
        }
    }

    /// Advance the lifecycle and pump the transport.
    ///
    /// Returns at most one inbound message, only while connected.
    pub fn poll(&mut self, now_ms: u64, sys: &impl SystemPort) -> Option<InboundMessage> {
        match self.state {
            SessionState::Disconnected => {
                self.state = SessionState::Connecting {
                    failures: 0,
                    next_attempt_ms: now_ms,
                };
                self.poll_connecting(now_ms, sys);
                None
            }
            SessionState::Connecting { .. } => {
                self.poll_connecting(now_ms, sys);
                None
            }
            SessionState::DegradedOffline { next_retry_ms } => {
                if now_ms >= next_retry_ms {
                    info!("Session: offline retry");
                    if self.attempt(sys).is_err() {
                        self.state = SessionState::DegradedOffline {
                            next_retry_ms: now_ms + OFFLINE_RETRY_MS,
                        };
                    }
                }
                None
            }
            SessionState::Connected => {
                if !self.mqtt.is_connected() {
                    warn!(
                        "Session: connection lost, reconnecting in {} ms",
                        RECONNECT_DELAY_MS
                    );
                    self.state = SessionState::Connecting {
                        failures: 0,
                        next_attempt_ms: now_ms + RECONNECT_DELAY_MS,
                    };
                    return None;
                }
                self.mqtt.poll()
            }
        }
    }

    fn poll_connecting(&mut self, now_ms: u64, sys: &impl SystemPort) {
        let SessionState::Connecting {
            failures,
            next_attempt_ms,
        } = self.state
        else {
            return;
        };
        if now_ms < next_attempt_ms {
            return;
        }
        if self.attempt(sys).is_ok() {
            return;
        }
        let failures = failures.saturating_add(1);
        if failures >= MAX_CONNECT_ATTEMPTS {
            warn!(
                "Session: {} attempts failed, running offline (retry every {} s)",
                failures,
                OFFLINE_RETRY_MS / 1000
            );
            self.state = SessionState::DegradedOffline {
                next_retry_ms: now_ms + OFFLINE_RETRY_MS,
            };
        } else {
            info!("Session: retry in {} ms", CONNECT_BACKOFF_MS);
            self.state = SessionState::Connecting {
                failures,
                next_attempt_ms: now_ms + CONNECT_BACKOFF_MS,
            };
        }
    }

    /// One connection attempt.  On success: announce, subscribe, `Connected`.
    fn attempt(&mut self, sys: &impl SystemPort) -> Result<(), TransportError> {
        self.attempts = self.attempts.wrapping_add(1);
        let will_topic = self.config.topic(TOPIC_STATUS);
        let options = ConnectOptions {
            client_id: &self.client_id,
            host: &self.config.mqtt_server,
            port: self.config.mqtt_port,
            username: &self.config.mqtt_user,
            password: &self.config.mqtt_pass,
            will_topic: &will_topic,
            will_payload: "false",
        };
        info!(
            "Session: connecting to {}:{} as {}",
            options.host, options.port, options.client_id
        );
        if let Err(e) = self.mqtt.connect(&options) {
            error!("Session: connect failed: {}", e);
            return Err(e);
        }
        if let Err(e) = self.mqtt.subscribe(&self.config.topic(TOPIC_SUBSCRIBE)) {
            error!("Session: subscribe failed: {}", e);
            self.mqtt.disconnect();
            return Err(e);
        }
        self.state = SessionState::Connected;
        info!("Session: connected");
        self.announce(sys.local_ip());
        Ok(())
    }

    /// Liveness flag plus identity records.
    fn announce(&mut self, ip: Option<Ipv4Addr>) {
        let ip = ip.unwrap_or(Ipv4Addr::UNSPECIFIED).to_string();
        let client_id = self.client_id.clone();
        let records: [(&str, &str, bool); 5] = [
            (TOPIC_STATUS, "true", true),
            (TOPIC_INFO_CLIENT, &client_id, false),
            (TOPIC_INFO_IP, &ip, false),
            (TOPIC_INFO_TYPE, DEVICE_TYPE, false),
            (TOPIC_INFO_VERSION, FIRMWARE_VERSION, false),
        ];
        for (suffix, payload, retain) in records {
            let topic = self.config.topic(suffix);
            if let Err(e) = self.mqtt.publish(&topic, payload.as_bytes(), retain) {
                warn!("Session: announce {} failed: {}", topic, e);
            }
        }
    }

    /// Drop the connection (before a restart).
    pub fn shutdown(&mut self) {
        if self.state == SessionState::Connected {
            self.mqtt.disconnect();
        }
        self.state = SessionState::Disconnected;
        info!("Session: closed");
    }
}

impl<M: MqttPort> Publisher for SessionManager<M> {
    fn publish(&mut self, topic: &str, payload: &str, retain: bool) -> Result<(), TransportError> {
        if self.state != SessionState::Connected {
            debug!("Session: drop publish to {} (offline)", topic);
            return Err(TransportError::Unavailable);
        }
        self.mqtt.publish(topic, payload.as_bytes(), retain)
    }
}

// ───────────────────────────────────────────────────────────────
// Tests
// ───────────────────────────────────────────────────────────────

//! MQTT transport adapter.
//!
//! Implements [`MqttPort`].  The session layer decides *when* to connect;
//! this adapter only performs one bounded attempt per call and reports the
//! live link state.
//!
//! ## cfg gating
//!
//! - **`target_os = "espidf"`**: `EspMqttClient` with an event callback
//!   feeding a channel; inbound messages are drained one per poll.
//! - **all other targets**: `rumqttc` synchronous client; the event loop is
//!   pumped non-blockingly from [`MqttPort::poll`].
//!
//! The last will is `<prefix>/status = "false"`, retained, QoS 2.

use core::time::Duration;
use log::{debug, info, warn};

use crate::app::ports::{ConnectOptions, InboundMessage, MqttPort, TransportError};

/// Upper bound on one connection attempt (TCP + CONNACK).
pub const CONNECT_TIMEOUT: Duration = Duration::from_secs(5);
const KEEP_ALIVE: Duration = Duration::from_secs(15);

// ───────────────────────────────────────────────────────────────
// Host: rumqttc
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod host {
    use super::*;
    use rumqttc::{
        Client, ConnectReturnCode, Connection, Event, LastWill, MqttOptions, Packet, QoS,
        TryRecvError,
    };
    use std::time::Instant;

    /// Client request queue depth.
    const REQUEST_CAPACITY: usize = 32;
    /// Events drained per poll before yielding back to the loop.
    const MAX_EVENTS_PER_POLL: usize = 16;

    pub struct RumqttTransport {
        client: Option<Client>,
        connection: Option<Connection>,
        connected: bool,
    }

    impl Default for RumqttTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl RumqttTransport {
        pub fn new() -> Self {
            Self {
                client: None,
                connection: None,
                connected: false,
            }
        }

        fn options(opts: &ConnectOptions<'_>) -> MqttOptions {
            let mut mo = MqttOptions::new(opts.client_id, opts.host, opts.port);
            mo.set_keep_alive(KEEP_ALIVE);
            mo.set_clean_session(true);
            if !opts.username.is_empty() {
                mo.set_credentials(opts.username, opts.password);
            }
            mo.set_last_will(LastWill::new(
                opts.will_topic,
                opts.will_payload.as_bytes().to_vec(),
                QoS::ExactlyOnce,
                true,
            ));
            mo
        }

        /// Drive the fresh event loop until CONNACK or timeout.
        fn await_connack(connection: &mut Connection) -> Result<(), TransportError> {
            let deadline = Instant::now() + CONNECT_TIMEOUT;
            loop {
                let remaining = deadline.saturating_duration_since(Instant::now());
                if remaining.is_zero() {
                    warn!("MQTT: no CONNACK within {:?}", CONNECT_TIMEOUT);
                    return Err(TransportError::ConnectFailed);
                }
                match connection.recv_timeout(remaining) {
                    Ok(Ok(Event::Incoming(Packet::ConnAck(ack)))) => {
                        return if ack.code == ConnectReturnCode::Success {
                            Ok(())
                        } else {
                            warn!("MQTT: broker refused connection ({:?})", ack.code);
                            Err(TransportError::ConnectFailed)
                        };
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        warn!("MQTT: connect error: {}", e);
                        return Err(TransportError::ConnectFailed);
                    }
                    Err(_) => {
                        warn!("MQTT: no CONNACK within {:?}", CONNECT_TIMEOUT);
                        return Err(TransportError::ConnectFailed);
                    }
                }
            }
        }
    }

    impl MqttPort for RumqttTransport {
        fn connect(&mut self, opts: &ConnectOptions<'_>) -> Result<(), TransportError> {
            self.disconnect();
            let (client, mut connection) = Client::new(Self::options(opts), REQUEST_CAPACITY);
            Self::await_connack(&mut connection)?;
            info!("MQTT: connected to {}:{}", opts.host, opts.port);
            self.client = Some(client);
            self.connection = Some(connection);
            self.connected = true;
            Ok(())
        }

        fn disconnect(&mut self) {
            if let Some(client) = self.client.as_mut() {
                if let Err(e) = client.try_disconnect() {
                    debug!("MQTT: disconnect request dropped: {}", e);
                }
                // Flush the DISCONNECT before the event loop is dropped.
                if let Some(conn) = self.connection.as_mut() {
                    for _ in 0..MAX_EVENTS_PER_POLL {
                        if conn.try_recv().is_err() {
                            break;
                        }
                    }
                }
            }
            self.client = None;
            self.connection = None;
            self.connected = false;
        }

        fn is_connected(&self) -> bool {
            self.connected
        }

        fn publish(
            &mut self,
            topic: &str,
            payload: &[u8],
            retain: bool,
        ) -> Result<(), TransportError> {
            let client = self.client.as_mut().ok_or(TransportError::Unavailable)?;
            client
                .try_publish(topic, QoS::AtMostOnce, retain, payload.to_vec())
                .map_err(|e| {
                    warn!("MQTT: publish {} failed: {}", topic, e);
                    TransportError::PublishFailed
                })
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
            let client = self.client.as_mut().ok_or(TransportError::Unavailable)?;
            client.try_subscribe(topic, QoS::AtMostOnce).map_err(|e| {
                warn!("MQTT: subscribe {} failed: {}", topic, e);
                TransportError::SubscribeFailed
            })
        }

        fn poll(&mut self) -> Option<InboundMessage> {
            let conn = self.connection.as_mut()?;
            for _ in 0..MAX_EVENTS_PER_POLL {
                match conn.try_recv() {
                    Ok(Ok(Event::Incoming(Packet::Publish(p)))) => {
                        return Some(InboundMessage::new(p.topic, p.payload.to_vec()));
                    }
                    Ok(Ok(Event::Incoming(Packet::Disconnect))) => {
                        warn!("MQTT: broker closed the session");
                        self.connected = false;
                        return None;
                    }
                    Ok(Ok(_)) => {}
                    Ok(Err(e)) => {
                        warn!("MQTT: connection error: {}", e);
                        self.connected = false;
                        return None;
                    }
                    Err(TryRecvError::Empty) => return None,
                    Err(TryRecvError::Disconnected) => {
                        self.connected = false;
                        return None;
                    }
                }
            }
            None
        }
    }
}

#[cfg(not(target_os = "espidf"))]
pub use host::RumqttTransport;

// ───────────────────────────────────────────────────────────────
// Device: ESP-IDF MQTT client
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod device {
    use super::*;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::mqtt::client::{
        EspMqttClient, EventPayload, LwtConfiguration, MqttClientConfiguration, QoS,
    };
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::mpsc;
    use std::sync::Arc;
    use std::time::Instant;

    pub struct EspMqttTransport {
        client: Option<EspMqttClient<'static>>,
        inbox: Option<mpsc::Receiver<InboundMessage>>,
        connected: Arc<AtomicBool>,
    }

    impl Default for EspMqttTransport {
        fn default() -> Self {
            Self::new()
        }
    }

    impl EspMqttTransport {
        pub fn new() -> Self {
            Self {
                client: None,
                inbox: None,
                connected: Arc::new(AtomicBool::new(false)),
            }
        }
    }

    impl MqttPort for EspMqttTransport {
        fn connect(&mut self, opts: &ConnectOptions<'_>) -> Result<(), TransportError> {
            self.disconnect();

            let url = format!("mqtt://{}:{}", opts.host, opts.port);
            let conf = MqttClientConfiguration {
                client_id: Some(opts.client_id),
                username: (!opts.username.is_empty()).then_some(opts.username),
                password: (!opts.username.is_empty()).then_some(opts.password),
                keep_alive_interval: Some(KEEP_ALIVE),
                lwt: Some(LwtConfiguration {
                    topic: opts.will_topic,
                    payload: opts.will_payload.as_bytes(),
                    qos: QoS::ExactlyOnce,
                    retain: true,
                }),
                ..Default::default()
            };

            let (tx, rx) = mpsc::channel();
            let flag = Arc::new(AtomicBool::new(false));
            let cb_flag = flag.clone();
            let client = EspMqttClient::new_cb(&url, &conf, move |event| match event.payload() {
                EventPayload::Connected(_) => cb_flag.store(true, Ordering::SeqCst),
                EventPayload::Disconnected => cb_flag.store(false, Ordering::SeqCst),
                EventPayload::Received {
                    topic: Some(topic),
                    data,
                    ..
                } => {
                    let _ = tx.send(InboundMessage::new(topic, data));
                }
                _ => {}
            })
            .map_err(|e| {
                warn!("MQTT: client init failed: {}", e);
                TransportError::ConnectFailed
            })?;

            let started = Instant::now();
            while !flag.load(Ordering::SeqCst) {
                if started.elapsed() >= CONNECT_TIMEOUT {
                    warn!("MQTT: no CONNACK within {:?}", CONNECT_TIMEOUT);
                    return Err(TransportError::ConnectFailed);
                }
                FreeRtos::delay_ms(50);
            }

            info!("MQTT: connected to {}", url);
            self.client = Some(client);
            self.inbox = Some(rx);
            self.connected = flag;
            Ok(())
        }

        fn disconnect(&mut self) {
            // Dropping the client stops the ESP-IDF task and closes the socket.
            self.client = None;
            self.inbox = None;
            self.connected.store(false, Ordering::SeqCst);
        }

        fn is_connected(&self) -> bool {
            self.client.is_some() && self.connected.load(Ordering::SeqCst)
        }

        fn publish(
            &mut self,
            topic: &str,
            payload: &[u8],
            retain: bool,
        ) -> Result<(), TransportError> {
            let client = self.client.as_mut().ok_or(TransportError::Unavailable)?;
            client
                .publish(topic, QoS::AtMostOnce, retain, payload)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: publish {} failed: {}", topic, e);
                    TransportError::PublishFailed
                })
        }

        fn subscribe(&mut self, topic: &str) -> Result<(), TransportError> {
            let client = self.client.as_mut().ok_or(TransportError::Unavailable)?;
            client
                .subscribe(topic, QoS::AtMostOnce)
                .map(|_| ())
                .map_err(|e| {
                    warn!("MQTT: subscribe {} failed: {}", topic, e);
                    TransportError::SubscribeFailed
                })
        }

        fn poll(&mut self) -> Option<InboundMessage> {
            let msg = self.inbox.as_ref()?.try_recv().ok();
            if let Some(m) = &msg {
                debug!("MQTT: <- {} ({} bytes)", m.topic, m.payload.len());
            }
            msg
        }
    }
}

#[cfg(target_os = "espidf")]
pub use device::EspMqttTransport;

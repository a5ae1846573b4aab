//! Broker session lifecycle as seen from the gateway tick loop.

use crate::mock_hw::{MemFs, MockMqtt, MockSettings};
use crate::rig::{Rig, CLIENT_ID};

use irtrans::config::{
    CONNECT_BACKOFF_MS, DeviceSettings, FIRMWARE_VERSION, OFFLINE_RETRY_MS, RECONNECT_DELAY_MS,
};
use irtrans::session::SessionState;

#[test]
fn connect_carries_will_and_announces_identity() {
    let rig = Rig::online();
    let mqtt = rig.mqtt();

    let c = &mqtt.connects[0];
    assert_eq!(c.client_id, CLIENT_ID);
    assert_eq!((c.host.as_str(), c.port), ("localhost", 1883));
    assert_eq!(c.will_topic, "irgw/status");
    assert_eq!(c.will_payload, "false");

    assert_eq!(mqtt.subscriptions, vec!["irgw/sender/#".to_string()]);

    let status = &mqtt.published[0];
    assert_eq!((status.topic.as_str(), status.payload.as_str()), ("irgw/status", "true"));
    assert!(status.retain);

    assert_eq!(rig.last_on("/info/client").as_deref(), Some(CLIENT_ID));
    assert_eq!(rig.last_on("/info/ip").as_deref(), Some("192.168.1.50"));
    assert_eq!(rig.last_on("/info/type").as_deref(), Some("IR server"));
    assert_eq!(rig.last_on("/info/version").as_deref(), Some(FIRMWARE_VERSION));
}

#[test]
fn two_failures_degrade_then_retry_every_minute() {
    let mut rig = Rig::boot(MemFs::new(), MockMqtt::failing(3), MockSettings::default());

    let out = rig.tick();
    assert!(matches!(
        rig.gw.session().state(),
        SessionState::Connecting { failures: 1, .. }
    ));
    assert!(out.indicator, "backoff blink starts lit");
    assert!(!rig.advance_to(500).indicator);
    assert!(rig.advance_to(1_000).indicator);

    rig.advance_to(CONNECT_BACKOFF_MS);
    assert_eq!(rig.mqtt().connects.len(), 2);
    assert!(matches!(
        rig.gw.session().state(),
        SessionState::DegradedOffline { .. }
    ));
    assert!(!rig.advance(500).indicator, "no blink while offline");

    let base = CONNECT_BACKOFF_MS;
    for t in (base + 1_000..base + OFFLINE_RETRY_MS).step_by(1_000) {
        rig.advance_to(t);
    }
    assert_eq!(rig.mqtt().connects.len(), 2);

    rig.advance_to(base + OFFLINE_RETRY_MS);
    assert_eq!(rig.mqtt().connects.len(), 3, "exactly one attempt per minute");
    assert!(!rig.gw.session().is_online());

    rig.advance_to(base + 2 * OFFLINE_RETRY_MS);
    assert_eq!(rig.mqtt().connects.len(), 4);
    assert!(rig.gw.session().is_online());
    assert_eq!(rig.last_on("/status").as_deref(), Some("true"));
}

#[test]
fn single_failure_recovers_after_backoff() {
    let mut rig = Rig::boot(MemFs::new(), MockMqtt::failing(1), MockSettings::default());
    rig.tick();
    rig.advance_to(CONNECT_BACKOFF_MS - 10);
    assert_eq!(rig.mqtt().connects.len(), 1);
    rig.advance_to(CONNECT_BACKOFF_MS);
    assert!(rig.gw.session().is_online());
}

#[test]
fn subscribe_failure_counts_as_connect_failure() {
    let mqtt = MockMqtt {
        fail_subscribe: true,
        ..MockMqtt::new()
    };
    let mut rig = Rig::boot(MemFs::new(), mqtt, MockSettings::default());
    rig.tick();
    assert!(matches!(
        rig.gw.session().state(),
        SessionState::Connecting { failures: 1, .. }
    ));
    assert_eq!(rig.mqtt().disconnects, 1);
    assert!(rig.mqtt().published.is_empty());
}

#[test]
fn dropped_link_reconnects_after_delay() {
    let mut rig = Rig::online();
    rig.mqtt_mut().drop_link();

    rig.advance(10);
    assert!(matches!(
        rig.gw.session().state(),
        SessionState::Connecting { failures: 0, .. }
    ));
    let lost_at = rig.now;

    rig.advance_to(lost_at + RECONNECT_DELAY_MS - 1);
    assert_eq!(rig.mqtt().connects.len(), 1);
    rig.advance_to(lost_at + RECONNECT_DELAY_MS);
    assert_eq!(rig.mqtt().connects.len(), 2);
    assert!(rig.gw.session().is_online());
    assert_eq!(rig.payloads_on("/status"), vec!["true", "true"]);
}

#[test]
fn commands_wait_while_offline() {
    let mut rig = Rig::boot(MemFs::new(), MockMqtt::failing(2), MockSettings::default());
    rig.tick();
    rig.advance_to(CONNECT_BACKOFF_MS);
    rig.mqtt_mut().deliver("irgw/sender/rawMode", "1");
    rig.advance(10);
    assert!(!rig.gw.dispatcher().raw_mode());

    rig.advance_to(CONNECT_BACKOFF_MS + OFFLINE_RETRY_MS);
    assert!(rig.gw.session().is_online());
    rig.advance(10);
    assert!(rig.gw.dispatcher().raw_mode());
}

#[test]
fn autosend_flag_restored_at_boot() {
    let settings = MockSettings {
        stored: Some(DeviceSettings { auto_send: true }),
        ..Default::default()
    };
    let rig = Rig::boot(MemFs::new(), MockMqtt::new(), settings);
    assert!(rig.gw.dispatcher().auto_send());
    assert!(!rig.gw.dispatcher().raw_mode());
}

#[test]
fn unreadable_settings_boot_with_defaults() {
    let settings = MockSettings {
        fail_load: true,
        ..Default::default()
    };
    let rig = Rig::boot(MemFs::new(), MockMqtt::new(), settings);
    assert!(!rig.gw.dispatcher().auto_send());
}

//! Test harness: a booted gateway wired to the mocks, plus a virtual clock.

use crate::mock_hw::{MemFs, MockIr, MockMqtt, MockSettings, MockSys};

use irtrans::app::service::{GatewayService, TickOutcome};
use irtrans::config::{DeviceSettings, GatewayConfig};

pub const PREFIX: &str = "irgw";
pub const CLIENT_ID: &str = "IRGW-de:ad:be:ef:ca:fe-2a";

pub struct Rig {
    pub gw: GatewayService<MemFs, MockMqtt>,
    pub ir: MockIr,
    pub settings: MockSettings,
    pub sys: MockSys,
    pub now: u64,
    pub pressed: bool,
}

#[allow(dead_code)]
impl Rig {
    pub fn boot(fs: MemFs, mqtt: MockMqtt, settings: MockSettings) -> Self {
        let gw = GatewayService::boot(
            GatewayConfig::default(),
            fs,
            mqtt,
            CLIENT_ID,
            &settings,
            0,
        )
        .expect("default config boots");
        Self {
            gw,
            ir: MockIr::new(),
            settings,
            sys: MockSys::default(),
            now: 0,
            pressed: false,
        }
    }

    /// Booted but not yet ticked.
    pub fn new() -> Self {
        Self::boot(MemFs::new(), MockMqtt::new(), MockSettings::default())
    }

    /// Booted with `fs`, connected after the first tick.
    pub fn online_with(fs: MemFs) -> Self {
        let mut rig = Self::boot(fs, MockMqtt::new(), MockSettings::default());
        rig.tick();
        assert!(rig.gw.session().is_online(), "first tick connects");
        rig
    }

    pub fn online() -> Self {
        Self::online_with(MemFs::new())
    }

    /// Online with the autosend flag restored from settings.
    pub fn online_autosend(fs: MemFs) -> Self {
        let settings = MockSettings {
            stored: Some(DeviceSettings { auto_send: true }),
            ..Default::default()
        };
        let mut rig = Self::boot(fs, MockMqtt::new(), settings);
        rig.tick();
        rig
    }

    pub fn tick(&mut self) -> TickOutcome {
        self.gw.tick(
            self.now,
            self.pressed,
            &mut self.ir,
            &mut self.settings,
            &self.sys,
        )
    }

    pub fn advance(&mut self, ms: u64) -> TickOutcome {
        self.now += ms;
        self.tick()
    }

    pub fn advance_to(&mut self, at: u64) -> TickOutcome {
        self.now = at;
        self.tick()
    }

    /// Deliver `<prefix><suffix>` and run the tick that dispatches it.
    pub fn send(&mut self, suffix: &str, payload: &str) -> TickOutcome {
        let topic = format!("{}{}", PREFIX, suffix);
        self.mqtt_mut().deliver(&topic, payload);
        self.advance(10)
    }

    pub fn mqtt(&self) -> &MockMqtt {
        self.gw.session().transport()
    }

    pub fn mqtt_mut(&mut self) -> &mut MockMqtt {
        self.gw.session_mut().transport_mut()
    }

    pub fn fs(&self) -> &MemFs {
        self.gw.store().files()
    }

    /// Last payload published on `<prefix><suffix>`.
    pub fn last_on(&self, suffix: &str) -> Option<String> {
        self.mqtt()
            .last_on(&format!("{}{}", PREFIX, suffix))
            .map(str::to_string)
    }

    pub fn payloads_on(&self, suffix: &str) -> Vec<String> {
        self.mqtt()
            .published_on(&format!("{}{}", PREFIX, suffix))
            .into_iter()
            .map(|p| p.payload.clone())
            .collect()
    }
}

/// A filesystem holding `(slot, record)` pairs.
#[allow(dead_code)]
pub fn fs_with_slots(slots: &[(u32, &str)]) -> MemFs {
    slots.iter().fold(MemFs::new(), |fs, (id, record)| {
        fs.with_file(&format!("ir/{}.dat", id), record.as_bytes())
    })
}

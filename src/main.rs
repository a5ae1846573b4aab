//! IR gateway firmware: main entry point.
//!
//! Hexagonal architecture with one cooperative tick loop.
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────────┐
//! │                      Adapters (outer ring)                     │
//! │                                                                │
//! │  FlashFs        NvsAdapter      MqttTransport   IR transceiver │
//! │  (FilePort)     (SettingsPort)  (MqttPort)      (IrPort)       │
//! │  SystemInfo     WifiStation     TriggerButton   StatusLed      │
//! │                                                                │
//! │  ──────────────── Port Trait Boundary ───────────────────      │
//! │                                                                │
//! │  ┌────────────────────────────────────────────────────────┐    │
//! │  │             GatewayService (pure logic)                │    │
//! │  │  Session · Dispatcher · Slot store · Scheduler         │    │
//! │  └────────────────────────────────────────────────────────┘    │
//! └────────────────────────────────────────────────────────────────┘
//! ```
//!
//! On the device a `reboot` command restarts the chip.  The host simulator
//! tears the gateway down and boots it again in-process.

#![deny(unused_must_use)]

use anyhow::Result;

#[cfg(not(target_os = "espidf"))]
fn main() -> Result<()> {
    host::main()
}

#[cfg(target_os = "espidf")]
fn main() -> Result<()> {
    device::main()
}

// ───────────────────────────────────────────────────────────────
// Host simulator
// ───────────────────────────────────────────────────────────────

#[cfg(not(target_os = "espidf"))]
mod host {
    use std::path::PathBuf;
    use std::time::Duration;

    use anyhow::Result;
    use clap::Parser;
    use log::info;

    use irtrans::adapters::device_id;
    use irtrans::adapters::fs::{FlashFs, SIM_CAPACITY_BYTES};
    use irtrans::adapters::ir::SimIr;
    use irtrans::adapters::mqtt::RumqttTransport;
    use irtrans::adapters::nvs::NvsAdapter;
    use irtrans::adapters::system::SystemInfo;
    use irtrans::adapters::time::MonotonicClock;
    use irtrans::app::service::GatewayService;
    use irtrans::config::{self, GatewayConfig, FIRMWARE_VERSION};
    use irtrans::drivers::button::{IdleInput, TriggerButton};
    use irtrans::drivers::status_led::{NullOutput, StatusLed};
    use irtrans::drivers::watchdog::Watchdog;
    use irtrans::Error;

    /// MQTT IR gateway, host simulator.
    #[derive(Parser, Debug)]
    #[command(name = "irtrans", version, about)]
    struct Cli {
        /// Directory standing in for the SPIFFS partition.
        #[arg(long, env = "IRTRANS_DATA_DIR", default_value = "irtrans-data")]
        data_dir: PathBuf,

        #[arg(long, env = "IRTRANS_MQTT_SERVER")]
        mqtt_server: Option<String>,

        #[arg(long, env = "IRTRANS_MQTT_PORT")]
        mqtt_port: Option<u16>,

        #[arg(long, env = "IRTRANS_MQTT_USER")]
        mqtt_user: Option<String>,

        #[arg(long, env = "IRTRANS_MQTT_PASS")]
        mqtt_pass: Option<String>,

        #[arg(long, env = "IRTRANS_MQTT_PREFIX")]
        mqtt_prefix: Option<String>,

        /// Write the effective settings back to config.json.
        #[arg(long)]
        save: bool,

        /// Loop period.
        #[arg(long, default_value_t = 10)]
        tick_ms: u64,
    }

    impl Cli {
        fn apply(&self, cfg: &mut GatewayConfig) {
            if let Some(v) = &self.mqtt_server {
                cfg.mqtt_server.clone_from(v);
            }
            if let Some(v) = self.mqtt_port {
                cfg.mqtt_port = v;
            }
            if let Some(v) = &self.mqtt_user {
                cfg.mqtt_user.clone_from(v);
            }
            if let Some(v) = &self.mqtt_pass {
                cfg.mqtt_pass.clone_from(v);
            }
            if let Some(v) = &self.mqtt_prefix {
                cfg.mqtt_prefix.clone_from(v);
            }
        }
    }

    pub fn main() -> Result<()> {
        env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();
        let cli = Cli::parse();

        info!("irtrans v{} (host simulator)", FIRMWARE_VERSION);

        let mut nvs = NvsAdapter::new().map_err(Error::from)?;
        let clock = MonotonicClock::new();
        let sys = SystemInfo::new();
        let watchdog = Watchdog::new();

        loop {
            run(&cli, &clock, &sys, &mut nvs, &watchdog)?;
            info!("Restarting gateway");
        }
    }

    /// One boot: returns when a restart is requested.
    fn run(
        cli: &Cli,
        clock: &MonotonicClock,
        sys: &SystemInfo,
        nvs: &mut NvsAdapter,
        watchdog: &Watchdog,
    ) -> Result<()> {
        let mut fs = FlashFs::open(&cli.data_dir, SIM_CAPACITY_BYTES).map_err(Error::from)?;
        let mut cfg = config::load_or_init(&mut fs);
        cli.apply(&mut cfg);
        if cli.save {
            config::save_config(&mut fs, &cfg).map_err(Error::from)?;
        }

        let client_id = device_id::client_name(&device_id::read_mac(), clock.uptime_us());
        info!("Client id {}", client_id);

        let mut button = TriggerButton::new(
            IdleInput {
                high: !cfg.button_active_high,
            },
            cfg.button_active_high,
        );
        let mut led = StatusLed::new(NullOutput::default(), true);
        let mut ir = SimIr::new();

        let mut gateway = GatewayService::boot(
            cfg,
            fs,
            RumqttTransport::new(),
            &client_id,
            &*nvs,
            clock.now_ms(),
        )?;

        info!("System ready. Entering loop.");
        loop {
            let out = gateway.tick(clock.now_ms(), button.is_pressed(), &mut ir, nvs, sys);
            led.set(out.indicator);
            watchdog.feed();
            if out.restart {
                return Ok(());
            }
            std::thread::sleep(Duration::from_millis(cli.tick_ms));
        }
    }
}

// ───────────────────────────────────────────────────────────────
// ESP32
// ───────────────────────────────────────────────────────────────

#[cfg(target_os = "espidf")]
mod device {
    use anyhow::Result;
    use log::{info, warn};

    use esp_idf_svc::eventloop::EspSystemEventLoop;
    use esp_idf_svc::hal::delay::FreeRtos;
    use esp_idf_svc::hal::gpio::{AnyIOPin, AnyInputPin, AnyOutputPin, PinDriver, Pull};
    use esp_idf_svc::hal::peripherals::Peripherals;
    use esp_idf_svc::nvs::EspDefaultNvsPartition;

    use irtrans::adapters::device_id;
    use irtrans::adapters::fs::FlashFs;
    use irtrans::adapters::ir::RmtIr;
    use irtrans::adapters::mqtt::EspMqttTransport;
    use irtrans::adapters::nvs::NvsAdapter;
    use irtrans::adapters::system::SystemInfo;
    use irtrans::adapters::time::MonotonicClock;
    use irtrans::adapters::wifi::WifiStation;
    use irtrans::app::service::GatewayService;
    use irtrans::config::{self, FIRMWARE_VERSION};
    use irtrans::drivers::button::TriggerButton;
    use irtrans::drivers::status_led::StatusLed;
    use irtrans::drivers::watchdog::Watchdog;
    use irtrans::pins::BOARD;
    use irtrans::Error;

    const TICK_MS: u32 = 10;

    pub fn main() -> Result<()> {
        // ── 1. ESP-IDF bootstrap ──────────────────────────────────
        esp_idf_svc::sys::link_patches();
        esp_idf_logger::init()?;

        info!("╔══════════════════════════════════════╗");
        info!("║  IR gateway v{}                      ║", FIRMWARE_VERSION);
        info!("╚══════════════════════════════════════╝");

        let peripherals = Peripherals::take()?;
        let sysloop = EspSystemEventLoop::take()?;
        let nvs_partition = EspDefaultNvsPartition::take()?;
        let clock = MonotonicClock::new();

        // ── 2. Storage and config ─────────────────────────────────
        let mut fs = FlashFs::mount_spiffs().map_err(Error::from)?;
        let cfg = config::load_or_init(&mut fs);
        let mut nvs = NvsAdapter::new().map_err(Error::from)?;

        // ── 3. Network ────────────────────────────────────────────
        let mut sys = SystemInfo::new();
        let mut wifi = WifiStation::new(peripherals.modem, sysloop, Some(nvs_partition))?;
        match wifi.set_credentials(&cfg.wifi_ssid, &cfg.wifi_pass) {
            Ok(()) => {
                if let Err(e) = wifi.connect(clock.now_ms()) {
                    warn!("WiFi: {}, running offline until it recovers", e);
                }
            }
            Err(e) => warn!("WiFi: {}, running offline", e),
        }
        sys.set_ip(wifi.ip());

        // ── 4. Local I/O ──────────────────────────────────────────
        // SAFETY: pin numbers come from the board table and each is claimed
        // exactly once here.
        let trigger = unsafe { AnyInputPin::new(BOARD.trigger) };
        let mut trigger = PinDriver::input(trigger)?;
        trigger.set_pull(if cfg.button_active_high {
            Pull::Down
        } else {
            Pull::Up
        })?;
        let mut button = TriggerButton::new(trigger, cfg.button_active_high);

        let led_pin = unsafe { AnyOutputPin::new(BOARD.status_led) };
        let mut led = StatusLed::new(PinDriver::output(led_pin)?, true);

        let ir_send = unsafe { AnyIOPin::new(BOARD.ir_send) };
        let ir_recv = unsafe { AnyIOPin::new(BOARD.ir_recv) };
        let mut ir = RmtIr::new(
            peripherals.rmt.channel0,
            ir_send,
            peripherals.rmt.channel1,
            ir_recv,
        )?;

        // ── 5. Gateway ────────────────────────────────────────────
        let client_id = device_id::client_name(&device_id::read_mac(), clock.uptime_us());
        info!("Client id {}", client_id);
        let mut gateway = GatewayService::boot(
            cfg,
            fs,
            EspMqttTransport::new(),
            &client_id,
            &nvs,
            clock.now_ms(),
        )?;
        let watchdog = Watchdog::new();

        info!("System ready. Entering loop.");

        // ── 6. Tick loop ──────────────────────────────────────────
        loop {
            let now = clock.now_ms();
            sys.set_ip(wifi.poll(now));
            let out = gateway.tick(now, button.is_pressed(), &mut ir, &mut nvs, &sys);
            led.set(out.indicator);
            watchdog.feed();
            if out.restart {
                info!("Restarting");
                FreeRtos::delay_ms(100);
                esp_idf_svc::hal::reset::restart();
            }
            FreeRtos::delay_ms(TICK_MS);
        }
    }
}

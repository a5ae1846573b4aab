//! Gateway service: the hexagonal core.
//!
//! [`GatewayService`] owns the slot store, the broker session, the command
//! dispatcher and the transmission scheduler, and runs them as one
//! cooperative [`tick`](GatewayService::tick).  All I/O flows through port
//! traits, so the whole service runs against mock adapters in tests.
//!
//! ```text
//!   MqttPort ──▶ ┌──────────────────────────────┐ ──▶ IrPort
//!                │        GatewayService         │
//!   FilePort ◀──▶│ Session · Dispatcher · Sched  │ ◀── button level
//!                └──────────────────────────────┘ ──▶ indicator level
//! ```
//!
//! One tick, in order:
//! 1. pump the session; dispatch at most one inbound command
//! 2. forward at most one IR capture (online only)
//! 3. run the scheduler (button edge, second code, autosend)
//! 4. compute the indicator level

use log::{debug, info, warn};

use crate::config::{self, DeviceSettings, GatewayConfig, BACKOFF_BLINK_MS};
use crate::drivers::led_patterns::{LedPatternEngine, PatternId};
use crate::error::Result;
use crate::scheduler::TransmissionScheduler;
use crate::session::SessionManager;
use crate::store::SlotStore;

use super::commands;
use super::dispatcher::{CommandDispatcher, DispatchOutcome};
use super::ports::{FilePort, IrPort, MqttPort, SettingsPort, SystemPort};
use super::receiver;

/// Result of one [`GatewayService::tick`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TickOutcome {
    /// A reboot command arrived; the session is already closed.
    pub restart: bool,
    /// An IR frame went out during this tick.
    pub transmitted: bool,
    /// Status LED level.
    pub indicator: bool,
}

// ───────────────────────────────────────────────────────────────
// GatewayService
// ───────────────────────────────────────────────────────────────

pub struct GatewayService<F: FilePort, M: MqttPort> {
    config: GatewayConfig,
    store: SlotStore<F>,
    session: SessionManager<M>,
    dispatcher: CommandDispatcher,
    scheduler: TransmissionScheduler,
    indicator: LedPatternEngine,
}

impl<F: FilePort, M: MqttPort> GatewayService<F, M> {
    /// Build the service: restore device settings and load the default slots.
    ///
    /// Fails only if `config` does not validate.
    pub fn boot(
        config: GatewayConfig,
        fs: F,
        mqtt: M,
        client_id: &str,
        settings: &impl SettingsPort,
        now_ms: u64,
    ) -> Result<Self> {
        config::validate_config(&config)?;

        let stored = settings.load().unwrap_or_else(|e| {
            warn!("Gateway: settings unreadable ({}), using defaults", e);
            DeviceSettings::default()
        });

        let store = SlotStore::new(fs);
        let mut scheduler = TransmissionScheduler::new(config.autosend_interval_ms, now_ms);
        scheduler.defaults_mut().reload(&store);

        let dispatcher = CommandDispatcher::new(config.mqtt_prefix.clone(), stored);
        let session = SessionManager::new(mqtt, config.clone(), client_id);

        info!(
            "Gateway: booted (prefix '{}', autosend {}, interval {} ms)",
            config.mqtt_prefix, stored.auto_send, config.autosend_interval_ms
        );

        Ok(Self {
            config,
            store,
            session,
            dispatcher,
            scheduler,
            indicator: LedPatternEngine::new(),
        })
    }

    // ── Per-tick orchestration ────────────────────────────────

    /// Run one loop iteration.
    pub fn tick(
        &mut self,
        now_ms: u64,
        button_pressed: bool,
        ir: &mut impl IrPort,
        settings: &mut impl SettingsPort,
        sys: &impl SystemPort,
    ) -> TickOutcome {
        let mut outcome = TickOutcome::default();

        // 1. Inbound command
        if let Some(msg) = self.session.poll(now_ms, sys) {
            match commands::parse(&self.config.mqtt_prefix, &msg.topic, &msg.payload) {
                Ok(cmd) => {
                    match self.dispatcher.dispatch(
                        cmd,
                        &mut self.store,
                        self.scheduler.defaults_mut(),
                        ir,
                        &mut self.session,
                        settings,
                        sys,
                    ) {
                        DispatchOutcome::Done => {}
                        DispatchOutcome::Transmitted => outcome.transmitted = true,
                        DispatchOutcome::Restart => {
                            self.session.shutdown();
                            outcome.restart = true;
                            return outcome;
                        }
                    }
                }
                Err(e) => debug!("Gateway: dropped {}: {}", msg.topic, e),
            }
        }

        // 2. IR receive forwarding
        if self.session.is_online() {
            receiver::forward(
                &self.config.mqtt_prefix,
                self.dispatcher.raw_mode(),
                ir,
                &mut self.session,
            );
        }

        // 3. Scheduler
        if let Some(fired) =
            self.scheduler
                .tick(now_ms, button_pressed, self.dispatcher.auto_send(), ir)
        {
            outcome.transmitted |= fired.transmitted;
        }

        // 4. Indicator
        let connectivity = if self.session.backoff_blink(now_ms).is_some() {
            PatternId::Blink {
                half_period_ms: BACKOFF_BLINK_MS,
            }
        } else {
            PatternId::Off
        };
        self.indicator.set_connectivity_pattern(connectivity, now_ms);
        self.indicator.set_activity(outcome.transmitted);
        outcome.indicator = self.indicator.level(now_ms);

        outcome
    }

    // ── Queries ───────────────────────────────────────────────

    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    pub fn session(&self) -> &SessionManager<M> {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut SessionManager<M> {
        &mut self.session
    }

    pub fn store(&self) -> &SlotStore<F> {
        &self.store
    }

    pub fn dispatcher(&self) -> &CommandDispatcher {
        &self.dispatcher
    }

    pub fn scheduler(&self) -> &TransmissionScheduler {
        &self.scheduler
    }
}

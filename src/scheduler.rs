//! Transmission scheduler: trigger button and periodic autosend.
//!
//! Both trigger sources replay the two default slots.  The scheduler keeps
//! its own in-memory copy of them so a tick never touches flash.
//!
//! ```text
//! ┌──────────────────────────────────────────────────────────────┐
//! │                     Trigger Sources                          │
//! │                                                              │
//! │  ┌───────────┐  ┌───────────┐  ┌──────────────┐  ┌────────┐  │
//! │  │ Button    │  │ Button    │  │ Second code  │  │Autosend│  │
//! │  │ press     │  │ release   │  │ (+3 s)       │  │ timer  │  │
//! │  └─────┬─────┘  └─────┬─────┘  └──────┬───────┘  └───┬────┘  │
//! │        │ slot 1       │ slot 2        │ slot 2       │ slot 1│
//! │        ▼              ▼               ▼              ▼       │
//! │  ┌────────────────────────────────────────────────────────┐  │
//! │  │   TransmissionScheduler::tick  (one fire per tick)     │  │
//! │  └───────────────────────┬────────────────────────────────┘  │
//! │                          ▼                                   │
//! │                       IrPort                                 │
//! └──────────────────────────────────────────────────────────────┘
//! ```
//!
//! Priority per tick: button edge > pending second code > autostart.

use log::{debug, info, warn};

use crate::app::codec::{self, Waveform};
use crate::app::ports::{FilePort, IrPort};
use crate::config::{DEFAULT_SLOTS, SECOND_CODE_DELAY_MS};
use crate::drivers::button::{Edge, EdgeDetector};
use crate::store::{SlotError, SlotStore};

// ═══════════════════════════════════════════════════════════════
//  Default slot cache
// ═══════════════════════════════════════════════════════════════

/// In-memory mirror of slots 1 and 2.
#[derive(Debug, Clone, Default)]
pub struct DefaultSlots {
    pub first: Waveform,
    pub second: Waveform,
}

impl DefaultSlots {
    /// Re-read both default slots.  Missing or unreadable slots become empty.
    pub fn reload<F: FilePort>(&mut self, store: &SlotStore<F>) {
        self.first = Self::load_one(store, DEFAULT_SLOTS.0);
        self.second = Self::load_one(store, DEFAULT_SLOTS.1);
        info!(
            "Sched: default slots loaded ({} / {} values)",
            self.first.len(),
            self.second.len()
        );
    }

    fn load_one<F: FilePort>(store: &SlotStore<F>, id: u32) -> Waveform {
        match store.load(id) {
            Ok(w) => w,
            Err(SlotError::NotFound) => Waveform::new(),
            Err(e) => {
                warn!("Sched: default slot {} unavailable: {}", id, e);
                Waveform::new()
            }
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Scheduler engine
// ═══════════════════════════════════════════════════════════════

/// What caused a fire.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Trigger {
    ButtonPressed,
    ButtonReleased,
    SecondCode,
    Autostart,
}

/// Outcome of one [`TransmissionScheduler::tick`] that fired.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Fired {
    pub trigger: Trigger,
    /// `false` when the slot was empty and nothing was sent.
    pub transmitted: bool,
}

pub struct TransmissionScheduler {
    edges: EdgeDetector,
    interval_ms: u64,
    last_autostart_ms: u64,
    pending_second: bool,
    defaults: DefaultSlots,
}

impl TransmissionScheduler {
    /// `now_ms` starts the autosend interval.
    pub fn new(interval_ms: u64, now_ms: u64) -> Self {
        Self {
            edges: EdgeDetector::new(),
            interval_ms,
            last_autostart_ms: now_ms,
            pending_second: false,
            defaults: DefaultSlots::default(),
        }
    }

    pub fn defaults(&self) -> &DefaultSlots {
        &self.defaults
    }

    pub fn defaults_mut(&mut self) -> &mut DefaultSlots {
        &mut self.defaults
    }

    pub fn second_code_pending(&self) -> bool {
        self.pending_second
    }

    /// Run one scheduling step.  At most one slot is transmitted.
    pub fn tick(
        &mut self,
        now_ms: u64,
        button_pressed: bool,
        auto_send: bool,
        ir: &mut impl IrPort,
    ) -> Option<Fired> {
        let autostart_due = auto_send && self.autostart_due(now_ms);

        if let Some(edge) = self.edges.update(now_ms, button_pressed) {
            let trigger = match edge {
                Edge::Pressed => {
                    self.last_autostart_ms = now_ms;
                    self.pending_second = false;
                    Trigger::ButtonPressed
                }
                Edge::Released => {
                    if autostart_due {
                        self.last_autostart_ms = now_ms;
                    }
                    Trigger::ButtonReleased
                }
            };
            info!("Sched: {:?}", trigger);
            return Some(self.fire(trigger, ir));
        }

        if self.pending_second
            && now_ms.saturating_sub(self.last_autostart_ms) >= SECOND_CODE_DELAY_MS
        {
            self.pending_second = false;
            return Some(self.fire(Trigger::SecondCode, ir));
        }

        if autostart_due {
            self.last_autostart_ms = now_ms;
            self.pending_second = true;
            info!("Sched: autosend cycle");
            return Some(self.fire(Trigger::Autostart, ir));
        }

        None
    }

    fn autostart_due(&self, now_ms: u64) -> bool {
        now_ms.saturating_sub(self.last_autostart_ms) >= self.interval_ms
    }

    fn fire(&self, trigger: Trigger, ir: &mut impl IrPort) -> Fired {
        let slot = match trigger {
            Trigger::ButtonPressed | Trigger::Autostart => &self.defaults.first,
            Trigger::ButtonReleased | Trigger::SecondCode => &self.defaults.second,
        };
        let transmitted = match codec::split_frame(slot) {
            Some((ticks, khz)) => match ir.send_raw(ticks, khz) {
                Ok(()) => true,
                Err(e) => {
                    warn!("Sched: {:?} transmit failed: {}", trigger, e);
                    false
                }
            },
            None => {
                debug!("Sched: {:?} skipped, slot empty", trigger);
                false
            }
        };
        Fired {
            trigger,
            transmitted,
        }
    }
}

// ═══════════════════════════════════════════════════════════════
//  Tests
// ═══════════════════════════════════════════════════════════════

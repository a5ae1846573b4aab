//! Command dispatcher: applies one parsed [`Command`] to the device.
//!
//! ```text
//!  Command ──▶ CommandDispatcher ──▶ SlotStore   (ir/<id>.dat)
//!                    │           ──▶ IrPort      (transmit)
//!                    │           ──▶ SettingsPort (autosend flag)
//!                    └──────────────▶ Publisher   (replies, echoes)
//! ```
//!
//! The dispatcher owns the two runtime mode flags.  No command error is
//! fatal: failures are logged and the command is dropped.  Only
//! [`Command::Reboot`] asks the caller to restart.

use core::fmt::Write as _;
use log::{debug, info, warn};

use super::codec;
use super::commands::{Command, QueryKind, SlotRef};
use super::ports::{FilePort, IrPort, Publisher, SettingsPort, SystemPort};
use crate::config::{
    self, DeviceSettings, DEFAULT_SLOTS, SLOTS_NUMBER, TOPIC_AUTOSEND_VAL, TOPIC_CMD_RESULT,
    TOPIC_RAW_MODE_VAL,
};
use crate::scheduler::DefaultSlots;
use crate::store::{SlotError, SlotStore};

/// What the caller must do after a command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    Done,
    /// At least one IR frame went out.
    Transmitted,
    /// Restart the device.
    Restart,
}

pub struct CommandDispatcher {
    prefix: String,
    raw_mode: bool,
    auto_send: bool,
}

/// `true` for IDs the slot store may address.
pub fn slot_in_range(id: SlotRef) -> bool {
    (1..=SLOTS_NUMBER).contains(&id)
}

fn is_default_slot(id: SlotRef) -> bool {
    id == DEFAULT_SLOTS.0 || id == DEFAULT_SLOTS.1
}

fn flag_str(v: bool) -> &'static str {
    if v { "true" } else { "false" }
}

impl CommandDispatcher {
    pub fn new(prefix: impl Into<String>, settings: DeviceSettings) -> Self {
        Self {
            prefix: prefix.into(),
            raw_mode: false,
            auto_send: settings.auto_send,
        }
    }

    pub fn raw_mode(&self) -> bool {
        self.raw_mode
    }

    pub fn auto_send(&self) -> bool {
        self.auto_send
    }

    pub fn prefix(&self) -> &str {
        &self.prefix
    }

    /// Apply `cmd`.
    pub fn dispatch<F, I, P, S, Y>(
        &mut self,
        cmd: Command,
        store: &mut SlotStore<F>,
        defaults: &mut DefaultSlots,
        ir: &mut I,
        out: &mut P,
        settings: &mut S,
        sys: &Y,
    ) -> DispatchOutcome
    where
        F: FilePort,
        I: IrPort,
        P: Publisher,
        S: SettingsPort,
        Y: SystemPort,
    {
        debug!("Dispatch: {}", cmd.name());
        match cmd {
            Command::Reboot => {
                info!("Dispatch: restart requested");
                DispatchOutcome::Restart
            }
            Command::WipeConfig => {
                if let Err(e) = config::wipe_config(store.files_mut()) {
                    warn!("Dispatch: wipe failed: {}", e);
                }
                DispatchOutcome::Done
            }
            Command::SystemQuery(kind) => {
                let reply = match kind {
                    QueryKind::List => Self::list_reply(store.files()),
                    QueryKind::SysInfo => Some(Self::sysinfo_reply(sys)),
                    QueryKind::Unknown => Some(String::from("command unknown")),
                };
                if let Some(reply) = reply {
                    self.reply(out, TOPIC_CMD_RESULT, &reply);
                }
                DispatchOutcome::Done
            }
            Command::SetRawMode(v) => {
                self.raw_mode = v;
                info!("Dispatch: raw mode {}", flag_str(v));
                self.reply(out, TOPIC_RAW_MODE_VAL, flag_str(v));
                DispatchOutcome::Done
            }
            Command::SetAutoSendMode(v) => {
                self.auto_send = v;
                info!("Dispatch: autosend {}", flag_str(v));
                if let Err(e) = settings.save(&DeviceSettings { auto_send: v }) {
                    warn!("Dispatch: autosend not persisted: {}", e);
                }
                self.reply(out, TOPIC_AUTOSEND_VAL, flag_str(v));
                DispatchOutcome::Done
            }
            Command::SendStoredSlot(id) => Self::outcome(Self::send_slot(store, ir, id)),
            Command::SendStoredSequence(ids) => {
                let mut any = false;
                for id in ids {
                    any |= Self::send_slot(store, ir, id);
                }
                Self::outcome(any)
            }
            Command::StoreRaw { slot, ticks } => {
                if !slot_in_range(slot) {
                    debug!("Dispatch: storeRaw to invalid slot {}", slot);
                    return DispatchOutcome::Done;
                }
                match store.save(slot, &ticks) {
                    Ok(()) if is_default_slot(slot) => defaults.reload(store),
                    Ok(()) => {}
                    Err(e) => warn!("Dispatch: storeRaw {} failed: {}", slot, e),
                }
                DispatchOutcome::Done
            }
            Command::DeleteStoredSlot(slot) => {
                if !slot_in_range(slot) {
                    debug!("Dispatch: deleteRaw on invalid slot {}", slot);
                    return DispatchOutcome::Done;
                }
                match store.delete(slot) {
                    Ok(()) if is_default_slot(slot) => defaults.reload(store),
                    Ok(()) => {}
                    Err(SlotError::NotFound) => debug!("Dispatch: slot {} already empty", slot),
                    Err(e) => warn!("Dispatch: deleteRaw {} failed: {}", slot, e),
                }
                DispatchOutcome::Done
            }
            Command::SendGc(seq) => {
                info!("Dispatch: GC code, {} values", seq.len());
                Self::outcome(Self::check(ir.send_gc(&seq), "sendGC"))
            }
            Command::SendRawTicks { ticks, khz } => {
                if ticks.is_empty() {
                    debug!("Dispatch: sendRAW without ticks");
                    return DispatchOutcome::Done;
                }
                info!("Dispatch: raw {} ticks @ {} kHz", ticks.len(), khz);
                Self::outcome(Self::check(ir.send_raw(&ticks, khz), "sendRAW"))
            }
            Command::SendEncoded {
                protocol,
                value,
                bits,
            } => {
                info!("Dispatch: {} {} ({} bits)", protocol.as_str(), value, bits);
                Self::outcome(Self::check(
                    ir.send_encoded(protocol, value, bits),
                    protocol.as_str(),
                ))
            }
            Command::OwnEcho | Command::Unrecognized => DispatchOutcome::Done,
        }
    }

    // ── Helpers ───────────────────────────────────────────────

    fn outcome(transmitted: bool) -> DispatchOutcome {
        if transmitted {
            DispatchOutcome::Transmitted
        } else {
            DispatchOutcome::Done
        }
    }

    fn check<E: core::fmt::Display>(res: Result<(), E>, what: &str) -> bool {
        match res {
            Ok(()) => true,
            Err(e) => {
                warn!("Dispatch: {} failed: {}", what, e);
                false
            }
        }
    }

    /// Load and transmit one stored slot.  Returns `true` if a frame went out.
    fn send_slot<F: FilePort>(store: &SlotStore<F>, ir: &mut impl IrPort, id: SlotRef) -> bool {
        if !slot_in_range(id) {
            debug!("Dispatch: skip invalid slot {}", id);
            return false;
        }
        let values = match store.load(id) {
            Ok(v) => v,
            Err(SlotError::NotFound) => {
                debug!("Dispatch: slot {} empty", id);
                return false;
            }
            Err(e) => {
                warn!("Dispatch: slot {} unreadable: {}", id, e);
                return false;
            }
        };
        match codec::split_frame(&values) {
            Some((ticks, khz)) => {
                info!("Dispatch: slot {} → {} ticks @ {} kHz", id, ticks.len(), khz);
                Self::check(ir.send_raw(ticks, khz), "slot transmit")
            }
            None => false,
        }
    }

    fn reply(&self, out: &mut impl Publisher, suffix: &str, payload: &str) {
        let topic = format!("{}{}", self.prefix, suffix);
        if let Err(e) = out.publish(&topic, payload, false) {
            warn!("Dispatch: reply on {} not sent: {}", topic, e);
        }
    }

    /// `/<file>=<size>;...Total bytes=N;Used bytes=M`
    fn list_reply(fs: &impl FilePort) -> Option<String> {
        let entries = fs
            .list()
            .map_err(|e| warn!("Dispatch: listing failed: {}", e))
            .ok()?;
        let usage = fs
            .usage()
            .map_err(|e| warn!("Dispatch: usage query failed: {}", e))
            .ok()?;
        let mut s = String::new();
        for entry in entries {
            let _ = write!(s, "/{}={};", entry.path, entry.size);
        }
        let _ = write!(
            s,
            "Total bytes={};Used bytes={}",
            usage.total_bytes, usage.used_bytes
        );
        Some(s)
    }

    fn sysinfo_reply(sys: &impl SystemPort) -> String {
        let chip = sys.chip_info();
        let verdict = if chip.flash_config_size == chip.flash_real_size {
            "ok"
        } else {
            "wrong"
        };
        format!(
            "Chip id:{:x};Flash id:{:x};Flash real size:{};Flash ide size:{};Flash ide mode:{};Flash Chip configuration:{}",
            chip.chip_id,
            chip.flash_id,
            chip.flash_real_size,
            chip.flash_config_size,
            chip.flash_mode.as_str(),
            verdict
        )
    }
}

//! Inbound command vocabulary and the topic/payload parser.
//!
//! Every message on `<prefix>/sender/#` becomes exactly one [`Command`]
//! (or a [`ParseError`] when a numeric payload is malformed).  The parser
//! is total and stateless; it never touches storage or hardware.
//!
//! ```text
//!  <prefix>/sender/reboot                 → Reboot
//!  <prefix>/sender/cmd            "ls"    → SystemQuery(List)
//!  <prefix>/sender/storeRaw/3     "9000,4500,38"
//!                                         → StoreRaw { slot: 3, ticks }
//!  <prefix>/sender/NEC/32         "16712445"
//!                                         → SendEncoded { Nec, 16712445, 32 }
//!  <prefix>/sender/rawMode/val            → OwnEcho
//!  otherprefix/...                        → Unrecognized
//! ```

use core::fmt;

use super::codec::{self, CsvError, Waveform};
use super::ports::IrProtocol;
use crate::config::{SEQ_SIZE, TOPIC_SENDER, TOPIC_STATUS};

/// Slot reference as received.  Range checks happen in the dispatcher.
pub type SlotRef = u32;

/// Slot IDs of a `sendStoredRawSequence` request.
pub type SlotSequence = heapless::Vec<SlotRef, SEQ_SIZE>;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryKind {
    /// Directory listing with sizes and usage.
    List,
    /// Chip and flash identification.
    SysInfo,
    Unknown,
}

/// Closed set of actions a message can request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    Reboot,
    WipeConfig,
    SystemQuery(QueryKind),
    SetRawMode(bool),
    SetAutoSendMode(bool),
    SendStoredSlot(SlotRef),
    SendStoredSequence(SlotSequence),
    StoreRaw { slot: SlotRef, ticks: Waveform },
    DeleteStoredSlot(SlotRef),
    SendGc(Waveform),
    SendRawTicks { ticks: Waveform, khz: u32 },
    SendEncoded { protocol: IrProtocol, value: u64, bits: u32 },
    /// One of the gateway's own publications looping back.
    OwnEcho,
    Unrecognized,
}

impl Command {
    /// Short name for log lines.
    pub fn name(&self) -> &'static str {
        match self {
            Self::Reboot => "reboot",
            Self::WipeConfig => "wipe",
            Self::SystemQuery(_) => "cmd",
            Self::SetRawMode(_) => "rawMode",
            Self::SetAutoSendMode(_) => "autoSendMode",
            Self::SendStoredSlot(_) => "sendStoredRaw",
            Self::SendStoredSequence(_) => "sendStoredRawSequence",
            Self::StoreRaw { .. } => "storeRaw",
            Self::DeleteStoredSlot(_) => "deleteRaw",
            Self::SendGc(_) => "sendGC",
            Self::SendRawTicks { .. } => "sendRAW",
            Self::SendEncoded { protocol, .. } => protocol.as_str(),
            Self::OwnEcho => "echo",
            Self::Unrecognized => "unrecognized",
        }
    }
}

/// A message whose numeric payload was malformed.  Dropped without reply.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ParseError {
    Rejected(CsvError),
}

impl fmt::Display for ParseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Rejected(e) => write!(f, "payload rejected: {}", e),
        }
    }
}

impl From<CsvError> for ParseError {
    fn from(e: CsvError) -> Self {
        Self::Rejected(e)
    }
}

/// Lenient decimal narrowed to a slot reference.  Values beyond `u32`
/// saturate, which keeps them out of range.
fn slot_ref(text: &[u8]) -> SlotRef {
    u32::try_from(codec::parse_decimal_lenient(text)).unwrap_or(u32::MAX)
}

fn is_own_echo(suffix: &str) -> bool {
    suffix == TOPIC_STATUS
        || (suffix.starts_with(TOPIC_SENDER)
            && (suffix.ends_with("/val") || suffix.ends_with("/result")))
}

/// Map one inbound message to a [`Command`].
pub fn parse(prefix: &str, topic: &str, payload: &[u8]) -> Result<Command, ParseError> {
    let Some(suffix) = topic.strip_prefix(prefix) else {
        return Ok(Command::Unrecognized);
    };
    if is_own_echo(suffix) {
        return Ok(Command::OwnEcho);
    }
    let Some(rest) = suffix.strip_prefix(TOPIC_SENDER) else {
        return Ok(Command::Unrecognized);
    };

    let cmd = match rest {
        "reboot" => Command::Reboot,
        "wipe" => Command::WipeConfig,
        "cmd" => Command::SystemQuery(match payload {
            b"ls" => QueryKind::List,
            b"sysinfo" => QueryKind::SysInfo,
            _ => QueryKind::Unknown,
        }),
        "rawMode" => Command::SetRawMode(codec::parse_bool(payload)),
        "autoSendMode" => Command::SetAutoSendMode(codec::parse_bool(payload)),
        "sendStoredRaw" => Command::SendStoredSlot(slot_ref(payload)),
        "sendStoredRawSequence" => Command::SendStoredSequence(codec::parse_csv(payload)?),
        "deleteRaw" => Command::DeleteStoredSlot(slot_ref(payload)),
        _ => parse_ir_topic(rest, payload)?,
    };
    Ok(cmd)
}

/// `kind[/bits[/extra]]` topics.
fn parse_ir_topic(rest: &str, payload: &[u8]) -> Result<Command, ParseError> {
    let mut segments = rest.splitn(3, '/');
    let kind = segments.next().unwrap_or_default();
    let bits = segments.next().unwrap_or_default().as_bytes();

    let cmd = match kind {
        "storeRaw" => Command::StoreRaw {
            slot: slot_ref(bits),
            ticks: codec::parse_csv(payload)?,
        },
        "sendGC" => Command::SendGc(codec::parse_csv(payload)?),
        "sendRAW" => {
            let mut ticks: Waveform = codec::parse_csv(payload)?;
            // Non-empty after validation, so a carrier element is always present.
            let khz = ticks.pop().unwrap_or_default();
            Command::SendRawTicks { ticks, khz }
        }
        other => match IrProtocol::from_kind(other) {
            Some(protocol) => Command::SendEncoded {
                protocol,
                value: codec::parse_decimal_lenient(payload),
                bits: codec::parse_decimal_lenient(bits) as u32,
            },
            None => Command::Unrecognized,
        },
    };
    Ok(cmd)
}

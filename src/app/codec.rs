//! Textual ↔ in-memory waveform conversion.
//!
//! Pure functions, no I/O.  Three textual forms exist on this device:
//!
//! | Form          | Example           | Used by                          |
//! |---------------|-------------------|----------------------------------|
//! | CSV payload   | `9000,4500,560,38`| `storeRaw`, `sendGC`, `sendRAW`, `sendStoredRawSequence`, `/receiver/raw` |
//! | lenient int   | `0x1F` → `0`      | encoded-protocol values, slot IDs, bit counts |
//! | slot record   | `9000\n4500\n38`  | `ir/<id>.dat` files              |
//!
//! CSV payloads are strict (a bad character rejects the whole message);
//! lenient integers stop at the first non-digit the way the broker-side
//! tooling has always expected.

use core::fmt;
use core::fmt::Write as _;

use crate::config::{TRANSMITTER_FREQ_KHZ, WAVE_CAPACITY};

/// Tick buffer sized for one slot (300 ticks plus the carrier element).
pub type Waveform = heapless::Vec<u32, WAVE_CAPACITY>;

/// Why a CSV payload was refused.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CsvError {
    Empty,
    /// A byte outside `[0-9,]`.
    InvalidChar,
    /// Payload begins or ends with a comma.
    DanglingComma,
    /// A field does not fit in `u32`.
    Overflow,
    /// More fields than the destination buffer holds.
    CapacityExceeded,
}

impl fmt::Display for CsvError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Empty => write!(f, "empty payload"),
            Self::InvalidChar => write!(f, "invalid character"),
            Self::DanglingComma => write!(f, "leading or trailing comma"),
            Self::Overflow => write!(f, "value does not fit u32"),
            Self::CapacityExceeded => write!(f, "too many values"),
        }
    }
}

/// Character-set and shape check shared by every CSV payload.
pub fn validate_csv(payload: &[u8]) -> Result<(), CsvError> {
    if payload.is_empty() {
        return Err(CsvError::Empty);
    }
    if !payload.iter().all(|b| b.is_ascii_digit() || *b == b',') {
        return Err(CsvError::InvalidChar);
    }
    if payload.first() == Some(&b',') || payload.last() == Some(&b',') {
        return Err(CsvError::DanglingComma);
    }
    Ok(())
}

/// Parse a comma-separated list of decimals into a bounded buffer.
///
/// Empty inner fields (`1,,2`) read as 0.  Never truncates: one value more
/// than `N` is [`CsvError::CapacityExceeded`].
pub fn parse_csv<const N: usize>(payload: &[u8]) -> Result<heapless::Vec<u32, N>, CsvError> {
    validate_csv(payload)?;
    let mut out = heapless::Vec::new();
    for field in payload.split(|b| *b == b',') {
        let mut value: u32 = 0;
        for digit in field {
            value = value
                .checked_mul(10)
                .and_then(|v| v.checked_add(u32::from(digit - b'0')))
                .ok_or(CsvError::Overflow)?;
        }
        out.push(value).map_err(|_| CsvError::CapacityExceeded)?;
    }
    Ok(out)
}

/// Base-10 prefix parse: stops at the first non-digit, wraps on overflow.
///
/// `"123abc"` → 123, `"abc"` → 0, `""` → 0.
pub fn parse_decimal_lenient(text: &[u8]) -> u64 {
    text.iter()
        .take_while(|b| b.is_ascii_digit())
        .fold(0u64, |acc, b| {
            acc.wrapping_mul(10).wrapping_add(u64::from(b - b'0'))
        })
}

/// `1`, `ON`, `true` are on; everything else is off.
pub fn parse_bool(payload: &[u8]) -> bool {
    matches!(payload, b"1" | b"ON" | b"true")
}

/// Join values as `a,b,c`.
pub fn format_csv(values: &[u32]) -> String {
    let mut s = String::with_capacity(values.len() * 6);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            s.push(',');
        }
        let _ = write!(s, "{}", v);
    }
    s
}

/// Split a stored frame into ticks and carrier kHz.
///
/// The last element is the carrier; 0 falls back to the transmitter default.
/// `None` when there is nothing to transmit.
pub fn split_frame(values: &[u32]) -> Option<(&[u32], u32)> {
    let (&khz, ticks) = values.split_last()?;
    if ticks.is_empty() {
        return None;
    }
    let khz = if khz == 0 { TRANSMITTER_FREQ_KHZ } else { khz };
    Some((ticks, khz))
}

// ───────────────────────────────────────────────────────────────
// Slot record format
// ───────────────────────────────────────────────────────────────

/// Serialise a slot record: one decimal per line, no trailing newline.
pub fn encode_record(values: &[u32]) -> String {
    let mut s = String::with_capacity(values.len() * 6);
    for (i, v) in values.iter().enumerate() {
        if i > 0 {
            s.push('\n');
        }
        let _ = write!(s, "{}", v);
    }
    s
}

/// Result of decoding a slot record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DecodedRecord {
    pub values: Waveform,
    /// Lines that did not fit in the buffer and were dropped.
    pub dropped: usize,
}

/// Parse a slot record, keeping the prefix that fits in a [`Waveform`].
///
/// Each line is read leniently; a trailing empty line (from a final `\n`)
/// is ignored.  `\r` line endings are tolerated.
pub fn decode_record(bytes: &[u8]) -> DecodedRecord {
    let mut values = Waveform::new();
    let mut dropped = 0usize;
    let body = bytes.strip_suffix(b"\n").unwrap_or(bytes);
    if body.is_empty() {
        return DecodedRecord { values, dropped };
    }
    for line in body.split(|b| *b == b'\n') {
        let line = line.strip_suffix(b"\r").unwrap_or(line);
        let v = parse_decimal_lenient(line) as u32;
        if values.push(v).is_err() {
            dropped += 1;
        }
    }
    DecodedRecord { values, dropped }
}

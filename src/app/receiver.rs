//! IR receive forwarding.
//!
//! Each online tick takes at most one capture from the demodulator and
//! publishes it:
//!
//! | Capture             | Topic                                        | Payload      |
//! |---------------------|----------------------------------------------|--------------|
//! | decoded             | `<prefix>/receiver/<PROTOCOL>/<bits>`        | value        |
//! | decoded, Panasonic  | `<prefix>/receiver/PANASONIC/<bits>/<addr>`  | value        |
//! | undecoded, raw mode | `<prefix>/receiver/raw`                      | CSV µs       |
//!
//! Undecoded captures are dropped while raw mode is off.

use core::fmt::Write as _;
use log::{debug, warn};

use super::codec;
use super::ports::{IrPort, Publisher, ReceivedIr, ReceivedProtocol};
use crate::config::TOPIC_RECEIVER;

/// Topic and payload for one capture, or `None` if it is not forwarded.
pub fn render(prefix: &str, raw_mode: bool, capture: &ReceivedIr) -> Option<(String, String)> {
    match capture {
        ReceivedIr::Decoded {
            protocol: ReceivedProtocol::Unknown,
            ..
        } => None,
        ReceivedIr::Decoded {
            protocol,
            bits,
            value,
            address,
        } => {
            let mut topic = format!("{}{}{}/{}", prefix, TOPIC_RECEIVER, protocol.as_str(), bits);
            if let Some(addr) = address {
                let _ = write!(topic, "/{}", addr);
            }
            Some((topic, value.to_string()))
        }
        ReceivedIr::Raw { durations_us } if raw_mode && !durations_us.is_empty() => Some((
            format!("{}{}raw", prefix, TOPIC_RECEIVER),
            codec::format_csv(durations_us),
        )),
        ReceivedIr::Raw { .. } => None,
    }
}

/// Forward one pending capture.  Returns `true` if something was published.
pub fn forward(
    prefix: &str,
    raw_mode: bool,
    ir: &mut impl IrPort,
    out: &mut impl Publisher,
) -> bool {
    let Some(capture) = ir.receive() else {
        return false;
    };
    let Some((topic, payload)) = render(prefix, raw_mode, &capture) else {
        debug!("Receiver: capture not forwarded");
        return false;
    };
    match out.publish(&topic, &payload, false) {
        Ok(()) => {
            debug!("Receiver: {} = {}", topic, payload);
            true
        }
        Err(e) => {
            warn!("Receiver: publish {} failed: {}", topic, e);
            false
        }
    }
}

//! IR captures forwarded to `<prefix>/receiver/...`.

use crate::mock_hw::{MemFs, MockMqtt, MockSettings};
use crate::rig::Rig;

use irtrans::app::ports::{ReceivedIr, ReceivedProtocol};

fn decoded(protocol: ReceivedProtocol, bits: u16, value: u64, address: Option<u32>) -> ReceivedIr {
    ReceivedIr::Decoded {
        protocol,
        bits,
        value,
        address,
    }
}

#[test]
fn decoded_captures_are_published() {
    let mut rig = Rig::online();
    rig.ir
        .captures
        .push_back(decoded(ReceivedProtocol::Nec, 32, 0x00FF_02FD, None));
    rig.ir
        .captures
        .push_back(decoded(ReceivedProtocol::Panasonic, 48, 0x0100_BCBD, Some(0x4004)));

    rig.advance(10);
    assert_eq!(rig.last_on("/receiver/NEC/32").as_deref(), Some("16712445"));
    assert_eq!(rig.ir.captures.len(), 1, "one capture per tick");

    rig.advance(10);
    assert_eq!(
        rig.last_on("/receiver/PANASONIC/48/16388").as_deref(),
        Some("16825533")
    );
}

#[test]
fn raw_captures_need_raw_mode() {
    let mut rig = Rig::online();
    let raw = ReceivedIr::Raw {
        durations_us: vec![9000, 4500, 560],
    };

    rig.ir.captures.push_back(raw.clone());
    rig.advance(10);
    assert!(rig.ir.captures.is_empty());
    assert_eq!(rig.last_on("/receiver/raw"), None);

    rig.send("/sender/rawMode", "1");
    rig.ir.captures.push_back(raw);
    rig.advance(10);
    assert_eq!(rig.last_on("/receiver/raw").as_deref(), Some("9000,4500,560"));
}

#[test]
fn unknown_decodes_are_dropped() {
    let mut rig = Rig::online();
    rig.send("/sender/rawMode", "1");
    let before = rig.mqtt().published.len();
    rig.ir
        .captures
        .push_back(decoded(ReceivedProtocol::Unknown, 0, 0, None));
    rig.advance(10);
    assert_eq!(rig.mqtt().published.len(), before);
}

#[test]
fn captures_stay_queued_while_offline() {
    let mut rig = Rig::boot(MemFs::new(), MockMqtt::failing(2), MockSettings::default());
    rig.ir
        .captures
        .push_back(decoded(ReceivedProtocol::Sony, 12, 2704, None));
    rig.tick();
    rig.advance(100);
    assert_eq!(rig.ir.captures.len(), 1);
}

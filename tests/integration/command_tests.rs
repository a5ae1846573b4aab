//! Inbound command → dispatcher → slot store / IR / reply topics.

use crate::mock_hw::{IrCall, MemFs};
use crate::rig::{fs_with_slots, Rig};

use irtrans::app::ports::IrProtocol;
use irtrans::session::SessionState;

// ── Slot storage ──────────────────────────────────────────────

#[test]
fn store_then_send_stored_slot() {
    let mut rig = Rig::online();

    rig.send("/sender/storeRaw/5", "9000,4500,560,38");
    assert_eq!(rig.fs().text("ir/5.dat").as_deref(), Some("9000\n4500\n560\n38"));

    let out = rig.send("/sender/sendStoredRaw", "5");
    assert!(out.transmitted);
    assert!(out.indicator, "LED lit during a transmission");
    assert_eq!(rig.ir.raw_sends(), vec![(vec![9000, 4500, 560], 38)]);
}

#[test]
fn malformed_csv_never_touches_the_slot() {
    let mut rig = Rig::online();
    rig.send("/sender/storeRaw/3", "100,200,38");

    for bad in ["100,x,38", ",100,38", "100,38,", "", "100 200", "-5,38", "99999999999,38"] {
        rig.send("/sender/storeRaw/3", bad);
        assert_eq!(
            rig.fs().text("ir/3.dat").as_deref(),
            Some("100\n200\n38"),
            "payload {:?} must be rejected",
            bad
        );
    }
    rig.send("/sender/storeRaw/4", "1,2,a");
    assert!(!rig.fs().files.contains_key("ir/4.dat"));
}

#[test]
fn second_store_fully_replaces_the_record() {
    let mut rig = Rig::online();
    for id in 1..=20u32 {
        rig.send(&format!("/sender/storeRaw/{}", id), &format!("{},1,2,3,38", id));
        rig.send(&format!("/sender/storeRaw/{}", id), "7,38");
        assert_eq!(
            rig.fs().text(&format!("ir/{}.dat", id)).as_deref(),
            Some("7\n38")
        );
    }
}

#[test]
fn store_outside_slot_range_is_ignored() {
    let mut rig = Rig::online();
    rig.send("/sender/storeRaw/0", "1,2,38");
    rig.send("/sender/storeRaw/21", "1,2,38");
    rig.send("/sender/storeRaw/abc", "1,2,38");
    assert!(rig.fs().files.is_empty());
}

#[test]
fn oversized_store_is_rejected_not_truncated() {
    let mut rig = Rig::online();
    let payload = vec!["10"; 302].join(",");
    rig.send("/sender/storeRaw/6", &payload);
    assert!(!rig.fs().files.contains_key("ir/6.dat"));

    let payload = vec!["10"; 301].join(",");
    rig.send("/sender/storeRaw/6", &payload);
    assert_eq!(rig.fs().text("ir/6.dat").map(|t| t.lines().count()), Some(301));
}

#[test]
fn send_stored_slot_out_of_range_never_transmits() {
    // Records exist on disk for 0 and 21; the range check must still hold.
    let fs = fs_with_slots(&[(0, "1\n2\n38"), (21, "1\n2\n38"), (1, "5\n6\n38")]);
    let mut rig = Rig::online_with(fs);

    for id in ["0", "21", "4294967295", "x"] {
        let out = rig.send("/sender/sendStoredRaw", id);
        assert!(!out.transmitted, "slot {:?}", id);
    }
    assert!(rig.ir.calls.is_empty());
}

#[test]
fn empty_slot_sends_nothing() {
    let mut rig = Rig::online();
    let out = rig.send("/sender/sendStoredRaw", "9");
    assert!(!out.transmitted);
    assert!(rig.ir.calls.is_empty());
}

#[test]
fn stored_zero_carrier_falls_back_to_38_khz() {
    let mut rig = Rig::online_with(fs_with_slots(&[(8, "100\n200\n0")]));
    rig.send("/sender/sendStoredRaw", "8");
    assert_eq!(rig.ir.raw_sends(), vec![(vec![100, 200], 38)]);
}

#[test]
fn sequence_skips_invalid_ids_in_order() {
    let fs = fs_with_slots(&[
        (3, "3\n33\n38"),
        (5, "5\n55\n36"),
        (7, "7\n77\n40"),
        (21, "21\n21\n38"),
    ]);
    let mut rig = Rig::online_with(fs);

    let out = rig.send("/sender/sendStoredRawSequence", "3,7,21,5");
    assert!(out.transmitted);
    assert_eq!(
        rig.ir.raw_sends(),
        vec![(vec![3, 33], 38), (vec![7, 77], 40), (vec![5, 55], 36)]
    );
}

#[test]
fn sequence_capacity_is_ten_ids() {
    let mut rig = Rig::online_with(fs_with_slots(&[(1, "1\n2\n38")]));

    rig.send("/sender/sendStoredRawSequence", "1,1,1,1,1,1,1,1,1,1");
    assert_eq!(rig.ir.raw_sends().len(), 10);

    rig.send("/sender/sendStoredRawSequence", "1,1,1,1,1,1,1,1,1,1,1");
    assert_eq!(rig.ir.raw_sends().len(), 10, "11 IDs are rejected whole");
}

#[test]
fn delete_removes_record() {
    let mut rig = Rig::online_with(fs_with_slots(&[(4, "1\n2\n38")]));
    rig.send("/sender/deleteRaw", "4");
    assert!(!rig.fs().files.contains_key("ir/4.dat"));

    // Deleting again is harmless.
    rig.send("/sender/deleteRaw", "4");
    assert!(rig.gw.session().is_online());
}

#[test]
fn default_slots_follow_store_and_delete() {
    let mut rig = Rig::online();
    assert!(rig.gw.scheduler().defaults().first.is_empty());

    rig.send("/sender/storeRaw/1", "10,20,38");
    rig.send("/sender/storeRaw/2", "30,40,50,38");
    assert_eq!(rig.gw.scheduler().defaults().first.as_slice(), &[10, 20, 38]);
    assert_eq!(rig.gw.scheduler().defaults().second.as_slice(), &[30, 40, 50, 38]);

    rig.send("/sender/deleteRaw", "1");
    assert!(rig.gw.scheduler().defaults().first.is_empty());
    assert_eq!(rig.gw.scheduler().defaults().second.len(), 4);
}

#[test]
fn non_default_slot_leaves_cache_alone() {
    let mut rig = Rig::online_with(fs_with_slots(&[(1, "1\n2\n38")]));
    rig.send("/sender/storeRaw/9", "5,6,38");
    assert_eq!(rig.gw.scheduler().defaults().first.as_slice(), &[1, 2, 38]);
}

// ── Immediate transmissions ───────────────────────────────────

#[test]
fn encoded_protocols_are_forwarded() {
    let mut rig = Rig::online();
    rig.send("/sender/NEC/32", "16712445");
    rig.send("/sender/SONY/12", "2704abc");
    rig.send("/sender/RC5", "12");
    assert_eq!(
        rig.ir.calls,
        vec![
            IrCall::Encoded { protocol: IrProtocol::Nec, value: 16_712_445, bits: 32 },
            IrCall::Encoded { protocol: IrProtocol::Sony, value: 2704, bits: 12 },
            IrCall::Encoded { protocol: IrProtocol::Rc5, value: 12, bits: 0 },
        ]
    );
}

#[test]
fn raw_and_gc_are_forwarded() {
    let mut rig = Rig::online();
    rig.send("/sender/sendRAW", "100,200,300,40");
    rig.send("/sender/sendGC", "38000,1,1,171,171,22,63,22,1720");
    assert_eq!(
        rig.ir.calls,
        vec![
            IrCall::Raw { ticks: vec![100, 200, 300], khz: 40 },
            IrCall::Gc(vec![38000, 1, 1, 171, 171, 22, 63, 22, 1720]),
        ]
    );
}

#[test]
fn unknown_kind_and_foreign_prefix_do_nothing() {
    let mut rig = Rig::online();
    let before = rig.mqtt().published.len();
    rig.send("/sender/PANASONIC/48", "1");
    rig.mqtt_mut().deliver("kitchen/sender/NEC/32", "1");
    rig.advance(10);
    assert!(rig.ir.calls.is_empty());
    assert_eq!(rig.mqtt().published.len(), before);
}

// ── Queries and modes ─────────────────────────────────────────

#[test]
fn list_reports_files_and_usage() {
    let fs = MemFs::new()
        .with_file("config.json", b"{}")
        .with_file("ir/1.dat", b"10\n20\n38");
    let mut rig = Rig::online_with(fs);
    rig.send("/sender/cmd", "ls");
    assert_eq!(
        rig.last_on("/sender/cmd/result").as_deref(),
        Some("/config.json=2;/ir/1.dat=8;Total bytes=1048576;Used bytes=10")
    );
}

#[test]
fn sysinfo_reports_chip_and_flash() {
    let mut rig = Rig::online();
    rig.send("/sender/cmd", "sysinfo");
    assert_eq!(
        rig.last_on("/sender/cmd/result").as_deref(),
        Some(
            "Chip id:abcdef;Flash id:1640ef;Flash real size:4194304;\
             Flash ide size:4194304;Flash ide mode:DIO;Flash Chip configuration:ok"
        )
    );

    rig.sys.chip.flash_config_size = 1_048_576;
    rig.send("/sender/cmd", "sysinfo");
    let reply = rig.last_on("/sender/cmd/result").unwrap_or_default();
    assert!(reply.ends_with("Flash Chip configuration:wrong"), "{}", reply);
}

#[test]
fn unknown_cmd_replies() {
    let mut rig = Rig::online();
    rig.send("/sender/cmd", "format");
    assert_eq!(rig.last_on("/sender/cmd/result").as_deref(), Some("command unknown"));
}

#[test]
fn raw_mode_echoes_without_persisting() {
    let mut rig = Rig::online();
    rig.send("/sender/rawMode", "ON");
    assert!(rig.gw.dispatcher().raw_mode());
    rig.send("/sender/rawMode", "on");
    assert!(!rig.gw.dispatcher().raw_mode());
    assert_eq!(rig.payloads_on("/sender/rawMode/val"), vec!["true", "false"]);
    assert_eq!(rig.settings.saves, 0);
}

#[test]
fn autosend_toggle_persists_each_command() {
    let mut rig = Rig::online();
    rig.send("/sender/autoSendMode", "true");
    rig.send("/sender/autoSendMode", "false");

    assert_eq!(rig.settings.saves, 2);
    assert_eq!(rig.settings.stored.map(|s| s.auto_send), Some(false));
    assert_eq!(rig.payloads_on("/sender/autoSendMode/val"), vec!["true", "false"]);
    assert!(!rig.gw.dispatcher().auto_send());
}

#[test]
fn own_echoes_are_ignored() {
    let mut rig = Rig::online();
    let before = rig.mqtt().published.len();
    rig.send("/sender/rawMode/val", "true");
    rig.send("/sender/autoSendMode/val", "true");
    rig.send("/sender/cmd/result", "ls");
    rig.send("/status", "true");
    assert!(!rig.gw.dispatcher().raw_mode());
    assert!(!rig.gw.dispatcher().auto_send());
    assert_eq!(rig.mqtt().published.len(), before);
    assert_eq!(rig.settings.saves, 0);
}

// ── Lifecycle commands ────────────────────────────────────────

#[test]
fn wipe_removes_only_config() {
    let fs = MemFs::new()
        .with_file("config.json", b"{}")
        .with_file("ir/3.dat", b"1\n38");
    let mut rig = Rig::online_with(fs);
    rig.send("/sender/wipe", "");
    assert!(!rig.fs().files.contains_key("config.json"));
    assert!(rig.fs().files.contains_key("ir/3.dat"));
}

#[test]
fn reboot_requests_restart_and_closes_session() {
    let mut rig = Rig::online();
    let out = rig.send("/sender/reboot", "");
    assert!(out.restart);
    assert_eq!(rig.mqtt().disconnects, 1);
    assert_eq!(rig.gw.session().state(), SessionState::Disconnected);
}

#[test]
fn one_command_per_tick() {
    let mut rig = Rig::online();
    rig.mqtt_mut().deliver("irgw/sender/rawMode", "1");
    rig.mqtt_mut().deliver("irgw/sender/autoSendMode", "1");

    rig.advance(10);
    assert!(rig.gw.dispatcher().raw_mode());
    assert!(!rig.gw.dispatcher().auto_send());

    rig.advance(10);
    assert!(rig.gw.dispatcher().auto_send());
}

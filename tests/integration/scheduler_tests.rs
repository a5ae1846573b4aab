//! Button and autosend transmissions through the full tick loop.

use crate::rig::{fs_with_slots, Rig};

use irtrans::config::{DEFAULT_AUTOSEND_INTERVAL_MS, SECOND_CODE_DELAY_MS};

const INTERVAL: u64 = DEFAULT_AUTOSEND_INTERVAL_MS;

fn defaults_fs() -> crate::mock_hw::MemFs {
    fs_with_slots(&[(1, "100\n200\n38"), (2, "300\n400\n36")])
}

fn first() -> (Vec<u32>, u32) {
    (vec![100, 200], 38)
}

fn second() -> (Vec<u32>, u32) {
    (vec![300, 400], 36)
}

#[test]
fn press_and_release_send_the_default_pair() {
    let mut rig = Rig::online_autosend(defaults_fs());

    // Press lands on the tick the autostart falls due.
    rig.pressed = true;
    let out = rig.advance_to(INTERVAL);
    assert!(out.transmitted);
    assert_eq!(rig.ir.raw_sends(), vec![first()]);

    rig.pressed = false;
    rig.advance(60);
    assert_eq!(rig.ir.raw_sends(), vec![first(), second()]);

    // No autostart or second code leaks out of that tick.
    rig.advance(SECOND_CODE_DELAY_MS);
    rig.advance_to(2 * INTERVAL - 1);
    assert_eq!(rig.ir.raw_sends().len(), 2);
    assert!(!rig.gw.scheduler().second_code_pending());
}

#[test]
fn button_bounce_is_ignored() {
    let mut rig = Rig::online_with(defaults_fs());
    rig.pressed = true;
    rig.advance(10);
    rig.pressed = false;
    rig.advance(10);
    rig.pressed = true;
    rig.advance(10);
    assert_eq!(rig.ir.raw_sends(), vec![first()]);
}

#[test]
fn button_works_with_autosend_off() {
    let mut rig = Rig::online_with(defaults_fs());
    assert!(!rig.gw.dispatcher().auto_send());
    rig.pressed = true;
    rig.advance(10);
    rig.pressed = false;
    rig.advance(100);
    assert_eq!(rig.ir.raw_sends(), vec![first(), second()]);
}

#[test]
fn autosend_cycle_sends_first_then_second() {
    let mut rig = Rig::online_autosend(defaults_fs());

    rig.advance_to(INTERVAL - 1);
    assert!(rig.ir.calls.is_empty());

    let out = rig.advance_to(INTERVAL);
    assert!(out.transmitted);
    assert_eq!(rig.ir.raw_sends(), vec![first()]);

    rig.advance_to(INTERVAL + SECOND_CODE_DELAY_MS - 1);
    assert_eq!(rig.ir.raw_sends().len(), 1);
    rig.advance_to(INTERVAL + SECOND_CODE_DELAY_MS);
    assert_eq!(rig.ir.raw_sends(), vec![first(), second()]);

    // Timer restarted at the first code.
    rig.advance_to(2 * INTERVAL - 1);
    assert_eq!(rig.ir.raw_sends().len(), 2);
    rig.advance_to(2 * INTERVAL);
    assert_eq!(rig.ir.raw_sends(), vec![first(), second(), first()]);
}

#[test]
fn autosend_off_never_fires() {
    let mut rig = Rig::online_with(defaults_fs());
    for t in (0..=3 * INTERVAL).step_by(10_000) {
        rig.advance_to(t);
    }
    assert!(rig.ir.calls.is_empty());
}

#[test]
fn autosend_enabled_over_mqtt_starts_cycling() {
    let mut rig = Rig::online_with(defaults_fs());
    rig.send("/sender/autoSendMode", "1");
    rig.advance_to(INTERVAL);
    assert_eq!(rig.ir.raw_sends(), vec![first()]);
}

#[test]
fn autosend_with_empty_defaults_is_silent() {
    let mut rig = Rig::online_autosend(crate::mock_hw::MemFs::new());
    let out = rig.advance_to(INTERVAL);
    assert!(!out.transmitted);
    assert!(!out.indicator);
    rig.advance_to(INTERVAL + SECOND_CODE_DELAY_MS);
    assert!(rig.ir.calls.is_empty());
}

#[test]
fn button_runs_while_offline() {
    let mut rig = Rig::boot(
        defaults_fs(),
        crate::mock_hw::MockMqtt::failing(u32::MAX),
        Default::default(),
    );
    rig.tick();
    rig.advance(5_000);
    assert!(!rig.gw.session().is_online());

    rig.pressed = true;
    let out = rig.advance(10);
    assert!(out.transmitted);
    assert_eq!(rig.ir.raw_sends(), vec![first()]);
}

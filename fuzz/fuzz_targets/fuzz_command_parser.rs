//! Fuzz target: `commands::parse`
//!
//! Splits the input into a topic suffix and a payload and asserts that the
//! parser never panics and never yields a buffer above its capacity.
//!
//! cargo fuzz run fuzz_command_parser

#![no_main]

use irtrans::app::commands::{self, Command};
use irtrans::config::{SEQ_SIZE, WAVE_CAPACITY};
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    // First byte picks the split point between topic and payload.
    let Some((&split, rest)) = data.split_first() else {
        return;
    };
    let at = usize::from(split).min(rest.len());
    let (suffix, payload) = rest.split_at(at);
    let topic = format!("irgw/sender/{}", String::from_utf8_lossy(suffix));

    match commands::parse("irgw", &topic, payload) {
        Ok(Command::SendStoredSequence(ids)) => assert!(ids.len() <= SEQ_SIZE),
        Ok(Command::StoreRaw { ticks, .. }) | Ok(Command::SendGc(ticks)) => {
            assert!(!ticks.is_empty() && ticks.len() <= WAVE_CAPACITY);
        }
        Ok(Command::SendRawTicks { ticks, .. }) => assert!(ticks.len() < WAVE_CAPACITY),
        _ => {}
    }
});

//! Fuzz target: `codec::decode_record`
//!
//! Feeds arbitrary file contents to the slot record decoder, as a damaged
//! flash filesystem might, and checks the kept/dropped accounting.
//!
//! cargo fuzz run fuzz_slot_record

#![no_main]

use irtrans::app::codec;
use irtrans::config::WAVE_CAPACITY;
use libfuzzer_sys::fuzz_target;

fuzz_target!(|data: &[u8]| {
    let rec = codec::decode_record(data);
    assert!(rec.values.len() <= WAVE_CAPACITY);
    if rec.dropped > 0 {
        assert_eq!(rec.values.len(), WAVE_CAPACITY);
    }

    // Re-encoding what was kept must decode to the same values.
    let again = codec::decode_record(codec::encode_record(&rec.values).as_bytes());
    assert_eq!(again.values, rec.values);
    assert_eq!(again.dropped, 0);
});

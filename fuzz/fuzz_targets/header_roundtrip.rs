#![no_main]

use libfuzzer_sys::fuzz_target;
use pcx_wire::{decode_header, encode_header, MAX_FRAME_LEN};

// Fuzz target: encode_header -> decode_header roundtrip, and rejection
// of lengths that do not fit a signed 32-bit field.
fuzz_target!(|length: u32| {
    match encode_header(length) {
        Ok(header) => assert_eq!(decode_header(&header).unwrap(), length),
        Err(_) => assert!(length > MAX_FRAME_LEN),
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcx_wire::{decode_header, encode_header, HEADER_SIZE, MAX_FRAME_LEN};

// Fuzz target: frame header parsing.
//
// Any accepted header must be within range and re-encode to the same
// eight bytes.
fuzz_target!(|data: &[u8]| {
    if let Ok(length) = decode_header(data) {
        assert!(length <= MAX_FRAME_LEN);
        assert_eq!(encode_header(length).unwrap()[..], data[..HEADER_SIZE]);
    }
});

#![no_main]

use libfuzzer_sys::fuzz_target;
use pcx_wire::{Frames, HEADER_SIZE};

// Fuzz target: in-memory frame iteration.
//
// Catches bugs in:
// - Truncated headers and payloads
// - Lengths near the int32 limit
// - Offset bookkeeping across many frames
fuzz_target!(|data: &[u8]| {
    let mut frames = Frames::new(data);
    let mut expected_offset = 0;
    for frame in frames.by_ref() {
        let Ok((offset, payload)) = frame else { break };
        assert_eq!(offset, expected_offset);
        expected_offset += HEADER_SIZE + payload.len();
    }
    assert!(frames.offset() <= data.len());
});

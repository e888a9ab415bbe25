#![no_main]

use libfuzzer_sys::fuzz_target;
use pcx_decoder::decompress_block;

// Fuzz target: single-frame Deflate decoding with a size limit.
//
// Whatever the input, decoding must return without panicking and never
// produce more than the limit.
fuzz_target!(|data: &[u8]| {
    const LIMIT: usize = 1 << 20;
    if let Ok(out) = decompress_block(data, Some(LIMIT)) {
        assert!(out.len() <= LIMIT);
    }
});

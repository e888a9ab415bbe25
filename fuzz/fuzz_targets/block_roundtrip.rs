#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;
use pcx_decoder::decompress_block;
use pcx_encoder::compress_block;
use pcx_types::CompressionLevel;
use pcx_wire::{write_frame, Frames};

#[derive(Arbitrary, Debug)]
struct Input {
    level: u8,
    blocks: Vec<Vec<u8>>,
}

// Fuzz target: compress_block -> frame -> Frames -> decompress_block.
//
// Every block must come back byte-for-byte, in order.
fuzz_target!(|input: Input| {
    let level = match input.level % 4 {
        0 => CompressionLevel::NoCompression,
        1 => CompressionLevel::Fastest,
        2 => CompressionLevel::Optimal,
        _ => CompressionLevel::SmallestSize,
    };

    let mut wire = Vec::new();
    for block in &input.blocks {
        let packed = compress_block(block, level).unwrap();
        write_frame(&mut wire, &packed).unwrap();
    }

    let restored: Vec<Vec<u8>> = Frames::new(&wire)
        .map(|frame| decompress_block(frame.unwrap().1, None).unwrap())
        .collect();
    assert_eq!(restored, input.blocks);
});

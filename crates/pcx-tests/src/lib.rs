//! Shared fixtures for the PCX integration tests, benches and the golden
//! file generator.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use pcx_types::SharedProgress;
use pcx_wire::write_frame;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Payloads of the three frames in `tests/golden/hello.pcx`.
pub const HELLO_BLOCKS: [&[u8]; 3] = [b"Hello, ", b"parallel ", b"world!\n"];

/// Deterministic, compressible test data.
///
/// Bytes are drawn from a small alphabet with occasional runs, so
/// Deflate gets real work without the output collapsing to nothing.
pub fn sample_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = Vec::with_capacity(len);
    while out.len() < len {
        let byte = b"pcx-stream "[rng.gen_range(0..11)];
        let run = if rng.gen_bool(0.1) { rng.gen_range(2..40) } else { 1 };
        out.extend(std::iter::repeat_n(byte, run.min(len - out.len())));
    }
    out
}

/// Uniformly random bytes. Deflate cannot shrink these.
pub fn random_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let mut out = vec![0u8; len];
    rng.fill(&mut out[..]);
    out
}

/// "Randomized but repeating" content: one random line repeated with a
/// varying prefix.
pub fn repeating_data(len: usize, seed: u64) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    let line: Vec<u8> = (0..64).map(|_| rng.gen_range(b'a'..=b'z')).collect();
    let mut out = Vec::with_capacity(len + 80);
    let mut n = 0u32;
    while out.len() < len {
        out.extend_from_slice(format!("{n:08} ").as_bytes());
        out.extend_from_slice(&line);
        out.push(b'\n');
        n += 1;
    }
    out.truncate(len);
    out
}

/// A raw Deflate stream holding `data` in stored (uncompressed) blocks.
///
/// Every Deflate decoder must accept this, and the bytes are fully
/// determined by the input, which makes it the encoding used for
/// committed fixtures.
pub fn stored_deflate(data: &[u8]) -> Vec<u8> {
    const MAX_STORED: usize = 0xFFFF;

    let mut out = Vec::with_capacity(data.len() + 5 * (data.len() / MAX_STORED + 1));
    let mut chunks = data.chunks(MAX_STORED).peekable();
    if chunks.peek().is_none() {
        out.extend_from_slice(&[0x01, 0x00, 0x00, 0xFF, 0xFF]);
        return out;
    }
    while let Some(chunk) = chunks.next() {
        let last = chunks.peek().is_none();
        // BFINAL in bit 0, BTYPE 00 (stored); the rest of the byte pads.
        out.push(u8::from(last));
        let len = u16::try_from(chunk.len()).unwrap_or(u16::MAX);
        out.extend_from_slice(&len.to_le_bytes());
        out.extend_from_slice(&(!len).to_le_bytes());
        out.extend_from_slice(chunk);
    }
    out
}

/// Frame each block's stored Deflate encoding into one PCX stream.
pub fn stored_stream(blocks: &[&[u8]]) -> Vec<u8> {
    let mut out = Vec::new();
    for block in blocks {
        write_frame(&mut out, &stored_deflate(block)).expect("writing to a Vec cannot fail");
    }
    out
}

/// Directory holding the committed binary fixtures.
pub fn golden_dir() -> PathBuf {
    Path::new(env!("CARGO_MANIFEST_DIR")).join("tests/golden")
}

/// Read `tests/golden/<name>`.
pub fn golden(name: &str) -> Vec<u8> {
    let path = golden_dir().join(name);
    std::fs::read(&path)
        .unwrap_or_else(|e| panic!("failed to read golden fixture {}: {e}", path.display()))
}

/// Progress sink that records every report.
pub fn progress_recorder() -> (SharedProgress, Arc<Mutex<Vec<f64>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = {
        let seen = Arc::clone(&seen);
        move |p: f64| seen.lock().expect("progress lock poisoned").push(p)
    };
    (Arc::new(sink), seen)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn stored_deflate_splits_long_input() {
        let data = vec![3u8; 0xFFFF + 10];
        let encoded = stored_deflate(&data);
        // Two block headers of five bytes each.
        assert_eq!(encoded.len(), data.len() + 10);
        assert_eq!(encoded[0], 0x00);
        assert_eq!(encoded[5 + 0xFFFF], 0x01);
    }

    #[test]
    fn sample_data_is_deterministic() {
        assert_eq!(sample_data(5000, 1), sample_data(5000, 1));
        assert_ne!(sample_data(5000, 1), sample_data(5000, 2));
        assert_eq!(repeating_data(777, 3).len(), 777);
    }
}

use std::io::{self, Write};

use flate2::Compression;
use flate2::write::DeflateEncoder;
use pcx_types::{Block, CompressionLevel};

/// Compress a byte slice into a raw Deflate stream (RFC 1951, no zlib
/// or gzip wrapper).
///
/// Each block is a complete, independent Deflate stream, so any frame
/// can be decompressed without the ones before it.
///
/// # Example
///
/// ```rust
/// use pcx_encoder::compress_block;
/// use pcx_types::CompressionLevel;
///
/// let data = "fn main() { }\n".repeat(100);
/// let compressed = compress_block(data.as_bytes(), CompressionLevel::Optimal).unwrap();
/// assert!(compressed.len() < data.len());
/// ```
///
/// # Errors
///
/// Returns the codec's I/O error. Writing into a `Vec` does not fail in
/// practice, but the encoder API is fallible.
pub fn compress_block(data: &[u8], level: CompressionLevel) -> io::Result<Vec<u8>> {
    let mut encoder = DeflateEncoder::new(
        Vec::with_capacity(data.len() / 2 + 64),
        Compression::new(level.as_u32()),
    );
    encoder.write_all(data)?;
    encoder.finish()
}

/// Stage transform: compress the payload, keep the progress value.
pub(crate) fn compress(block: &Block, level: CompressionLevel) -> io::Result<Block> {
    let compressed = compress_block(block.payload(), level)?;
    Ok(block.map_payload(compressed))
}

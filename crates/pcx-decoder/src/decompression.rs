use flate2::{Decompress, FlushDecompress, Status};
use pcx_types::Block;

/// Output buffer growth step, and the floor for the first allocation.
const GROW_STEP: usize = 32 * 1024;

/// Why a single frame payload could not be inflated.
#[derive(Debug, thiserror::Error)]
pub enum InflateError {
    /// The bytes are not a valid raw Deflate stream.
    #[error("corrupt deflate stream")]
    Corrupt(#[source] flate2::DecompressError),

    /// The stream stopped before its final block.
    #[error("deflate stream ends early after {produced} output bytes")]
    Truncated { produced: usize },

    /// Output would exceed the caller's per-block limit.
    #[error("decompressed size exceeds limit {limit}")]
    TooLarge { limit: usize },
}

/// Inflate one raw Deflate stream (RFC 1951).
///
/// `max_len` bounds the decompressed size; decoding stops as soon as the
/// output would pass it, so a small hostile frame cannot make the
/// decoder allocate without limit. Bytes after the end of the Deflate
/// stream are ignored.
///
/// # Errors
///
/// - [`InflateError::Corrupt`] for malformed input.
/// - [`InflateError::Truncated`] if the input ends mid-stream.
/// - [`InflateError::TooLarge`] if the output passes `max_len`.
pub fn decompress_block(data: &[u8], max_len: Option<usize>) -> Result<Vec<u8>, InflateError> {
    let limit = max_len.unwrap_or(usize::MAX);
    let mut inflater = Decompress::new(false);
    let mut out = Vec::with_capacity(
        data.len()
            .saturating_mul(3)
            .max(GROW_STEP)
            .min(limit.saturating_add(1)),
    );

    loop {
        let offset = usize::try_from(inflater.total_in()).unwrap_or(data.len());
        let before = (inflater.total_in(), inflater.total_out());

        let status = inflater
            .decompress_vec(&data[offset..], &mut out, FlushDecompress::None)
            .map_err(InflateError::Corrupt)?;

        if out.len() > limit {
            return Err(InflateError::TooLarge { limit });
        }
        if status == Status::StreamEnd {
            return Ok(out);
        }

        if out.len() == out.capacity() {
            // Never reserve past limit + 1, which is enough to detect overflow.
            let room = out
                .capacity()
                .max(GROW_STEP)
                .min(limit.saturating_add(1) - out.len());
            out.reserve(room);
        } else if before == (inflater.total_in(), inflater.total_out()) {
            return Err(InflateError::Truncated {
                produced: out.len(),
            });
        }
    }
}

/// Stage transform: inflate the payload, keep the progress value.
pub(crate) fn decompress(block: &Block, max_len: Option<usize>) -> Result<Block, InflateError> {
    let raw = decompress_block(block.payload(), max_len)?;
    Ok(block.map_payload(raw))
}

use crate::error::WireError;

/// Total header size in bytes (fixed).
pub const HEADER_SIZE: usize = 8;

/// Largest payload length a frame may declare.
///
/// The length field is a signed 32-bit integer in the PCX format, so
/// anything above `i32::MAX` cannot be represented by other readers.
#[allow(clippy::cast_sign_loss)]
pub const MAX_FRAME_LEN: u32 = i32::MAX as u32;

/// Frame header: the 8 bytes in front of every compressed block.
///
/// ```text
/// ┌────────┬─────────┬──────────────────────────────────────────┐
/// │ Offset │ Size    │ Description                              │
/// ├────────┼─────────┼──────────────────────────────────────────┤
/// │ 0x00   │ 4 bytes │ Payload length, little-endian            │
/// │ 0x04   │ 4 bytes │ Bitwise NOT of the length, little-endian │
/// └────────┴─────────┴──────────────────────────────────────────┘
/// ```
///
/// The complement is a cheap self-check: it catches a truncated,
/// misaligned or bit-flipped header without the cost of a checksum.
/// It says nothing about the payload itself.
///
/// # Errors
///
/// Returns [`WireError::LengthOutOfRange`] if `length` exceeds
/// [`MAX_FRAME_LEN`].
pub fn encode_header(length: u32) -> Result<[u8; HEADER_SIZE], WireError> {
    if length > MAX_FRAME_LEN {
        return Err(WireError::LengthOutOfRange {
            length: u64::from(length),
            limit: u64::from(MAX_FRAME_LEN),
        });
    }

    let mut buf = [0u8; HEADER_SIZE];
    buf[0..4].copy_from_slice(&length.to_le_bytes());
    buf[4..8].copy_from_slice(&(!length).to_le_bytes());
    Ok(buf)
}

/// Parse and verify a frame header from the first 8 bytes of `buf`.
///
/// Returns the declared payload length.
///
/// # Errors
///
/// - [`WireError::TruncatedHeader`] if `buf` holds fewer than 8 bytes.
/// - [`WireError::ComplementMismatch`] if the self-check fails.
/// - [`WireError::LengthOutOfRange`] if the length is above [`MAX_FRAME_LEN`].
pub fn decode_header(buf: &[u8]) -> Result<u32, WireError> {
    if buf.len() < HEADER_SIZE {
        return Err(WireError::TruncatedHeader { read: buf.len() });
    }

    let length = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
    let complement = u32::from_le_bytes([buf[4], buf[5], buf[6], buf[7]]);

    if complement != !length {
        return Err(WireError::ComplementMismatch { length, complement });
    }

    // A consistent header can still carry a negative int32 length.
    if length > MAX_FRAME_LEN {
        return Err(WireError::LengthOutOfRange {
            length: u64::from(length),
            limit: u64::from(MAX_FRAME_LEN),
        });
    }

    Ok(length)
}

use crate::error::WireError;
use crate::header::{HEADER_SIZE, decode_header, encode_header};

/// Write one frame (header + payload) to the provided writer.
///
/// Wire layout written:
///   1. payload length as little-endian u32
///   2. bitwise NOT of the length as little-endian u32
///   3. payload bytes
///
/// # Returns
///
/// Total number of bytes written.
///
/// # Errors
///
/// - [`WireError::LengthOutOfRange`] if the payload is larger than
///   [`MAX_FRAME_LEN`](crate::header::MAX_FRAME_LEN).
/// - [`WireError::Io`] if the writer fails.
pub fn write_frame(w: &mut impl std::io::Write, payload: &[u8]) -> Result<usize, WireError> {
    let header = encode_header(payload_len(payload)?)?;
    w.write_all(&header)?;
    w.write_all(payload)?;
    Ok(HEADER_SIZE + payload.len())
}

/// Read one frame from the front of `buf`.
///
/// # Returns
///
/// `Some((payload, bytes_consumed))` for a complete frame, or `None`
/// when `buf` is empty. End of stream is the absence of another header,
/// not a sentinel value.
///
/// # Errors
///
/// - [`WireError::TruncatedHeader`] if 1..=7 bytes remain.
/// - [`WireError::ComplementMismatch`] if the header self-check fails.
/// - [`WireError::TruncatedPayload`] if the payload is cut short.
pub fn read_frame(buf: &[u8]) -> Result<Option<(&[u8], usize)>, WireError> {
    if buf.is_empty() {
        return Ok(None);
    }

    let length = decode_header(buf)? as usize;
    let body = &buf[HEADER_SIZE..];
    if body.len() < length {
        return Err(WireError::TruncatedPayload {
            expected: length,
            actual: body.len(),
        });
    }

    Ok(Some((&body[..length], HEADER_SIZE + length)))
}

pub(crate) fn payload_len(payload: &[u8]) -> Result<u32, WireError> {
    u32::try_from(payload.len()).map_err(|_| WireError::LengthOutOfRange {
        length: payload.len() as u64,
        limit: u64::from(crate::header::MAX_FRAME_LEN),
    })
}

/// Iterator over the frames of an in-memory PCX stream.
///
/// Yields `(offset, payload)` pairs where `offset` is the position of the
/// frame header in the original buffer. After the first error the
/// iterator is exhausted.
///
/// ```rust
/// use pcx_wire::{Frames, write_frame};
///
/// let mut buf = Vec::new();
/// write_frame(&mut buf, b"first").unwrap();
/// write_frame(&mut buf, b"second").unwrap();
///
/// let payloads: Vec<_> = Frames::new(&buf).map(|f| f.unwrap().1).collect();
/// assert_eq!(payloads, vec![&b"first"[..], &b"second"[..]]);
/// ```
pub struct Frames<'a> {
    buf: &'a [u8],
    offset: usize,
    failed: bool,
}

impl<'a> Frames<'a> {
    #[must_use]
    pub fn new(buf: &'a [u8]) -> Self {
        Self {
            buf,
            offset: 0,
            failed: false,
        }
    }

    /// Byte offset of the next frame header.
    #[must_use]
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl<'a> Iterator for Frames<'a> {
    type Item = Result<(usize, &'a [u8]), WireError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        match read_frame(&self.buf[self.offset..]) {
            Ok(Some((payload, consumed))) => {
                let start = self.offset;
                self.offset += consumed;
                Some(Ok((start, payload)))
            }
            Ok(None) => None,
            Err(e) => {
                self.failed = true;
                Some(Err(e))
            }
        }
    }
}

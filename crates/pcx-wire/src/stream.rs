use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};

use crate::error::WireError;
use crate::frame::payload_len;
use crate::header::{HEADER_SIZE, MAX_FRAME_LEN, decode_header, encode_header};

/// Asynchronous frame reader. Pulls one framed payload at a time from
/// any `AsyncRead` source.
///
/// The reader only touches the source when [`next_frame`](Self::next_frame)
/// is awaited, so a caller that stops asking stops reading. It keeps a
/// running count of consumed bytes, which the decompression pipeline
/// turns into a progress fraction when the total length is known.
///
/// End of stream is a clean zero-byte read where the next header would
/// start. A header that starts but does not finish is an error.
pub struct FrameReader<R> {
    reader: R,
    consumed: u64,
    max_frame_len: u32,
}

impl<R: AsyncRead + Unpin> FrameReader<R> {
    #[must_use]
    pub fn new(reader: R) -> Self {
        Self {
            reader,
            consumed: 0,
            max_frame_len: MAX_FRAME_LEN,
        }
    }

    /// Reject frames declaring more than `limit` payload bytes.
    ///
    /// Protects against allocating for absurd lengths that happen to
    /// carry a consistent complement.
    #[must_use]
    pub fn with_max_frame_len(mut self, limit: u32) -> Self {
        self.max_frame_len = limit.min(MAX_FRAME_LEN);
        self
    }

    /// Total bytes consumed from the source so far (headers included).
    pub fn bytes_consumed(&self) -> u64 {
        self.consumed
    }

    /// Read the next frame payload.
    ///
    /// Returns `Ok(None)` at end of stream.
    ///
    /// # Errors
    ///
    /// - [`WireError::TruncatedHeader`] if the source ends inside a header.
    /// - [`WireError::ComplementMismatch`] if the header self-check fails.
    /// - [`WireError::LengthOutOfRange`] if the length exceeds the limit.
    /// - [`WireError::TruncatedPayload`] if the source ends inside a payload.
    /// - [`WireError::Io`] on read failure.
    pub async fn next_frame(&mut self) -> Result<Option<Vec<u8>>, WireError> {
        let mut header = [0u8; HEADER_SIZE];
        let mut filled = 0;
        while filled < HEADER_SIZE {
            let n = self.reader.read(&mut header[filled..]).await?;
            if n == 0 {
                break;
            }
            filled += n;
        }
        self.consumed += filled as u64;

        if filled == 0 {
            return Ok(None);
        }

        let length = decode_header(&header[..filled])?;
        if length > self.max_frame_len {
            return Err(WireError::LengthOutOfRange {
                length: u64::from(length),
                limit: u64::from(self.max_frame_len),
            });
        }

        // Grow with the data actually received instead of trusting the
        // header for the allocation size.
        let mut payload = Vec::with_capacity((length as usize).min(1 << 20));
        let read = (&mut self.reader)
            .take(u64::from(length))
            .read_to_end(&mut payload)
            .await?;
        self.consumed += read as u64;

        if read < length as usize {
            return Err(WireError::TruncatedPayload {
                expected: length as usize,
                actual: read,
            });
        }

        Ok(Some(payload))
    }

    pub fn into_inner(self) -> R {
        self.reader
    }
}

/// Asynchronous frame writer, the serial end of the compression
/// pipeline.
pub struct FrameWriter<W> {
    writer: W,
    written: u64,
}

impl<W: AsyncWrite + Unpin> FrameWriter<W> {
    #[must_use]
    pub fn new(writer: W) -> Self {
        Self { writer, written: 0 }
    }

    /// Write header and payload for one block.
    ///
    /// # Errors
    ///
    /// - [`WireError::LengthOutOfRange`] if the payload is too large.
    /// - [`WireError::Io`] if the writer fails.
    pub async fn write_frame(&mut self, payload: &[u8]) -> Result<usize, WireError> {
        let header = encode_header(payload_len(payload)?)?;
        self.writer.write_all(&header).await?;
        self.writer.write_all(payload).await?;

        let n = HEADER_SIZE + payload.len();
        self.written += n as u64;
        Ok(n)
    }

    /// # Errors
    ///
    /// Returns [`WireError::Io`] if the writer fails to flush.
    pub async fn flush(&mut self) -> Result<(), WireError> {
        self.writer.flush().await?;
        Ok(())
    }

    /// Total bytes written so far (headers included).
    pub fn bytes_written(&self) -> u64 {
        self.written
    }

    pub fn get_ref(&self) -> &W {
        &self.writer
    }

    pub fn into_inner(self) -> W {
        self.writer
    }
}

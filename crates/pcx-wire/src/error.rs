/// Errors raised while encoding or decoding PCX wire frames.
///
/// Every variant except `Io` means the byte stream is malformed. None of
/// them is retryable: re-reading a corrupt stream yields the same bytes.
///
/// ```text
///   WireError
///   ├── ComplementMismatch   ← header self-check failed
///   ├── TruncatedHeader      ← 1..=7 header bytes before end of input
///   ├── TruncatedPayload     ← fewer payload bytes than the header declared
///   ├── LengthOutOfRange     ← length does not fit a signed 32-bit field
///   └── Io(std::io::Error)   ← from the underlying reader/writer
/// ```
#[derive(Debug, thiserror::Error)]
pub enum WireError {
    /// The complement field is not the bitwise NOT of the length field.
    #[error("frame header self-check failed: length {length:#010X}, complement {complement:#010X}")]
    ComplementMismatch { length: u32, complement: u32 },

    /// Input ended part-way through an 8-byte frame header.
    #[error("truncated frame header: got {read} of 8 bytes")]
    TruncatedHeader { read: usize },

    /// Input ended before the declared payload length was read.
    #[error("truncated frame payload: expected {expected} bytes, got {actual}")]
    TruncatedPayload { expected: usize, actual: usize },

    /// Payload length exceeds what the header (or the caller's limit) allows.
    #[error("frame length {length} exceeds limit {limit}")]
    LengthOutOfRange { length: u64, limit: u64 },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl WireError {
    /// True for errors that indicate a malformed stream rather than an
    /// I/O failure.
    #[must_use]
    pub fn is_format_error(&self) -> bool {
        !matches!(self, Self::Io(_))
    }
}

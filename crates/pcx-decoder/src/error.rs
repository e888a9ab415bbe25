use pcx_stage::OutputError;
use pcx_wire::WireError;

use crate::decompression::InflateError;

/// Errors that can occur while decompressing a PCX stream.
///
/// Error hierarchy:
///
/// ```text
///   DecodeError
///   ├── Format(WireError)          ← bad header, truncated frame, oversized length
///   ├── Codec { sequence }         ← a frame payload is not valid Deflate
///   ├── DecompressionBomb          ← a frame inflates past the configured limit
///   ├── Cancelled                  ← the CancelToken fired
///   ├── WorkerLost { sequence }    ← a decompression worker panicked
///   ├── ReaderLost                 ← the reader task panicked
///   └── Io(std::io::Error)         ← reading the source failed
/// ```
///
/// Format errors are fatal: nothing after the bad frame is decoded, and
/// there is no attempt to resynchronise. Every block before it is still
/// delivered first.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    #[error("stream is not well-formed: {0}")]
    Format(WireError),

    #[error("failed to decompress block {sequence}")]
    Codec {
        sequence: u64,
        #[source]
        source: InflateError,
    },

    #[error("block {sequence} decompresses to more than {limit} bytes")]
    DecompressionBomb { sequence: u64, limit: usize },

    #[error("decompression cancelled")]
    Cancelled,

    #[error("decompression worker for block {sequence} exited without a result")]
    WorkerLost { sequence: u64 },

    #[error("decompression reader task terminated unexpectedly")]
    ReaderLost,

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DecodeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }

    /// True for errors caused by the bytes of the stream rather than by
    /// the environment.
    pub fn is_format_error(&self) -> bool {
        matches!(
            self,
            Self::Format(_) | Self::Codec { .. } | Self::DecompressionBomb { .. }
        )
    }
}

impl From<WireError> for DecodeError {
    fn from(err: WireError) -> Self {
        match err {
            WireError::Io(e) => Self::Io(e),
            other => Self::Format(other),
        }
    }
}

impl From<OutputError<InflateError>> for DecodeError {
    fn from(err: OutputError<InflateError>) -> Self {
        match err {
            OutputError::Transform {
                sequence,
                source: InflateError::TooLarge { limit },
            } => Self::DecompressionBomb { sequence, limit },
            OutputError::Transform { sequence, source } => Self::Codec { sequence, source },
            OutputError::WorkerLost { sequence } => Self::WorkerLost { sequence },
            OutputError::Cancelled => Self::Cancelled,
        }
    }
}

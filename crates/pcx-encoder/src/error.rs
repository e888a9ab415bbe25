use pcx_stage::{OutputError, SubmitError};
use pcx_wire::WireError;

/// Errors that can occur while compressing a stream.
///
/// Error hierarchy:
///
/// ```text
///   EncodeError
///   ├── Codec { sequence }     ← Deflate failed on one block
///   ├── Wire(WireError)        ← frame could not be encoded, written or flushed
///   ├── Cancelled              ← the CancelToken fired
///   ├── Stage(SubmitError)     ← submit after complete()
///   ├── WorkerLost { sequence }← a compression worker panicked
///   └── WriterLost             ← the writer task panicked or was aborted
/// ```
///
/// Errors are reported once, in block order: a codec failure on block
/// `k` is returned only after blocks `0..k` have been written.
#[derive(Debug, thiserror::Error)]
pub enum EncodeError {
    #[error("failed to compress block {sequence}")]
    Codec {
        sequence: u64,
        #[source]
        source: std::io::Error,
    },

    #[error(transparent)]
    Wire(#[from] WireError),

    #[error("compression cancelled")]
    Cancelled,

    #[error("compression pipeline does not accept input: {0}")]
    Stage(SubmitError),

    #[error("compression worker for block {sequence} exited without a result")]
    WorkerLost { sequence: u64 },

    #[error("compression writer task terminated unexpectedly")]
    WriterLost,
}

impl EncodeError {
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled)
    }
}

impl From<OutputError<std::io::Error>> for EncodeError {
    fn from(err: OutputError<std::io::Error>) -> Self {
        match err {
            OutputError::Transform { sequence, source } => Self::Codec { sequence, source },
            OutputError::WorkerLost { sequence } => Self::WorkerLost { sequence },
            OutputError::Cancelled => Self::Cancelled,
        }
    }
}

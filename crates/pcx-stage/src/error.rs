/// Why a block could not be submitted to an ordered stage.
///
/// ```text
///   SubmitError
///   ├── Completed   ← complete() was already called
///   ├── Faulted     ← a transform failed; the stage admits nothing more
///   ├── Closed      ← the output half was dropped
///   └── Cancelled   ← the pipeline's CancelToken fired
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum SubmitError {
    #[error("stage is draining and no longer accepts input")]
    Completed,

    #[error("stage faulted after a transform error")]
    Faulted,

    #[error("stage output was dropped")]
    Closed,

    #[error("operation cancelled")]
    Cancelled,
}

/// Why an ordered stage could not produce its next output.
///
/// The transform error is surfaced exactly once, at the position in the
/// output order where the failed block would have appeared.
#[derive(Debug, thiserror::Error)]
pub enum OutputError<E> {
    #[error("transform failed for block {sequence}")]
    Transform {
        sequence: u64,
        #[source]
        source: E,
    },

    /// The worker for this block panicked before producing a result.
    #[error("worker for block {sequence} exited without a result")]
    WorkerLost { sequence: u64 },

    #[error("operation cancelled")]
    Cancelled,
}

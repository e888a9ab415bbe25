use bytes::Bytes;

/// The unit of work flowing through a pipeline: a byte payload plus an
/// optional progress fraction.
///
/// A block is immutable once built. Stages hand blocks to each other by
/// value, so at any moment exactly one stage owns a given block and no
/// locking is needed around its contents. `Bytes` keeps clones cheap when
/// a caller does want to hold on to a payload.
///
/// `progress` is only known when the producer knows the total length of
/// its source (a file, an in-memory buffer). For network streams it is
/// `None`, and the adapter layer issues the final `1.0` report itself.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Block {
    payload: Bytes,
    progress: Option<f64>,
}

impl Block {
    /// Create a block with no progress information.
    pub fn new(payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            progress: None,
        }
    }

    /// Create a block carrying a progress fraction, clamped to `[0, 1]`.
    pub fn with_progress(payload: impl Into<Bytes>, progress: Option<f64>) -> Self {
        Self {
            payload: payload.into(),
            progress: progress.map(|p| p.clamp(0.0, 1.0)),
        }
    }

    /// Build the block that replaces `self` after a transform, keeping
    /// the progress value unchanged.
    #[must_use]
    pub fn map_payload(&self, payload: impl Into<Bytes>) -> Self {
        Self {
            payload: payload.into(),
            progress: self.progress,
        }
    }

    pub fn payload(&self) -> &Bytes {
        &self.payload
    }

    pub fn progress(&self) -> Option<f64> {
        self.progress
    }

    pub fn len(&self) -> usize {
        self.payload.len()
    }

    pub fn is_empty(&self) -> bool {
        self.payload.is_empty()
    }

    pub fn into_payload(self) -> Bytes {
        self.payload
    }
}

use pcx_stage::{StageInput, StageOutput, SubmitError, ordered_stage};
use pcx_types::{Block, CancelToken, CompressionLevel, PipelineConfig, PipelineState, SharedProgress};
use pcx_wire::FrameWriter;
use tokio::io::AsyncWrite;
use tokio::task::JoinHandle;
use tracing::{debug, trace};

use crate::compression::compress;
use crate::error::EncodeError;

/// Settings for a [`CompressPipeline`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct EncoderOptions {
    pub level: CompressionLevel,
    pub pipeline: PipelineConfig,
}

/// What the writer task put on the wire.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct WriteStats {
    pub frames: u64,
    /// Headers plus payloads.
    pub bytes_written: u64,
}

/// Parallel block compressor writing PCX frames to an async destination.
///
/// ```text
///   submit(raw) ──▶ ordered stage (Deflate × N) ──▶ writer task ──▶ destination
///                                                     │
///                                                     └──▶ progress.report(p)
/// ```
///
/// The caller chops the input into blocks and submits them in order;
/// the pipeline compresses them concurrently and a single writer task
/// emits one frame per block in submission order. The destination is
/// owned by the writer task until [`finish`](Self::finish) hands it back.
///
/// Dropping an unfinished pipeline aborts the writer and discards any
/// blocks not yet written.
pub struct CompressPipeline<W> {
    input: StageInput,
    writer: Option<JoinHandle<Result<(W, WriteStats), EncodeError>>>,
    state: PipelineState,
}

impl<W> CompressPipeline<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// Start the worker pool and the writer task.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        destination: W,
        options: &EncoderOptions,
        progress: SharedProgress,
        cancel: CancelToken,
    ) -> Self {
        let level = options.level;
        let (input, output) = ordered_stage(options.pipeline, cancel.clone(), move |block: Block| {
            compress(&block, level)
        });
        let writer = tokio::spawn(write_frames(output, destination, progress, cancel));

        debug!(
            %level,
            workers = options.pipeline.degree_of_parallelism,
            capacity = options.pipeline.capacity,
            "compression pipeline started"
        );

        Self {
            input,
            writer: Some(writer),
            state: PipelineState::Open,
        }
    }

    /// Queue one raw block for compression.
    ///
    /// Suspends while the pipeline is full.
    ///
    /// # Errors
    ///
    /// - [`EncodeError::Cancelled`] if the token fires.
    /// - [`EncodeError::Stage`] after [`complete`](Self::complete).
    /// - Whatever stopped the writer (I/O failure, codec failure) once it
    ///   has stopped. That error is returned by the first failing call;
    ///   later calls report [`SubmitError::Completed`].
    pub async fn submit(&mut self, block: Block) -> Result<(), EncodeError> {
        match self.input.submit(block).await {
            Ok(sequence) => {
                trace!(sequence, "raw block queued");
                Ok(())
            }
            Err(SubmitError::Cancelled) => {
                self.state.advance(PipelineState::Draining);
                Err(EncodeError::Cancelled)
            }
            Err(SubmitError::Completed) => Err(EncodeError::Stage(SubmitError::Completed)),
            Err(SubmitError::Faulted | SubmitError::Closed) => Err(self.writer_failure().await),
        }
    }

    /// No more blocks will be submitted.
    pub fn complete(&mut self) {
        self.input.complete();
        self.state.advance(PipelineState::Draining);
    }

    /// Complete the pipeline, wait for every frame to be written and the
    /// destination flushed, and return the destination.
    ///
    /// The destination is not shut down.
    ///
    /// # Errors
    ///
    /// The first error hit by the writer or by any block's compression.
    pub async fn finish(self) -> Result<W, EncodeError> {
        self.finish_with_stats().await.map(|(destination, _)| destination)
    }

    /// Like [`finish`](Self::finish), also reporting what was written.
    ///
    /// # Errors
    ///
    /// Same as [`finish`](Self::finish).
    pub async fn finish_with_stats(mut self) -> Result<(W, WriteStats), EncodeError> {
        self.complete();
        let writer = self.writer.take().ok_or(EncodeError::WriterLost)?;
        let result = writer.await.map_err(|_| EncodeError::WriterLost);
        self.state.advance(PipelineState::Closed);
        result?
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Blocks accepted so far.
    pub fn submitted(&self) -> u64 {
        self.input.submitted()
    }

    /// The writer has stopped; collect its error.
    async fn writer_failure(&mut self) -> EncodeError {
        self.complete();
        let Some(writer) = self.writer.take() else {
            return EncodeError::Stage(SubmitError::Completed);
        };
        let error = match writer.await {
            Ok(Err(e)) => e,
            Ok(Ok(_)) | Err(_) => EncodeError::WriterLost,
        };
        self.state.advance(PipelineState::Closed);
        error
    }
}

impl<W> Drop for CompressPipeline<W> {
    fn drop(&mut self) {
        if let Some(writer) = self.writer.take() {
            debug!("compression pipeline dropped before finish, aborting writer");
            writer.abort();
        }
    }
}

/// Serial writer: one frame per compressed block, in order.
/// Pending writes are abandoned when the token fires.
async fn write_frames<W>(
    mut output: StageOutput<std::io::Error>,
    destination: W,
    progress: SharedProgress,
    cancel: CancelToken,
) -> Result<(W, WriteStats), EncodeError>
where
    W: AsyncWrite + Unpin,
{
    let mut writer = FrameWriter::new(destination);
    let mut frames = 0u64;
    let mut reported = 0.0f64;

    while let Some((sequence, block)) = output.next_output().await? {
        let n = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EncodeError::Cancelled),
            n = writer.write_frame(block.payload()) => n?,
        };
        frames += 1;
        trace!(sequence, frame_len = n, "frame written");

        if let Some(p) = block.progress() {
            if p >= reported {
                reported = p;
                progress.report(p);
            }
        }
    }

    tokio::select! {
        biased;
        () = cancel.cancelled() => return Err(EncodeError::Cancelled),
        flushed = writer.flush() => flushed?,
    }
    let stats = WriteStats {
        frames,
        bytes_written: writer.bytes_written(),
    };
    debug!(frames, bytes = stats.bytes_written, "compression writer finished");
    Ok((writer.into_inner(), stats))
}

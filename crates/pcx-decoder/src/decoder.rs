use pcx_stage::{StageInput, StageOutput, SubmitError, ordered_stage};
use pcx_types::progress::fraction;
use pcx_types::{Block, CancelToken, PipelineConfig, PipelineState};
use pcx_wire::{FrameReader, MAX_FRAME_LEN};
use tokio::io::AsyncRead;
use tokio::task::JoinHandle;
use tracing::{debug, trace, warn};

use crate::decompression::{InflateError, decompress};
use crate::error::DecodeError;

/// Settings for a [`DecompressPipeline`].
///
/// ```text
/// ┌───────────────┬──────────────────────────────────────────────────────┐
/// │ Field         │ Purpose                                              │
/// ├───────────────┼──────────────────────────────────────────────────────┤
/// │ pipeline      │ worker count and queue depth                         │
/// │ source_len    │ compressed length, if known; enables progress values │
/// │ max_frame_len │ largest compressed frame accepted                    │
/// │ max_block_len │ largest decompressed block accepted (None = no cap)  │
/// └───────────────┴──────────────────────────────────────────────────────┘
/// ```
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecoderOptions {
    pub pipeline: PipelineConfig,
    pub source_len: Option<u64>,
    pub max_frame_len: u32,
    pub max_block_len: Option<usize>,
}

impl Default for DecoderOptions {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            source_len: None,
            max_frame_len: MAX_FRAME_LEN,
            max_block_len: None,
        }
    }
}

/// What the reader task consumed from the source.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ReadStats {
    pub frames: u64,
    /// Headers plus payloads.
    pub bytes_read: u64,
}

/// Parallel block decompressor reading PCX frames from an async source.
///
/// ```text
///   source ──▶ reader task ──▶ ordered stage (Inflate × N) ──▶ next_output()
///              (frames)                                       (raw blocks, in order)
/// ```
///
/// A single reader task owns the source, validates each frame header and
/// feeds the payloads to the worker pool. Blocks come back from
/// [`next_output`](Self::next_output) in stream order. A malformed frame
/// is reported after every block that precedes it.
///
/// Dropping the pipeline stops the reader and discards pending blocks.
pub struct DecompressPipeline {
    output: StageOutput<InflateError>,
    reader: Option<JoinHandle<Result<ReadStats, DecodeError>>>,
    stop: CancelToken,
    state: PipelineState,
    stats: Option<ReadStats>,
}

impl DecompressPipeline {
    /// Start the reader task and the worker pool.
    ///
    /// `cancel` is observed by every suspension point; it is never fired
    /// by the pipeline itself.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<R>(source: R, options: &DecoderOptions, cancel: CancelToken) -> Self
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        let max_block_len = options.max_block_len;
        let (input, output) = ordered_stage(options.pipeline, cancel.clone(), move |block: Block| {
            decompress(&block, max_block_len)
        });

        let stop = CancelToken::new();
        let reader = tokio::spawn(read_frames(
            source,
            input,
            *options,
            cancel,
            stop.clone(),
        ));

        debug!(
            workers = options.pipeline.degree_of_parallelism,
            capacity = options.pipeline.capacity,
            source_len = options.source_len,
            "decompression pipeline started"
        );

        Self {
            output,
            reader: Some(reader),
            stop,
            state: PipelineState::Open,
            stats: None,
        }
    }

    /// Next decompressed block in stream order, or `None` at the end of
    /// the stream.
    ///
    /// Each returned block carries the compressed-stream progress at the
    /// moment its frame was read, when the source length is known.
    ///
    /// # Errors
    ///
    /// The first error of the stream, reported once. After an error the
    /// pipeline is closed and returns `Ok(None)`.
    pub async fn next_output(&mut self) -> Result<Option<Block>, DecodeError> {
        if self.state == PipelineState::Closed {
            return Ok(None);
        }

        match self.output.next_output().await {
            Ok(Some((sequence, block))) => {
                trace!(sequence, len = block.len(), "block decompressed");
                Ok(Some(block))
            }
            Ok(None) => {
                // The stage drains once the reader gives up its input half,
                // either at end of stream or on a format error.
                self.state.advance(PipelineState::Draining);
                let result = self.join_reader().await;
                self.state.advance(PipelineState::Closed);
                result.map(|()| None)
            }
            Err(e) => {
                self.stop.cancel();
                self.state.advance(PipelineState::Draining);
                let _ = self.join_reader().await;
                self.state.advance(PipelineState::Closed);
                Err(e.into())
            }
        }
    }

    /// Stop reading, wait for the reader task to exit and discard
    /// everything not yet returned.
    ///
    /// Blocks currently being decompressed finish on the blocking pool
    /// after this returns; their output is dropped.
    pub async fn close(&mut self) {
        if self.state == PipelineState::Closed {
            return;
        }

        self.stop.cancel();
        self.state.advance(PipelineState::Draining);
        if let Err(e) = self.join_reader().await {
            debug!(error = %e, "reader error ignored while closing");
        }
        let discarded = self.output.discard_remaining().await;
        self.state.advance(PipelineState::Closed);
        debug!(discarded, "decompression pipeline closed");
    }

    pub fn state(&self) -> PipelineState {
        self.state
    }

    /// Reader totals, available once the stream has been read to its end.
    pub fn read_stats(&self) -> Option<ReadStats> {
        self.stats
    }

    async fn join_reader(&mut self) -> Result<(), DecodeError> {
        let Some(reader) = self.reader.take() else {
            return Ok(());
        };
        match reader.await {
            Ok(Ok(stats)) => {
                debug!(
                    frames = stats.frames,
                    bytes = stats.bytes_read,
                    "decompression reader finished"
                );
                self.stats = Some(stats);
                Ok(())
            }
            Ok(Err(e)) => Err(e),
            Err(_) => Err(DecodeError::ReaderLost),
        }
    }
}

impl Drop for DecompressPipeline {
    fn drop(&mut self) {
        self.stop.cancel();
    }
}

/// Serial reader: one block per frame, submitted in stream order.
///
/// Stage rejections are not an error here: the stage reports its own
/// failure to the consumer.
async fn read_frames<R>(
    source: R,
    mut input: StageInput,
    options: DecoderOptions,
    cancel: CancelToken,
    stop: CancelToken,
) -> Result<ReadStats, DecodeError>
where
    R: AsyncRead + Unpin,
{
    let mut reader = FrameReader::new(source).with_max_frame_len(options.max_frame_len);
    let mut frames = 0u64;
    let stats = |reader: &FrameReader<R>, frames| ReadStats {
        frames,
        bytes_read: reader.bytes_consumed(),
    };

    loop {
        let frame = tokio::select! {
            biased;
            () = stop.cancelled() => return Ok(stats(&reader, frames)),
            () = cancel.cancelled() => return Err(DecodeError::Cancelled),
            frame = reader.next_frame() => frame,
        };

        let payload = match frame {
            Ok(Some(payload)) => payload,
            Ok(None) => {
                input.complete();
                return Ok(stats(&reader, frames));
            }
            Err(e) => {
                warn!(
                    frame = frames,
                    offset = reader.bytes_consumed(),
                    error = %e,
                    "malformed frame, stopping"
                );
                return Err(e.into());
            }
        };

        let progress = fraction(reader.bytes_consumed(), options.source_len);
        let block = Block::with_progress(payload, progress);

        let submitted = tokio::select! {
            biased;
            () = stop.cancelled() => return Ok(stats(&reader, frames)),
            submitted = input.submit(block) => submitted,
        };
        match submitted {
            Ok(sequence) => {
                trace!(sequence, "frame submitted");
                frames += 1;
            }
            Err(SubmitError::Cancelled) => return Err(DecodeError::Cancelled),
            Err(e) => {
                debug!(error = %e, "stage stopped accepting frames");
                return Ok(stats(&reader, frames));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::Compression;
    use flate2::write::DeflateEncoder;
    use pcx_wire::{WireError, write_frame};
    use std::io::Write;

    fn deflate(data: &[u8]) -> Vec<u8> {
        let mut encoder = DeflateEncoder::new(Vec::new(), Compression::fast());
        encoder.write_all(data).unwrap();
        encoder.finish().unwrap()
    }

    fn stream(blocks: &[Vec<u8>]) -> Vec<u8> {
        let mut out = Vec::new();
        for block in blocks {
            write_frame(&mut out, &deflate(block)).unwrap();
        }
        out
    }

    fn blocks(count: u8) -> Vec<Vec<u8>> {
        (0..count)
            .map(|i| vec![i; 300 + usize::from(i) * 101])
            .collect()
    }

    fn options(workers: usize) -> DecoderOptions {
        DecoderOptions {
            pipeline: PipelineConfig::with_parallelism(workers),
            ..DecoderOptions::default()
        }
    }

    async fn collect(pipeline: &mut DecompressPipeline) -> (Vec<Block>, Option<DecodeError>) {
        let mut out = Vec::new();
        loop {
            match pipeline.next_output().await {
                Ok(Some(block)) => out.push(block),
                Ok(None) => return (out, None),
                Err(e) => return (out, Some(e)),
            }
        }
    }

    #[tokio::test]
    async fn blocks_come_back_in_stream_order() {
        let raw = blocks(30);
        let bytes = stream(&raw);
        let mut pipeline = DecompressPipeline::new(
            std::io::Cursor::new(bytes),
            &options(4),
            CancelToken::new(),
        );

        let (out, error) = collect(&mut pipeline).await;
        assert!(error.is_none());
        let payloads: Vec<Vec<u8>> = out.iter().map(|b| b.payload().to_vec()).collect();
        assert_eq!(payloads, raw);
        assert_eq!(pipeline.state(), PipelineState::Closed);
    }

    #[tokio::test]
    async fn progress_tracks_compressed_bytes_consumed() {
        let bytes = stream(&blocks(4));
        let total = bytes.len() as u64;
        let opts = DecoderOptions {
            source_len: Some(total),
            ..options(2)
        };
        let mut pipeline =
            DecompressPipeline::new(std::io::Cursor::new(bytes), &opts, CancelToken::new());

        let (out, _) = collect(&mut pipeline).await;
        let progress: Vec<f64> = out.iter().map(|b| b.progress().unwrap()).collect();
        assert_eq!(progress.len(), 4);
        assert!(progress.windows(2).all(|w| w[0] < w[1]));
        assert!((progress[3] - 1.0).abs() < f64::EPSILON);
    }

    #[tokio::test]
    async fn empty_source_is_an_empty_stream() {
        let mut pipeline =
            DecompressPipeline::new(&b""[..], &options(2), CancelToken::new());
        assert!(pipeline.next_output().await.unwrap().is_none());
        assert!(pipeline.next_output().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn corrupt_header_surfaces_after_preceding_blocks() {
        let raw = blocks(3);
        let mut bytes = stream(&raw);
        let third = stream(&raw[..2]).len();
        bytes[third + 5] ^= 0x10;

        let mut pipeline = DecompressPipeline::new(
            std::io::Cursor::new(bytes),
            &options(3),
            CancelToken::new(),
        );
        let (out, error) = collect(&mut pipeline).await;
        assert_eq!(out.len(), 2);
        assert!(matches!(
            error,
            Some(DecodeError::Format(WireError::ComplementMismatch { .. }))
        ));
        assert!(pipeline.next_output().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn partial_trailing_header_is_a_format_error() {
        let mut bytes = stream(&blocks(2));
        bytes.extend_from_slice(&[0x10, 0x00, 0x00]);

        let mut pipeline = DecompressPipeline::new(
            std::io::Cursor::new(bytes),
            &options(2),
            CancelToken::new(),
        );
        let (out, error) = collect(&mut pipeline).await;
        assert_eq!(out.len(), 2);
        assert!(matches!(
            error,
            Some(DecodeError::Format(WireError::TruncatedHeader { read: 3 }))
        ));
    }

    #[tokio::test]
    async fn invalid_deflate_payload_is_a_codec_error() {
        let mut bytes = stream(&blocks(1));
        write_frame(&mut bytes, &[0xFF; 32]).unwrap();
        bytes.extend(stream(&blocks(2)));

        let mut pipeline = DecompressPipeline::new(
            std::io::Cursor::new(bytes),
            &options(2),
            CancelToken::new(),
        );
        let (out, error) = collect(&mut pipeline).await;
        assert_eq!(out.len(), 1);
        assert!(matches!(error, Some(DecodeError::Codec { sequence: 1, .. })));
    }

    #[tokio::test]
    async fn oversized_block_is_rejected() {
        let bytes = stream(&[vec![0u8; 64 * 1024]]);
        let opts = DecoderOptions {
            max_block_len: Some(1024),
            ..options(1)
        };
        let mut pipeline =
            DecompressPipeline::new(std::io::Cursor::new(bytes), &opts, CancelToken::new());

        let (_, error) = collect(&mut pipeline).await;
        assert!(matches!(
            error,
            Some(DecodeError::DecompressionBomb {
                sequence: 0,
                limit: 1024
            })
        ));
    }

    #[tokio::test]
    async fn oversized_frame_is_rejected_before_reading_payload() {
        let bytes = stream(&[vec![1u8; 10_000]]);
        let declared = u32::from_le_bytes(bytes[..4].try_into().unwrap());
        let opts = DecoderOptions {
            max_frame_len: declared - 1,
            ..options(1)
        };
        let mut pipeline =
            DecompressPipeline::new(std::io::Cursor::new(bytes), &opts, CancelToken::new());

        let (out, error) = collect(&mut pipeline).await;
        assert!(out.is_empty());
        assert!(matches!(
            error,
            Some(DecodeError::Format(WireError::LengthOutOfRange { .. }))
        ));
    }

    #[tokio::test]
    async fn close_mid_stream_reaches_closed() {
        let bytes = stream(&blocks(60));
        let mut pipeline = DecompressPipeline::new(
            std::io::Cursor::new(bytes),
            &DecoderOptions {
                pipeline: PipelineConfig::with_parallelism(2).capacity(2),
                ..DecoderOptions::default()
            },
            CancelToken::new(),
        );

        assert!(pipeline.next_output().await.unwrap().is_some());
        pipeline.close().await;
        assert_eq!(pipeline.state(), PipelineState::Closed);
        assert!(pipeline.next_output().await.unwrap().is_none());
    }

    #[tokio::test]
    async fn cancellation_is_reported() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let mut pipeline = DecompressPipeline::new(
            std::io::Cursor::new(stream(&blocks(5))),
            &options(2),
            cancel,
        );
        assert!(pipeline.next_output().await.unwrap_err().is_cancelled());
        assert_eq!(pipeline.state(), PipelineState::Closed);
    }
}

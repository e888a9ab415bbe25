use std::sync::Arc;

use pcx_decoder::{DecodeError, DecompressPipeline};
use pcx_encoder::{CompressPipeline, EncodeError};
use pcx_types::progress::fraction;
use pcx_types::{Block, CancelToken, SharedProgress};
use tokio::io::{AsyncRead, AsyncReadExt, AsyncWrite, AsyncWriteExt};
use tracing::debug;

use crate::config::{CompressOptions, DecompressOptions};
use crate::error::DriverError;

/// Totals for one copy operation.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct CopyStats {
    pub blocks: u64,
    pub bytes_read: u64,
    pub bytes_written: u64,
}

/// Read `source` to its end and write it compressed to `destination`.
///
/// The source is consumed in `block_size` chunks, each filled completely
/// unless the source ends first. Chunks are compressed in parallel and
/// framed in order. Copying starts at the source's current position.
///
/// Progress:
/// - with `options.source_len` set, one report per block with the share
///   of the source consumed when the block was read;
/// - always a final `report(1.0)` once everything is written.
///
/// The destination is returned after it has been flushed, and shut down
/// first if `options.leave_open` is false.
///
/// # Errors
///
/// - [`DriverError::Argument`] for invalid options, before anything is
///   read.
/// - [`DriverError::Io`] if reading the source fails.
/// - [`DriverError::Encode`] for pipeline failures, including
///   cancellation.
pub async fn compress_parallel_to<R, W>(
    source: &mut R,
    destination: W,
    options: &CompressOptions,
    progress: SharedProgress,
    cancel: CancelToken,
) -> Result<(W, CopyStats), DriverError>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin + Send + 'static,
{
    options.validate()?;

    let mut pipeline = CompressPipeline::new(
        destination,
        &options.encoder_options(),
        Arc::clone(&progress),
        cancel.clone(),
    );

    let mut consumed = 0u64;
    loop {
        let chunk = tokio::select! {
            biased;
            () = cancel.cancelled() => return Err(EncodeError::Cancelled.into()),
            chunk = read_block(source, options.block_size) => chunk?,
        };
        if chunk.is_empty() {
            break;
        }

        consumed += chunk.len() as u64;
        let block = Block::with_progress(chunk, fraction(consumed, options.source_len));
        pipeline.submit(block).await?;
    }

    let (mut destination, written) = pipeline.finish_with_stats().await?;
    if !options.leave_open {
        destination.shutdown().await?;
    }
    progress.report(1.0);

    let stats = CopyStats {
        blocks: written.frames,
        bytes_read: consumed,
        bytes_written: written.bytes_written,
    };
    debug!(?stats, "compressed copy finished");
    Ok((destination, stats))
}

/// Read a PCX stream from `source` and write the decompressed bytes to
/// `destination`.
///
/// The source is owned by the pipeline's reader task for the duration of
/// the copy. Progress is reported per block when `options.source_len` is
/// set, then `report(1.0)` at the end.
///
/// # Errors
///
/// - [`DriverError::Argument`] for invalid options.
/// - [`DriverError::Decode`] for malformed input, codec failures and
///   cancellation. Everything before the bad frame has been written by
///   then.
/// - [`DriverError::Io`] if writing the destination fails.
pub async fn decompress_parallel_to<R, W>(
    source: R,
    destination: &mut W,
    options: &DecompressOptions,
    progress: SharedProgress,
    cancel: CancelToken,
) -> Result<CopyStats, DriverError>
where
    R: AsyncRead + Unpin + Send + 'static,
    W: AsyncWrite + Unpin,
{
    options.validate()?;

    let mut pipeline = DecompressPipeline::new(source, &options.decoder_options(), cancel.clone());
    let mut stats = CopyStats::default();

    while let Some(block) = pipeline.next_output().await? {
        tokio::select! {
            biased;
            () = cancel.cancelled() => {
                pipeline.close().await;
                return Err(DecodeError::Cancelled.into());
            }
            written = destination.write_all(block.payload()) => written?,
        }
        stats.blocks += 1;
        stats.bytes_written += block.len() as u64;
        if let Some(p) = block.progress() {
            progress.report(p);
        }
    }

    destination.flush().await?;
    if !options.leave_open {
        destination.shutdown().await?;
    }
    progress.report(1.0);

    stats.bytes_read = pipeline.read_stats().map_or(0, |s| s.bytes_read);
    debug!(?stats, "decompressed copy finished");
    Ok(stats)
}

/// Read up to `size` bytes, stopping short only at end of input.
pub(crate) async fn read_block<R>(source: &mut R, size: usize) -> std::io::Result<Vec<u8>>
where
    R: AsyncRead + Unpin,
{
    let mut buf = Vec::with_capacity(size);
    source.take(size as u64).read_to_end(&mut buf).await?;
    Ok(buf)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcx_types::{CompressionLevel, NoProgress, PipelineConfig};
    use pcx_wire::Frames;
    use rand::{Rng, SeedableRng};
    use std::io::Cursor;
    use std::pin::Pin;
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::task::{Context, Poll};

    fn sample(len: usize) -> Vec<u8> {
        // Compressible but not trivial.
        let mut rng = rand::rngs::StdRng::seed_from_u64(7);
        (0..len).map(|_| b"abcdefgh"[rng.gen_range(0..8)]).collect()
    }

    fn compress_options(block_size: usize) -> CompressOptions {
        CompressOptions {
            block_size,
            pipeline: PipelineConfig::with_parallelism(4),
            ..CompressOptions::default()
        }
    }

    fn recorder() -> (SharedProgress, Arc<Mutex<Vec<f64>>>) {
        let seen = Arc::new(Mutex::new(Vec::new()));
        let sink = {
            let seen = Arc::clone(&seen);
            move |p: f64| seen.lock().unwrap().push(p)
        };
        (Arc::new(sink), seen)
    }

    async fn compress(data: &[u8], options: &CompressOptions) -> Vec<u8> {
        let (out, _) = compress_parallel_to(
            &mut &data[..],
            Vec::new(),
            options,
            Arc::new(NoProgress),
            CancelToken::new(),
        )
        .await
        .unwrap();
        out
    }

    #[tokio::test]
    async fn roundtrip_through_both_copies() {
        let data = sample(300_000);
        let compressed = compress(&data, &compress_options(16 * 1024)).await;

        let mut restored = Vec::new();
        let stats = decompress_parallel_to(
            Cursor::new(compressed.clone()),
            &mut restored,
            &DecompressOptions::default(),
            Arc::new(NoProgress),
            CancelToken::new(),
        )
        .await
        .unwrap();

        assert_eq!(restored, data);
        assert_eq!(stats.blocks, 19);
        assert_eq!(stats.bytes_read, compressed.len() as u64);
        assert_eq!(stats.bytes_written, data.len() as u64);
    }

    #[tokio::test]
    async fn one_frame_per_full_block() {
        let data = sample(10 * 1000 + 1);
        let compressed = compress(&data, &compress_options(1000)).await;
        assert_eq!(Frames::new(&compressed).count(), 11);
    }

    #[tokio::test]
    async fn empty_source_produces_empty_stream() {
        let (progress, seen) = recorder();
        let (out, stats) = compress_parallel_to(
            &mut &b""[..],
            Vec::new(),
            &CompressOptions {
                source_len: Some(0),
                ..compress_options(1024)
            },
            progress,
            CancelToken::new(),
        )
        .await
        .unwrap();

        assert!(out.is_empty());
        assert_eq!(stats, CopyStats::default());
        assert_eq!(*seen.lock().unwrap(), vec![1.0]);
    }

    #[tokio::test]
    async fn progress_count_is_blocks_plus_final_report() {
        let data = sample(1024 * 1088);
        let block_size = 128 * 1024;
        let (progress, seen) = recorder();

        let options = CompressOptions {
            source_len: Some(data.len() as u64),
            ..compress_options(block_size)
        };
        compress_parallel_to(&mut &data[..], Vec::new(), &options, progress, CancelToken::new())
            .await
            .unwrap();

        let seen = seen.lock().unwrap();
        assert_eq!(seen.len(), data.len().div_ceil(block_size) + 1);
        assert!(seen.windows(2).all(|w| w[0] <= w[1]));
        assert_eq!(seen.last().copied(), Some(1.0));
    }

    #[tokio::test]
    async fn no_compression_grows_and_optimal_shrinks() {
        let data = sample(200_000);
        let stored = compress(
            &data,
            &CompressOptions {
                level: CompressionLevel::NoCompression,
                ..compress_options(32 * 1024)
            },
        )
        .await;
        let optimal = compress(&data, &compress_options(32 * 1024)).await;

        assert!(stored.len() > data.len());
        assert!(optimal.len() < data.len());
    }

    #[tokio::test]
    async fn invalid_options_fail_before_reading() {
        let mut source = &b"never read"[..];
        let result = compress_parallel_to(
            &mut source,
            Vec::new(),
            &compress_options(0),
            Arc::new(NoProgress),
            CancelToken::new(),
        )
        .await;

        assert!(matches!(result, Err(DriverError::Argument(_))));
        assert_eq!(source.len(), 10);
    }

    #[derive(Clone, Default)]
    struct ShutdownProbe {
        closed: Arc<AtomicBool>,
    }

    impl AsyncWrite for ShutdownProbe {
        fn poll_write(
            self: Pin<&mut Self>,
            _cx: &mut Context<'_>,
            buf: &[u8],
        ) -> Poll<std::io::Result<usize>> {
            Poll::Ready(Ok(buf.len()))
        }

        fn poll_flush(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            Poll::Ready(Ok(()))
        }

        fn poll_shutdown(self: Pin<&mut Self>, _cx: &mut Context<'_>) -> Poll<std::io::Result<()>> {
            self.closed.store(true, Ordering::SeqCst);
            Poll::Ready(Ok(()))
        }
    }

    #[tokio::test]
    async fn leave_open_controls_shutdown() {
        for leave_open in [true, false] {
            let probe = ShutdownProbe::default();
            let options = CompressOptions {
                leave_open,
                ..compress_options(512)
            };
            compress_parallel_to(
                &mut &sample(2000)[..],
                probe.clone(),
                &options,
                Arc::new(NoProgress),
                CancelToken::new(),
            )
            .await
            .unwrap();
            assert_eq!(probe.closed.load(Ordering::SeqCst), !leave_open);
        }
    }

    #[tokio::test]
    async fn cancelled_copy_reports_cancellation() {
        let cancel = CancelToken::new();
        cancel.cancel();
        let result = compress_parallel_to(
            &mut &sample(10_000)[..],
            Vec::new(),
            &compress_options(1024),
            Arc::new(NoProgress),
            cancel,
        )
        .await;
        assert!(result.unwrap_err().is_cancelled());
    }
}

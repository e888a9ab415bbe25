use std::io::SeekFrom;
use std::path::Path;

use pcx_types::{CancelToken, SharedProgress};
use tokio::fs::File;
use tokio::io::{AsyncSeek, AsyncSeekExt, BufReader, BufWriter};
use tracing::info;

use crate::config::{CompressOptions, DecompressOptions};
use crate::copy::{CopyStats, compress_parallel_to, decompress_parallel_to};
use crate::error::DriverError;

/// Bytes left between the current position of `stream` and its end.
///
/// The position is restored before returning.
///
/// # Errors
///
/// Any seek error from the stream.
pub async fn seekable_len<S>(stream: &mut S) -> std::io::Result<u64>
where
    S: AsyncSeek + Unpin,
{
    let position = stream.stream_position().await?;
    let end = stream.seek(SeekFrom::End(0)).await?;
    stream.seek(SeekFrom::Start(position)).await?;
    Ok(end.saturating_sub(position))
}

/// Compress the file at `input` into a new file at `output`.
///
/// The input length is taken from the file itself, so progress is
/// reported per block. The output file is flushed and closed.
///
/// # Errors
///
/// See [`compress_parallel_to`]; opening either file can also fail with
/// [`DriverError::Io`].
pub async fn compress_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &CompressOptions,
    progress: SharedProgress,
    cancel: CancelToken,
) -> Result<CopyStats, DriverError> {
    options.validate()?;

    let mut source = File::open(input.as_ref()).await?;
    let source_len = seekable_len(&mut source).await?;
    let destination = BufWriter::new(File::create(output.as_ref()).await?);

    let options = CompressOptions {
        source_len: Some(source_len),
        leave_open: false,
        ..*options
    };
    let mut source = BufReader::new(source);
    let (_, stats) =
        compress_parallel_to(&mut source, destination, &options, progress, cancel).await?;

    info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        blocks = stats.blocks,
        bytes_in = stats.bytes_read,
        bytes_out = stats.bytes_written,
        "compressed file"
    );
    Ok(stats)
}

/// Decompress the PCX file at `input` into a new file at `output`.
///
/// # Errors
///
/// See [`decompress_parallel_to`]; opening either file can also fail with
/// [`DriverError::Io`].
pub async fn decompress_file(
    input: impl AsRef<Path>,
    output: impl AsRef<Path>,
    options: &DecompressOptions,
    progress: SharedProgress,
    cancel: CancelToken,
) -> Result<CopyStats, DriverError> {
    options.validate()?;

    let mut source = File::open(input.as_ref()).await?;
    let source_len = seekable_len(&mut source).await?;
    let mut destination = BufWriter::new(File::create(output.as_ref()).await?);

    let options = DecompressOptions {
        source_len: Some(source_len),
        leave_open: false,
        ..*options
    };
    let stats = decompress_parallel_to(
        BufReader::new(source),
        &mut destination,
        &options,
        progress,
        cancel,
    )
    .await?;

    info!(
        input = %input.as_ref().display(),
        output = %output.as_ref().display(),
        blocks = stats.blocks,
        bytes_in = stats.bytes_read,
        bytes_out = stats.bytes_written,
        "decompressed file"
    );
    Ok(stats)
}

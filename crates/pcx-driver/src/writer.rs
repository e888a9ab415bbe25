use std::mem;

use pcx_encoder::CompressPipeline;
use pcx_types::progress::fraction;
use pcx_types::{Block, CancelToken, SharedProgress};
use tokio::io::{AsyncWrite, AsyncWriteExt};
use tracing::trace;

use crate::config::CompressOptions;
use crate::error::DriverError;

/// Push-style compressor: write plain bytes, get PCX frames on the
/// destination.
///
/// Bytes are collected into blocks of `block_size` and each full block
/// is handed to the parallel pipeline. [`flush`](Self::flush) sends a
/// partially filled block right away, which produces a shorter frame.
///
/// ```rust,no_run
/// # async fn demo() -> Result<(), pcx_driver::DriverError> {
/// use std::sync::Arc;
/// use pcx_driver::{CompressOptions, CompressWriter};
/// use pcx_types::{CancelToken, NoProgress};
///
/// let file = tokio::fs::File::create("log.pcx").await?;
/// let mut writer = CompressWriter::new(
///     file,
///     &CompressOptions { leave_open: false, ..CompressOptions::default() },
///     Arc::new(NoProgress),
///     CancelToken::new(),
/// )?;
/// writer.write_all(b"first line\n").await?;
/// writer.finish().await?;
/// # Ok(())
/// # }
/// ```
pub struct CompressWriter<W> {
    pipeline: CompressPipeline<W>,
    buffer: Vec<u8>,
    block_size: usize,
    consumed: u64,
    source_len: Option<u64>,
    leave_open: bool,
}

impl<W> CompressWriter<W>
where
    W: AsyncWrite + Unpin + Send + 'static,
{
    /// # Errors
    ///
    /// [`DriverError::Argument`] if `options` are invalid.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new(
        destination: W,
        options: &CompressOptions,
        progress: SharedProgress,
        cancel: CancelToken,
    ) -> Result<Self, DriverError> {
        options.validate()?;
        Ok(Self {
            pipeline: CompressPipeline::new(
                destination,
                &options.encoder_options(),
                progress,
                cancel,
            ),
            buffer: Vec::with_capacity(options.block_size),
            block_size: options.block_size,
            consumed: 0,
            source_len: options.source_len,
            leave_open: options.leave_open,
        })
    }

    /// Append `data`, submitting every block that fills up.
    ///
    /// # Errors
    ///
    /// [`DriverError::Encode`] if the pipeline has failed or was
    /// cancelled.
    pub async fn write_all(&mut self, mut data: &[u8]) -> Result<(), DriverError> {
        while !data.is_empty() {
            let take = (self.block_size - self.buffer.len()).min(data.len());
            self.buffer.extend_from_slice(&data[..take]);
            data = &data[take..];

            if self.buffer.len() == self.block_size {
                self.send_buffer().await?;
            }
        }
        Ok(())
    }

    /// Submit whatever is buffered as a (possibly short) block.
    ///
    /// This does not wait for the frame to reach the destination.
    ///
    /// # Errors
    ///
    /// Same as [`write_all`](Self::write_all).
    pub async fn flush(&mut self) -> Result<(), DriverError> {
        self.send_buffer().await
    }

    /// Send the last partial block, wait for every frame to be written
    /// and return the destination. It is shut down first unless
    /// `leave_open` was set.
    ///
    /// # Errors
    ///
    /// The first pipeline or destination error.
    pub async fn finish(mut self) -> Result<W, DriverError> {
        self.send_buffer().await?;
        let mut destination = self.pipeline.finish().await?;
        if !self.leave_open {
            destination.shutdown().await?;
        }
        Ok(destination)
    }

    /// Plain bytes accepted so far, including any still buffered.
    pub fn bytes_accepted(&self) -> u64 {
        self.consumed + self.buffer.len() as u64
    }

    async fn send_buffer(&mut self) -> Result<(), DriverError> {
        if self.buffer.is_empty() {
            return Ok(());
        }

        let payload = mem::replace(&mut self.buffer, Vec::with_capacity(self.block_size));
        self.consumed += payload.len() as u64;
        trace!(len = payload.len(), "submitting buffered block");

        let block = Block::with_progress(payload, fraction(self.consumed, self.source_len));
        self.pipeline.submit(block).await?;
        Ok(())
    }
}

use std::io;
use std::pin::Pin;
use std::task::{Context, Poll, ready};

use bytes::Bytes;
use pcx_decoder::{DecodeError, DecompressPipeline};
use pcx_types::CancelToken;
use tokio::io::{AsyncRead, ReadBuf};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::config::DecompressOptions;
use crate::error::DriverError;

/// Decompressed blocks buffered ahead of the reader, on top of what the
/// pipeline itself holds.
const READ_AHEAD: usize = 2;

/// Pull-style decompressor: an [`AsyncRead`] yielding the plain bytes of
/// a PCX stream.
///
/// A pump task drives a [`DecompressPipeline`] and hands ordered blocks
/// over a small channel; `poll_read` serves them slice by slice. Stream
/// errors surface as `io::Error`s: format problems as
/// [`io::ErrorKind::InvalidData`], the rest as the underlying error.
///
/// Dropping the reader stops the pipeline.
pub struct DecompressReader {
    blocks: mpsc::Receiver<Result<Bytes, DecodeError>>,
    current: Bytes,
    pump: JoinHandle<()>,
    done: bool,
}

impl DecompressReader {
    /// # Errors
    ///
    /// [`DriverError::Argument`] if `options` are invalid.
    ///
    /// # Panics
    ///
    /// Must be called from within a tokio runtime.
    pub fn new<R>(
        source: R,
        options: &DecompressOptions,
        cancel: CancelToken,
    ) -> Result<Self, DriverError>
    where
        R: AsyncRead + Unpin + Send + 'static,
    {
        options.validate()?;

        let pipeline = DecompressPipeline::new(source, &options.decoder_options(), cancel);
        let (tx, rx) = mpsc::channel(READ_AHEAD);
        let pump = tokio::spawn(pump_blocks(pipeline, tx));

        Ok(Self {
            blocks: rx,
            current: Bytes::new(),
            pump,
            done: false,
        })
    }
}

async fn pump_blocks(
    mut pipeline: DecompressPipeline,
    tx: mpsc::Sender<Result<Bytes, DecodeError>>,
) {
    loop {
        let item = match pipeline.next_output().await {
            Ok(Some(block)) => Ok(block.into_payload()),
            Ok(None) => break,
            Err(e) => Err(e),
        };
        let failed = item.is_err();

        if tx.send(item).await.is_err() {
            debug!("decompress reader dropped, closing pipeline");
            pipeline.close().await;
            return;
        }
        if failed {
            break;
        }
    }
}

fn into_io_error(err: DecodeError) -> io::Error {
    match err {
        DecodeError::Io(e) => e,
        e if e.is_format_error() => io::Error::new(io::ErrorKind::InvalidData, e),
        e => io::Error::other(e),
    }
}

impl AsyncRead for DecompressReader {
    fn poll_read(
        mut self: Pin<&mut Self>,
        cx: &mut Context<'_>,
        buf: &mut ReadBuf<'_>,
    ) -> Poll<io::Result<()>> {
        loop {
            if !self.current.is_empty() {
                let n = self.current.len().min(buf.remaining());
                let chunk = self.current.split_to(n);
                buf.put_slice(&chunk);
                return Poll::Ready(Ok(()));
            }
            if self.done {
                return Poll::Ready(Ok(()));
            }

            match ready!(self.blocks.poll_recv(cx)) {
                Some(Ok(block)) => self.current = block,
                Some(Err(e)) => {
                    self.done = true;
                    return Poll::Ready(Err(into_io_error(e)));
                }
                None => {
                    self.done = true;
                    return Poll::Ready(Ok(()));
                }
            }
        }
    }
}

impl Drop for DecompressReader {
    fn drop(&mut self) {
        self.pump.abort();
    }
}

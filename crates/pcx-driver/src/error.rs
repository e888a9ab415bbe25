use pcx_decoder::DecodeError;
use pcx_encoder::EncodeError;
use pcx_types::ConfigError;

/// Errors returned by the stream adapters.
///
/// ```text
/// ┌──────────┬───────────────────────────────────────────────────────────┐
/// │ Variant  │ Cause                                                     │
/// ├──────────┼───────────────────────────────────────────────────────────┤
/// │ Argument │ invalid options, rejected before any work starts          │
/// │ Encode   │ compression pipeline failure (codec, writer, cancel)      │
/// │ Decode   │ malformed stream, codec failure, cancellation             │
/// │ Io       │ reading the plain source or writing the plain destination │
/// └──────────┴───────────────────────────────────────────────────────────┘
/// ```
#[derive(Debug, thiserror::Error)]
pub enum DriverError {
    #[error("invalid argument: {0}")]
    Argument(#[from] ConfigError),

    #[error(transparent)]
    Encode(#[from] EncodeError),

    #[error(transparent)]
    Decode(#[from] DecodeError),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl DriverError {
    /// True when the operation stopped because its token was cancelled.
    pub fn is_cancelled(&self) -> bool {
        match self {
            Self::Encode(e) => e.is_cancelled(),
            Self::Decode(e) => e.is_cancelled(),
            Self::Argument(_) | Self::Io(_) => false,
        }
    }
}

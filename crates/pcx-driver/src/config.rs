use pcx_decoder::DecoderOptions;
use pcx_encoder::EncoderOptions;
use pcx_types::{CompressionLevel, ConfigError, PipelineConfig};

/// Default raw block size: 128 KiB.
pub const DEFAULT_BLOCK_SIZE: usize = 128 * 1024;

/// Options for the compressing adapters.
///
/// `block_size` trades parallelism against ratio: every block is an
/// independent Deflate stream, so smaller blocks spread better over the
/// workers but compress slightly worse. Pick it relative to the size of
/// the source.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompressOptions {
    pub level: CompressionLevel,
    pub block_size: usize,
    pub pipeline: PipelineConfig,
    /// When false the destination is shut down after the last frame.
    pub leave_open: bool,
    /// Remaining source length, if known. Enables per-block progress.
    pub source_len: Option<u64>,
}

impl CompressOptions {
    /// # Errors
    ///
    /// [`ConfigError::ZeroBlockSize`], or the pipeline's own
    /// [`PipelineConfig::validate`] error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.block_size == 0 {
            return Err(ConfigError::ZeroBlockSize);
        }
        self.pipeline.validate()
    }

    pub fn encoder_options(&self) -> EncoderOptions {
        EncoderOptions {
            level: self.level,
            pipeline: self.pipeline,
        }
    }
}

impl Default for CompressOptions {
    fn default() -> Self {
        Self {
            level: CompressionLevel::default(),
            block_size: DEFAULT_BLOCK_SIZE,
            pipeline: PipelineConfig::default(),
            leave_open: true,
            source_len: None,
        }
    }
}

/// Options for the decompressing adapters.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DecompressOptions {
    pub pipeline: PipelineConfig,
    /// When false the destination is shut down after the last block.
    pub leave_open: bool,
    /// Remaining compressed length, if known. Enables per-block progress.
    pub source_len: Option<u64>,
    /// Upper bound on any single decompressed block.
    pub max_block_len: Option<usize>,
}

impl DecompressOptions {
    /// # Errors
    ///
    /// The pipeline's [`PipelineConfig::validate`] error.
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.pipeline.validate()
    }

    pub fn decoder_options(&self) -> DecoderOptions {
        DecoderOptions {
            pipeline: self.pipeline,
            source_len: self.source_len,
            max_block_len: self.max_block_len,
            ..DecoderOptions::default()
        }
    }
}

impl Default for DecompressOptions {
    fn default() -> Self {
        Self {
            pipeline: PipelineConfig::default(),
            leave_open: true,
            source_len: None,
            max_block_len: None,
        }
    }
}

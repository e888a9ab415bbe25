#![warn(clippy::pedantic)]

pub mod compression;
pub mod encoder;
pub mod error;

pub use compression::compress_block;
pub use encoder::{CompressPipeline, EncoderOptions, WriteStats};
pub use error::EncodeError;

#![warn(clippy::pedantic)]

pub mod decoder;
pub mod decompression;
pub mod error;

pub use decoder::{DecoderOptions, DecompressPipeline, ReadStats};
pub use decompression::{InflateError, decompress_block};
pub use error::DecodeError;

#![warn(clippy::pedantic)]

pub mod config;
pub mod copy;
pub mod error;
pub mod file;
pub mod reader;
pub mod writer;

pub use config::{CompressOptions, DEFAULT_BLOCK_SIZE, DecompressOptions};
pub use copy::{CopyStats, compress_parallel_to, decompress_parallel_to};
pub use error::DriverError;
pub use file::{compress_file, decompress_file, seekable_len};
pub use reader::DecompressReader;
pub use writer::CompressWriter;

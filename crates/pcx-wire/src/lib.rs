#![warn(clippy::pedantic)]

pub mod error;
pub mod frame;
pub mod header;
pub mod stream;

pub use error::WireError;
pub use frame::{Frames, read_frame, write_frame};
pub use header::{HEADER_SIZE, MAX_FRAME_LEN, decode_header, encode_header};
pub use stream::{FrameReader, FrameWriter};

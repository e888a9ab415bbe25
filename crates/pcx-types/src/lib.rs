#![warn(clippy::pedantic)]

pub mod block;
pub mod cancel;
pub mod config;
pub mod error;
pub mod level;
pub mod progress;
pub mod state;

pub use block::Block;
pub use cancel::CancelToken;
pub use config::PipelineConfig;
pub use error::ConfigError;
pub use level::CompressionLevel;
pub use progress::{NoProgress, Progress, SharedProgress};
pub use state::PipelineState;

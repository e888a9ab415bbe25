#![warn(clippy::pedantic)]

pub mod error;
pub mod reorder;
pub mod stage;

pub use error::{OutputError, SubmitError};
pub use reorder::ReorderBuffer;
pub use stage::{StageInput, StageOutput, ordered_stage};

use std::fmt;

/// Lifecycle of a pipeline.
///
/// ```text
///   Open ──complete()/cancel──▶ Draining ──all stages drained──▶ Closed
/// ```
///
/// A pipeline never goes back to an earlier state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, PartialOrd, Ord)]
pub enum PipelineState {
    /// Accepting input.
    #[default]
    Open,
    /// No more input accepted; in-flight work is being flushed.
    Draining,
    /// Every stage has finished and released its resources.
    Closed,
}

impl PipelineState {
    /// Move forward to `next`, ignoring attempts to go backwards.
    pub fn advance(&mut self, next: Self) {
        if next > *self {
            *self = next;
        }
    }
}

impl fmt::Display for PipelineState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::Open => "open",
            Self::Draining => "draining",
            Self::Closed => "closed",
        };
        f.write_str(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn state_only_moves_forward() {
        let mut state = PipelineState::default();
        state.advance(PipelineState::Draining);
        assert_eq!(state, PipelineState::Draining);
        state.advance(PipelineState::Open);
        assert_eq!(state, PipelineState::Draining);
        state.advance(PipelineState::Closed);
        assert_eq!(state, PipelineState::Closed);
    }
}

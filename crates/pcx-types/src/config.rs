use std::num::NonZeroUsize;
use std::thread;

use crate::error::ConfigError;

/// Queue depth multiplier applied to the worker count when no explicit
/// capacity is given.
pub const DEFAULT_CAPACITY_PER_WORKER: usize = 8;

/// Sizing for one ordered parallel stage.
///
/// ```text
/// ┌───────────────────────┬───────────────────────────────────────────────┐
/// │ Field                 │ Purpose                                       │
/// ├───────────────────────┼───────────────────────────────────────────────┤
/// │ degree_of_parallelism │ concurrent transform workers                  │
/// │ capacity              │ bounded queue depth in front of the workers   │
/// └───────────────────────┴───────────────────────────────────────────────┘
/// ```
///
/// At most `capacity + degree_of_parallelism` blocks are outstanding in a
/// stage at once. Larger capacities smooth out uneven block costs; smaller
/// ones bound memory. 2×–8× the worker count is a good range.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct PipelineConfig {
    pub degree_of_parallelism: usize,
    pub capacity: usize,
}

impl PipelineConfig {
    /// Config for `workers` workers and the default queue depth.
    pub fn with_parallelism(workers: usize) -> Self {
        Self {
            degree_of_parallelism: workers,
            capacity: workers.saturating_mul(DEFAULT_CAPACITY_PER_WORKER),
        }
    }

    #[must_use]
    pub fn capacity(mut self, capacity: usize) -> Self {
        self.capacity = capacity;
        self
    }

    /// Maximum number of items a stage holds at once.
    pub fn max_outstanding(&self) -> usize {
        self.capacity.saturating_add(self.degree_of_parallelism)
    }

    /// # Errors
    ///
    /// Returns [`ConfigError::ZeroParallelism`] or
    /// [`ConfigError::ZeroCapacity`] for zero-sized settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.degree_of_parallelism == 0 {
            return Err(ConfigError::ZeroParallelism);
        }
        if self.capacity == 0 {
            return Err(ConfigError::ZeroCapacity);
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    /// One worker per available processing unit, eight queue slots per
    /// worker.
    fn default() -> Self {
        let workers = thread::available_parallelism().map_or(1, NonZeroUsize::get);
        Self::with_parallelism(workers)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_is_valid() {
        let config = PipelineConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(
            config.capacity,
            config.degree_of_parallelism * DEFAULT_CAPACITY_PER_WORKER
        );
    }

    #[test]
    fn zero_settings_are_rejected() {
        assert_eq!(
            PipelineConfig::with_parallelism(0).validate(),
            Err(ConfigError::ZeroParallelism)
        );
        assert_eq!(
            PipelineConfig::with_parallelism(2).capacity(0).validate(),
            Err(ConfigError::ZeroCapacity)
        );
    }

    #[test]
    fn outstanding_limit_counts_queue_and_workers() {
        let config = PipelineConfig::with_parallelism(3).capacity(5);
        assert_eq!(config.max_outstanding(), 8);
    }
}

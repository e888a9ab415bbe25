/// Invalid configuration, detected synchronously before any pipeline
/// stage starts.
///
/// ```text
/// ┌─────────────────┬──────────────────────────────────────────────┐
/// │ Variant         │ Cause                                        │
/// ├─────────────────┼──────────────────────────────────────────────┤
/// │ ZeroBlockSize   │ block size of 0 bytes                        │
/// │ ZeroParallelism │ degree of parallelism of 0 workers           │
/// │ ZeroCapacity    │ bounded queue depth of 0                     │
/// │ UnknownLevel    │ compression level name not recognised        │
/// └─────────────────┴──────────────────────────────────────────────┘
/// ```
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ConfigError {
    #[error("block size must be greater than zero")]
    ZeroBlockSize,

    #[error("degree of parallelism must be greater than zero")]
    ZeroParallelism,

    #[error("queue capacity must be greater than zero")]
    ZeroCapacity,

    #[error("unknown compression level {name:?} (expected none, fastest, optimal or smallest)")]
    UnknownLevel { name: String },
}

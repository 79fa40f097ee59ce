//! Error types for table construction and allocation.

use thiserror::Error;

/// Rejected table configuration.
#[derive(Copy, Clone, Debug, PartialEq, Error)]
pub enum ConfigError {
    #[error("{name} = {value} lies outside [0, 1)")]
    LoadOutOfRange { name: &'static str, value: f64 },
    #[error("min_load ({min_load}) must be strictly below max_load ({max_load})")]
    InvertedBounds { min_load: f64, max_load: f64 },
    #[error("a table needs at least one bucket")]
    ZeroBuckets,
    #[error("target load {target} needs more buckets than can be allocated for a single entry")]
    TargetTooSmall { target: f64 },
}

/// Error returned by fallible table operations.
#[derive(Clone, Debug, PartialEq, Error)]
pub enum TableError {
    #[error("invalid configuration: {0}")]
    InvalidConfiguration(#[from] ConfigError),
    /// The bucket store could not be reserved. The table that issued the
    /// request is left exactly as it was before the call.
    #[error("failed to allocate a bucket store of {buckets} chain heads")]
    AllocationFailure { buckets: usize },
}

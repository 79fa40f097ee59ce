//! Construction-time configuration: initial bucket count and load bounds.

use crate::bucket_store::MAX_BUCKETS;
use crate::error::ConfigError;

/// Bucket count of a default table.
pub const DEFAULT_INITIAL_SIZE: usize = 8;
/// Default upper load bound.
pub const DEFAULT_MAX_LOAD: f64 = 0.75;
/// Default lower load bound.
pub const DEFAULT_MIN_LOAD: f64 = 0.25;

/// Lowest bucket count a shrink may ever produce, regardless of the
/// configured initial size.
pub const MIN_SHRINK_FLOOR: usize = 8;

/// Options accepted by [`ChainHashMap::from_options`](crate::ChainHashMap::from_options).
///
/// Load bounds are expressed as entries per bucket and must satisfy
/// `0 <= min_load < max_load < 1`. They are fixed for the lifetime of the
/// table.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct TableOptions {
    pub initial_size: usize,
    pub max_load: f64,
    pub min_load: f64,
}

impl Default for TableOptions {
    fn default() -> Self {
        Self {
            initial_size: DEFAULT_INITIAL_SIZE,
            max_load: DEFAULT_MAX_LOAD,
            min_load: DEFAULT_MIN_LOAD,
        }
    }
}

impl TableOptions {
    /// Same as `default()`: 8 buckets, bounds `[0.25, 0.75]`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the bucket count the table starts with.
    pub fn initial_size(mut self, buckets: usize) -> Self {
        self.initial_size = buckets;
        self
    }

    /// Set the load above which inserts grow the table.
    pub fn max_load(mut self, load: f64) -> Self {
        self.max_load = load;
        self
    }

    /// Set the load below which removals shrink the table.
    pub fn min_load(mut self, load: f64) -> Self {
        self.min_load = load;
        self
    }

    /// Check the bounds, the bucket count, and that a single entry fits in
    /// an allocatable store at the target load.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.initial_size == 0 {
            return Err(ConfigError::ZeroBuckets);
        }
        for (name, value) in [("max_load", self.max_load), ("min_load", self.min_load)] {
            // NaN fails the range check too.
            if !(0.0..1.0).contains(&value) {
                return Err(ConfigError::LoadOutOfRange { name, value });
            }
        }
        if self.min_load >= self.max_load {
            return Err(ConfigError::InvertedBounds {
                min_load: self.min_load,
                max_load: self.max_load,
            });
        }
        let target = self.target_load();
        if 1.0 / target > MAX_BUCKETS as f64 {
            return Err(ConfigError::TargetTooSmall { target });
        }
        Ok(())
    }

    /// Bucket count below which shrinking never goes.
    pub fn shrink_floor(&self) -> usize {
        self.initial_size.max(MIN_SHRINK_FLOOR)
    }

    /// Load a resize aims for: the midpoint of the configured bounds.
    pub fn target_load(&self) -> f64 {
        (self.min_load + self.max_load) / 2.0
    }
}

//! Configuration for the cache store

use crate::error::{ExecError, Result};
use serde::{Deserialize, Serialize};

/// Size limits for the result cache
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CacheConfig {
    /// Hard limit on the number of entries
    pub max_entries: usize,

    /// Fraction of `max_entries` above which a `put` runs eviction (0.0 - 1.0]
    pub eviction_threshold: f64,
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_entries: 1_000,
            eviction_threshold: 0.8,
        }
    }
}

impl CacheConfig {
    pub fn new(max_entries: usize) -> Self {
        Self {
            max_entries,
            ..Default::default()
        }
    }

    pub fn with_eviction_threshold(mut self, threshold: f64) -> Self {
        self.eviction_threshold = threshold;
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if self.max_entries == 0 {
            return Err(ExecError::Config(
                "cache max_entries must be greater than 0".to_string(),
            ));
        }

        if !(self.eviction_threshold > 0.0 && self.eviction_threshold <= 1.0) {
            return Err(ExecError::Config(
                "cache eviction_threshold must be in (0.0, 1.0]".to_string(),
            ));
        }

        Ok(())
    }

    /// Entry count above which eviction runs, and the size it evicts down to
    pub fn high_water_mark(&self) -> usize {
        let mark = (self.max_entries as f64 * self.eviction_threshold).floor() as usize;
        mark.clamp(1, self.max_entries.max(1))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = CacheConfig::default();
        assert_eq!(config.max_entries, 1_000);
        assert_eq!(config.high_water_mark(), 800);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_config_validation() {
        assert!(CacheConfig::new(0).validate().is_err());
        assert!(CacheConfig::new(10).with_eviction_threshold(0.0).validate().is_err());
        assert!(CacheConfig::new(10).with_eviction_threshold(1.5).validate().is_err());
        assert!(CacheConfig::new(10).with_eviction_threshold(1.0).validate().is_ok());
    }

    #[test]
    fn test_high_water_mark_bounds() {
        assert_eq!(CacheConfig::new(10).high_water_mark(), 8);
        assert_eq!(CacheConfig::new(3).with_eviction_threshold(1.0).high_water_mark(), 3);
        assert_eq!(CacheConfig::new(1).high_water_mark(), 1);
    }
}

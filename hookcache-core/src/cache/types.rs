//! Core type definitions for the cache system

use crate::command::{CommandCategory, CommandSpec, ExecutionContext};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Cache key derived from `(category, args, context fingerprint)`
///
/// Two specs with identical fields in the same execution context produce
/// equal keys. TTL, retry budget and timeout are not part of the key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct CacheKey {
    pub category: CommandCategory,
    pub args: Vec<String>,
    pub context: String,
}

impl CacheKey {
    pub fn new(spec: &CommandSpec, context: &ExecutionContext) -> Self {
        Self {
            category: spec.category(),
            args: spec.args().to_vec(),
            context: context.fingerprint(),
        }
    }
}

impl fmt::Display for CacheKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}:{}", self.category, self.context, self.args.join(" "))
    }
}

/// Why an entry left the store
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RemovalReason {
    /// TTL elapsed
    Expired,
    /// Removed to keep the store under its size limit
    Evicted,
    /// Explicit clear
    Cleared,
}

impl fmt::Display for RemovalReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            RemovalReason::Expired => write!(f, "expired"),
            RemovalReason::Evicted => write!(f, "evicted"),
            RemovalReason::Cleared => write!(f, "cleared"),
        }
    }
}

/// Point-in-time view of the store
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Number of entries currently in cache
    pub entries: usize,

    /// Configured hard limit on entries
    pub capacity: usize,

    /// Entries removed to respect the size limit
    pub evictions: u64,

    /// Entries removed because their TTL elapsed
    pub expirations: u64,

    /// Entries removed by explicit clears
    pub invalidations: u64,
}

impl CacheStats {
    /// Fill ratio as a percentage of capacity
    pub fn utilization(&self) -> f64 {
        if self.capacity == 0 {
            0.0
        } else {
            (self.entries as f64 / self.capacity as f64) * 100.0
        }
    }

    pub fn total_removals(&self) -> u64 {
        self.evictions + self.expirations + self.invalidations
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ entries: {}/{}, utilization: {:.1}%, evictions: {}, expirations: {}, invalidations: {} }}",
            self.entries,
            self.capacity,
            self.utilization(),
            self.evictions,
            self.expirations,
            self.invalidations
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_ignores_ttl_and_retries() {
        let ctx = ExecutionContext::new("/repo");
        let a = CommandSpec::new(CommandCategory::Status, ["status"]).with_ttl(5);
        let b = CommandSpec::new(CommandCategory::Status, ["status"])
            .with_ttl(60)
            .with_retries(0);

        assert_eq!(CacheKey::new(&a, &ctx), CacheKey::new(&b, &ctx));
    }

    #[test]
    fn test_key_distinguishes_context_and_category() {
        let spec = CommandSpec::new(CommandCategory::Status, ["status"]);
        let here = CacheKey::new(&spec, &ExecutionContext::new("/repo"));
        let there = CacheKey::new(&spec, &ExecutionContext::new("/other"));
        assert_ne!(here, there);

        let diff = CommandSpec::new(CommandCategory::Diff, ["status"]);
        assert_ne!(here, CacheKey::new(&diff, &ExecutionContext::new("/repo")));
    }

    #[test]
    fn test_key_display() {
        let spec = CommandSpec::new(CommandCategory::Log, ["log", "-1"]);
        let key = CacheKey::new(&spec, &ExecutionContext::new("/repo").with_branch("main"));
        assert_eq!(key.to_string(), "log:/repo@main:log -1");
    }

    #[test]
    fn test_cache_stats_utilization() {
        let stats = CacheStats {
            entries: 25,
            capacity: 100,
            ..Default::default()
        };
        assert_eq!(stats.utilization(), 25.0);
        assert_eq!(CacheStats::default().utilization(), 0.0);
    }

    #[test]
    fn test_cache_stats_display() {
        let stats = CacheStats {
            entries: 3,
            capacity: 10,
            evictions: 2,
            expirations: 1,
            invalidations: 4,
        };

        let display = format!("{}", stats);
        assert!(display.contains("entries: 3/10"));
        assert!(display.contains("evictions: 2"));
        assert_eq!(stats.total_removals(), 7);
    }
}

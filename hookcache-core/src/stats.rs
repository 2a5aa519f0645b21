//! Operation counters and derived metrics

use crate::cache::CacheStats;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// Lock-free counters updated once per `execute` call
///
/// Every counter only ever grows for the lifetime of the collector.
#[derive(Debug, Default)]
pub struct StatsCollector {
    total_operations: AtomicU64,
    cache_hits: AtomicU64,
    cache_misses: AtomicU64,
    errors: AtomicU64,
    total_elapsed_micros: AtomicU64,
}

/// How one `execute` call ended, from the collector's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Hit,
    MissSuccess,
    MissError,
}

impl StatsCollector {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record one finished call
    pub fn record(&self, outcome: Outcome, elapsed: Duration) {
        self.total_operations.fetch_add(1, Ordering::Relaxed);
        let micros = u64::try_from(elapsed.as_micros()).unwrap_or(u64::MAX);
        self.total_elapsed_micros.fetch_add(micros, Ordering::Relaxed);

        match outcome {
            Outcome::Hit => {
                self.cache_hits.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::MissSuccess => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
            }
            Outcome::MissError => {
                self.cache_misses.fetch_add(1, Ordering::Relaxed);
                self.errors.fetch_add(1, Ordering::Relaxed);
            }
        }
    }

    pub fn snapshot(&self) -> OperationStats {
        let total_operations = self.total_operations.load(Ordering::Relaxed);
        let cache_hits = self.cache_hits.load(Ordering::Relaxed);
        let cache_misses = self.cache_misses.load(Ordering::Relaxed);
        let total_elapsed_micros = self.total_elapsed_micros.load(Ordering::Relaxed);

        let lookups = cache_hits + cache_misses;
        let hit_rate = if lookups == 0 {
            0.0
        } else {
            cache_hits as f64 / lookups as f64
        };
        let average_latency_ms = if total_operations == 0 {
            0.0
        } else {
            total_elapsed_micros as f64 / total_operations as f64 / 1000.0
        };

        OperationStats {
            total_operations,
            cache_hits,
            cache_misses,
            errors: self.errors.load(Ordering::Relaxed),
            total_elapsed_ms: total_elapsed_micros as f64 / 1000.0,
            hit_rate,
            average_latency_ms,
        }
    }
}

/// Counter values with derived metrics
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OperationStats {
    pub total_operations: u64,
    pub cache_hits: u64,
    pub cache_misses: u64,
    pub errors: u64,
    pub total_elapsed_ms: f64,

    /// `hits / (hits + misses)`, 0 before the first lookup
    pub hit_rate: f64,
    pub average_latency_ms: f64,
}

/// Queue worker accounting
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QueueStats {
    pub depth: usize,
    pub enqueued: u64,
    pub processed: u64,
    pub dropped: u64,
    pub callback_panics: u64,
}

/// Gate occupancy
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct GateStats {
    pub capacity: usize,
    pub active: usize,
    pub peak: usize,
}

/// Everything `CommandManager::statistics` reports
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub operations: OperationStats,
    pub retries: u64,
    pub cache: CacheStats,
    pub queue: QueueStats,
    pub gate: GateStats,
}

impl StatsSnapshot {
    pub fn hit_rate_percent(&self) -> f64 {
        self.operations.hit_rate * 100.0
    }

    pub fn cache_utilization(&self) -> f64 {
        self.cache.utilization()
    }
}

impl fmt::Display for StatsSnapshot {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "operations: {} (hits: {}, misses: {}, errors: {}, retries: {})",
            self.operations.total_operations,
            self.operations.cache_hits,
            self.operations.cache_misses,
            self.operations.errors,
            self.retries
        )?;
        writeln!(
            f,
            "hit rate: {:.1}%, average latency: {:.2}ms",
            self.hit_rate_percent(),
            self.operations.average_latency_ms
        )?;
        writeln!(
            f,
            "cache: {}/{} entries ({:.1}%)",
            self.cache.entries,
            self.cache.capacity,
            self.cache_utilization()
        )?;
        writeln!(
            f,
            "queue: depth {}, processed {}, dropped {}",
            self.queue.depth, self.queue.processed, self.queue.dropped
        )?;
        write!(
            f,
            "gate: {}/{} active, peak {}",
            self.gate.active, self.gate.capacity, self.gate.peak
        )
    }
}

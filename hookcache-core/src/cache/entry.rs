//! Cache entry management with TTL support

use crate::command::CommandCategory;
use crate::envelope::ResultEnvelope;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};

/// A stored result with TTL and access metadata
///
/// `hit_count` is atomic so lookups can record hits under a shared read lock.
#[derive(Debug)]
pub struct CacheEntry {
    result: ResultEnvelope,
    stored_at: Instant,
    ttl: Duration,
    hit_count: AtomicU64,
}

impl CacheEntry {
    pub fn new(result: ResultEnvelope, ttl: Duration) -> Self {
        Self {
            result,
            stored_at: Instant::now(),
            ttl,
            hit_count: AtomicU64::new(0),
        }
    }

    /// An entry is visible only while `now - stored_at < ttl`
    pub fn is_expired(&self) -> bool {
        self.stored_at.elapsed() >= self.ttl
    }

    pub fn time_until_expiration(&self) -> Option<Duration> {
        self.ttl.checked_sub(self.stored_at.elapsed()).filter(|d| !d.is_zero())
    }

    pub fn age(&self) -> Duration {
        self.stored_at.elapsed()
    }

    /// Record a hit and hand out a copy of the stored result
    pub fn record_hit(&self) -> ResultEnvelope {
        self.hit_count.fetch_add(1, Ordering::Relaxed);
        self.result.as_cache_hit()
    }

    pub fn hit_count(&self) -> u64 {
        self.hit_count.load(Ordering::Relaxed)
    }

    pub fn stored_at(&self) -> Instant {
        self.stored_at
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }

    pub fn category(&self) -> CommandCategory {
        self.result.category
    }

    /// Eviction order: coldest first, then oldest
    pub(crate) fn eviction_rank(&self) -> (u64, Instant) {
        (self.hit_count(), self.stored_at)
    }
}

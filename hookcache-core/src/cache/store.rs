//! Result cache with TTL expiry and size-bounded eviction

use crate::cache::{
    config::CacheConfig,
    entry::CacheEntry,
    types::{CacheKey, CacheStats, RemovalReason},
};
use crate::command::CommandCategory;
use crate::envelope::ResultEnvelope;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::RwLock;
use tracing::{debug, info};

/// Thread-safe key → result map
///
/// This implementation provides:
/// - Concurrent lookups under a shared read lock (hit counts are atomic)
/// - TTL expiry checked on every lookup
/// - Eviction of the coldest, oldest entries once the store passes its
///   high-water mark, run inside the `put` that crossed it
/// - Category-filtered clearing
#[derive(Debug)]
pub struct CacheStore {
    config: CacheConfig,
    entries: RwLock<HashMap<CacheKey, CacheEntry>>,
    evictions: AtomicU64,
    expirations: AtomicU64,
    invalidations: AtomicU64,
}

impl CacheStore {
    pub fn new(config: CacheConfig) -> Self {
        debug!("Initializing result cache with config: {:?}", config);

        Self {
            config,
            entries: RwLock::new(HashMap::new()),
            evictions: AtomicU64::new(0),
            expirations: AtomicU64::new(0),
            invalidations: AtomicU64::new(0),
        }
    }

    pub fn config(&self) -> &CacheConfig {
        &self.config
    }

    /// Look up a live entry, recording the hit
    ///
    /// An expired entry is removed and reported as absent.
    pub async fn get(&self, key: &CacheKey) -> Option<ResultEnvelope> {
        {
            let entries = self.entries.read().await;
            match entries.get(key) {
                None => return None,
                Some(entry) if !entry.is_expired() => {
                    debug!("Cache hit: {}", key);
                    return Some(entry.record_hit());
                }
                Some(_) => {}
            }
        }

        let mut entries = self.entries.write().await;
        // A concurrent put may have refreshed the entry between the locks.
        match entries.get(key) {
            None => return None,
            Some(entry) if !entry.is_expired() => return Some(entry.record_hit()),
            Some(_) => {}
        }

        entries.remove(key);
        self.record_removals(RemovalReason::Expired, 1);
        debug!("Cache entry expired: {}", key);
        None
    }

    /// Check if a live entry exists without recording a hit
    pub async fn contains(&self, key: &CacheKey) -> bool {
        let entries = self.entries.read().await;
        entries.get(key).is_some_and(|entry| !entry.is_expired())
    }

    /// Insert or overwrite an entry
    ///
    /// A zero TTL stores nothing. When the store grows past its high-water
    /// mark, eviction runs before this call returns.
    pub async fn put(&self, key: CacheKey, result: ResultEnvelope, ttl: Duration) {
        if ttl.is_zero() {
            return;
        }

        let mut entries = self.entries.write().await;

        if entries.insert(key.clone(), CacheEntry::new(result, ttl)).is_some() {
            debug!("Refreshed cache entry: {}", key);
        } else {
            debug!("Inserted cache entry: {}", key);
        }

        if entries.len() > self.config.high_water_mark() {
            self.evict(&mut entries, &key);
        }
    }

    /// Remove expired entries, then the coldest and oldest, until the store
    /// is back at its high-water mark. The entry just written is never a
    /// candidate.
    fn evict(&self, entries: &mut HashMap<CacheKey, CacheEntry>, protected: &CacheKey) {
        let target = self.config.high_water_mark();

        let before = entries.len();
        entries.retain(|key, entry| key == protected || !entry.is_expired());
        let expired = before - entries.len();
        if expired > 0 {
            self.record_removals(RemovalReason::Expired, expired);
        }

        if entries.len() <= target {
            return;
        }

        let mut candidates: Vec<(CacheKey, (u64, Instant))> = entries
            .iter()
            .filter(|(key, _)| *key != protected)
            .map(|(key, entry)| (key.clone(), entry.eviction_rank()))
            .collect();
        candidates.sort_by(|a, b| a.1.cmp(&b.1));

        // target >= 1, so the protected entry alone never has to go
        let evicted = entries.len() - target;
        for (key, _) in candidates.into_iter().take(evicted) {
            debug!("Evicting cache entry: {}", key);
            entries.remove(&key);
        }

        self.record_removals(RemovalReason::Evicted, evicted);
        debug!(
            "Eviction removed {} expired and {} cold entries ({} remain)",
            expired,
            evicted,
            entries.len()
        );
    }

    /// Remove all entries, or only those of one category
    pub async fn clear(&self, category: Option<CommandCategory>) -> usize {
        let mut entries = self.entries.write().await;

        let removed = match category {
            None => {
                let count = entries.len();
                entries.clear();
                count
            }
            Some(category) => {
                let before = entries.len();
                entries.retain(|_, entry| entry.category() != category);
                before - entries.len()
            }
        };

        self.record_removals(RemovalReason::Cleared, removed);
        match category {
            Some(category) => info!("Cleared {} '{}' entries from cache", removed, category),
            None => info!("Cleared {} entries from cache", removed),
        }
        removed
    }

    /// Remove every expired entry
    pub async fn purge_expired(&self) -> usize {
        let mut entries = self.entries.write().await;

        let before = entries.len();
        entries.retain(|_, entry| !entry.is_expired());
        let removed = before - entries.len();

        if removed > 0 {
            self.record_removals(RemovalReason::Expired, removed);
            debug!("Purged {} expired entries", removed);
        }
        removed
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    pub async fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.len().await,
            capacity: self.config.max_entries,
            evictions: self.evictions.load(Ordering::Relaxed),
            expirations: self.expirations.load(Ordering::Relaxed),
            invalidations: self.invalidations.load(Ordering::Relaxed),
        }
    }

    fn record_removals(&self, reason: RemovalReason, count: usize) {
        let counter = match reason {
            RemovalReason::Expired => &self.expirations,
            RemovalReason::Evicted => &self.evictions,
            RemovalReason::Cleared => &self.invalidations,
        };
        counter.fetch_add(count as u64, Ordering::Relaxed);
    }
}

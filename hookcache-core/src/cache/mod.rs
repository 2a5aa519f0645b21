//! # Result Cache
//!
//! In-memory cache of successful command results.
//!
//! ## Features
//!
//! - **TTL-Based Expiration**: each entry carries the TTL of the spec that
//!   produced it and is invisible once `now - stored_at >= ttl`
//! - **Size-Bounded Eviction**: once the store passes its high-water mark
//!   (80% of `max_entries` by default), the coldest and oldest entries are
//!   removed, ranked by `(hit_count, stored_at)`
//! - **Category Invalidation**: clear everything, or one command category
//!
//! ## Example
//!
//! ```rust
//! use hookcache_core::cache::{CacheConfig, CacheKey, CacheStore};
//! use hookcache_core::{CommandCategory, CommandSpec, ExecutionContext, ResultEnvelope};
//! use std::time::Duration;
//!
//! # async fn example() {
//! let store = CacheStore::new(CacheConfig::new(100));
//! let spec = CommandSpec::new(CommandCategory::Status, ["status"]);
//! let key = CacheKey::new(&spec, &ExecutionContext::new("/repo"));
//!
//! let result = ResultEnvelope::success(
//!     &spec,
//!     vec!["git".into(), "status".into()],
//!     "clean".into(),
//!     String::new(),
//!     Duration::from_millis(5),
//! );
//! store.put(key.clone(), result, spec.cache_ttl()).await;
//!
//! if let Some(hit) = store.get(&key).await {
//!     assert!(hit.cache_hit);
//! }
//! # }
//! ```

pub mod config;
pub mod entry;
pub mod store;
pub mod types;

pub use config::CacheConfig;
pub use entry::CacheEntry;
pub use store::CacheStore;
pub use types::{CacheKey, CacheStats, RemovalReason};

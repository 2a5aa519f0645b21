//! # hookcache-core
//!
//! A caching, rate-limited front for an external command-line tool such as
//! `git`, meant for latency-sensitive callers (editor hooks, prompt
//! renderers) that repeatedly ask the same read-only questions.
//!
//! ## Features
//!
//! - TTL cache of successful results, keyed by category, arguments and
//!   execution context
//! - Concurrency gate bounding how many processes are alive at once
//! - Per-attempt timeouts with retry and exponential backoff
//! - Fire-and-forget queue drained by a single background worker
//! - Counters for hits, misses, errors, retries and latency
//!
//! ## Example
//!
//! ```no_run
//! use hookcache_core::{CommandCategory, CommandManager, CommandSpec, ManagerConfig};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let manager = CommandManager::new(ManagerConfig::builder().working_dir(".").build())?;
//!
//!     let spec = CommandSpec::new(CommandCategory::Status, ["status", "--porcelain"]);
//!     let first = manager.execute(spec.clone()).await;
//!     let second = manager.execute(spec).await;
//!     assert!(second.cache_hit || !first.success);
//!
//!     println!("{}", manager.statistics().await);
//!     manager.shutdown().await;
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod command;
pub mod config;
pub mod envelope;
pub mod error;
pub mod executor;
pub mod gate;
pub mod manager;
pub mod queue;
pub mod stats;

// Re-export main types for convenience
pub use cache::{CacheConfig, CacheKey, CacheStats, CacheStore};
pub use command::{CommandCategory, CommandSpec, ExecutionContext};
pub use config::{ManagerConfig, ManagerConfigBuilder};
pub use envelope::ResultEnvelope;
pub use error::{ExecError, Result};
pub use executor::{AttemptOutcome, CommandRunner, Executor, ProcessRunner, RetryPolicy};
pub use gate::{ConcurrencyGate, GatePermit};
pub use manager::CommandManager;
pub use queue::{Callback, QueueProcessor};
pub use stats::{OperationStats, StatsSnapshot};

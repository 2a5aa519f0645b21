//! The command manager facade
//!
//! Construct one [`CommandManager`] at startup and hand it (or an `Arc` of
//! it) to every call site; that single instance is what makes the cache
//! shared.

use crate::cache::{CacheKey, CacheStore};
use crate::command::{CommandCategory, CommandSpec};
use crate::config::ManagerConfig;
use crate::envelope::ResultEnvelope;
use crate::error::{ExecError, Result};
use crate::executor::{CommandRunner, Executor, ProcessRunner};
use crate::gate::ConcurrencyGate;
use crate::queue::QueueProcessor;
use crate::stats::{GateStats, Outcome, StatsCollector, StatsSnapshot};
use futures::future::join_all;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Caching, rate-limited front for an external command-line tool
///
/// No method ever returns an execution error: failures come back as
/// [`ResultEnvelope`]s with `success = false`.
pub struct CommandManager {
    inner: Arc<ManagerInner>,
    queue: QueueProcessor,
}

struct ManagerInner {
    config: ManagerConfig,
    cache: CacheStore,
    gate: ConcurrencyGate,
    executor: Executor,
    stats: StatsCollector,
    accepting: AtomicBool,
}

impl ManagerInner {
    async fn execute(&self, spec: CommandSpec) -> ResultEnvelope {
        let started = Instant::now();

        if !self.accepting.load(Ordering::Acquire) {
            self.stats.record(Outcome::MissError, started.elapsed());
            return ResultEnvelope::rejected(
                &spec,
                self.executor.command_line(&spec),
                ExecError::GateClosed,
            );
        }

        let key = CacheKey::new(&spec, &self.config.context);

        if spec.is_cacheable() {
            if let Some(hit) = self.cache.get(&key).await {
                self.stats.record(Outcome::Hit, started.elapsed());
                return hit;
            }
        }
        debug!("Cache miss: {}", key);

        // Held until the result is stored; shutdown drains the gate before
        // clearing the cache.
        let (result, _permit) = match self.gate.acquire().await {
            Ok(permit) => (self.executor.run(&spec).await, Some(permit)),
            Err(error) => (
                ResultEnvelope::rejected(&spec, self.executor.command_line(&spec), error),
                None,
            ),
        };

        if result.success {
            if self.accepting.load(Ordering::Acquire) {
                self.cache.put(key, result.clone(), spec.cache_ttl()).await;
            }
            self.stats.record(Outcome::MissSuccess, started.elapsed());
        } else {
            self.stats.record(Outcome::MissError, started.elapsed());
        }

        result
    }
}

impl CommandManager {
    /// Manager spawning real processes
    ///
    /// Must be called from within a tokio runtime: the queue worker is
    /// spawned immediately.
    pub fn new(config: ManagerConfig) -> Result<Self> {
        Self::with_runner(config, Arc::new(ProcessRunner))
    }

    /// Manager using a custom runner for each attempt
    pub fn with_runner(config: ManagerConfig, runner: Arc<dyn CommandRunner>) -> Result<Self> {
        config.validate()?;

        info!(
            "Initializing command manager for '{}' (concurrency {}, cache {} entries)",
            config.program, config.max_concurrency, config.cache.max_entries
        );

        let executor = Executor::with_runner(
            runner,
            config.program.clone(),
            config.context.working_dir.clone(),
            config.retry.clone(),
        );

        let inner = Arc::new(ManagerInner {
            cache: CacheStore::new(config.cache.clone()),
            gate: ConcurrencyGate::new(config.max_concurrency),
            executor,
            stats: StatsCollector::new(),
            accepting: AtomicBool::new(true),
            config,
        });

        let worker_inner = Arc::clone(&inner);
        let queue = QueueProcessor::start(
            inner.config.max_queue_size,
            inner.config.queue_poll_interval,
            move |spec| {
                let inner = Arc::clone(&worker_inner);
                async move { inner.execute(spec).await }
            },
        );

        Ok(Self { inner, queue })
    }

    pub fn config(&self) -> &ManagerConfig {
        &self.inner.config
    }

    /// Run a spec, serving it from the cache when a live entry exists
    pub async fn execute(&self, spec: CommandSpec) -> ResultEnvelope {
        self.inner.execute(spec).await
    }

    /// Run specs concurrently, bounded by the shared gate
    ///
    /// Results come back in input order. A spec whose task could not be
    /// scheduled or was lost yields a failure envelope in its slot.
    pub async fn execute_parallel(&self, specs: Vec<CommandSpec>) -> Vec<ResultEnvelope> {
        let handles: Vec<_> = specs
            .into_iter()
            .map(|spec| {
                let inner = Arc::clone(&self.inner);
                let task_spec = spec.clone();
                let handle = tokio::spawn(async move { inner.execute(task_spec).await });
                (spec, handle)
            })
            .collect();

        let (specs, handles): (Vec<_>, Vec<_>) = handles.into_iter().unzip();
        let results = join_all(handles).await;

        specs
            .iter()
            .zip(results)
            .map(|(spec, joined)| match joined {
                Ok(result) => result,
                Err(e) => {
                    warn!("Parallel {} task failed: {}", spec.category(), e);
                    ResultEnvelope::rejected(
                        spec,
                        self.inner.executor.command_line(spec),
                        ExecError::Scheduling(e.to_string()),
                    )
                }
            })
            .collect()
    }

    /// Hand a spec to the background worker; never blocks
    ///
    /// Returns the job id, or `None` when the job was dropped because the
    /// queue is full or the manager is shutting down.
    pub fn queue<F>(&self, spec: CommandSpec, callback: F) -> Option<Uuid>
    where
        F: FnOnce(ResultEnvelope) + Send + 'static,
    {
        self.queue.enqueue(spec, Box::new(callback))
    }

    /// Counters, cache occupancy, queue depth and gate usage
    pub async fn statistics(&self) -> StatsSnapshot {
        StatsSnapshot {
            operations: self.inner.stats.snapshot(),
            retries: self.inner.executor.retries(),
            cache: self.inner.cache.stats().await,
            queue: self.queue.stats(),
            gate: GateStats {
                capacity: self.inner.gate.capacity(),
                active: self.inner.gate.active(),
                peak: self.inner.gate.peak(),
            },
        }
    }

    /// Drop cached results, optionally only one category's
    pub async fn clear_cache(&self, category: Option<CommandCategory>) -> usize {
        self.inner.cache.clear(category).await
    }

    /// Drop cached results whose TTL has elapsed
    pub async fn purge_expired(&self) -> usize {
        self.inner.cache.purge_expired().await
    }

    pub fn is_shut_down(&self) -> bool {
        !self.inner.accepting.load(Ordering::Acquire)
    }

    /// Stop the manager
    ///
    /// New calls are rejected from the moment this starts. The queue worker
    /// is joined (and aborted if it overruns), pending gate waiters are
    /// turned away, in-flight executions are awaited, and the cache is
    /// emptied. The whole sequence is bounded by `shutdown_timeout`.
    pub async fn shutdown(&self) {
        if !self.inner.accepting.swap(false, Ordering::AcqRel) {
            debug!("Command manager already shut down");
            return;
        }

        let limit = self.inner.config.shutdown_timeout;
        let deadline = Instant::now() + limit;
        info!("Shutting down command manager (timeout {:?})", limit);

        if !self.queue.shutdown(limit).await {
            warn!("Queue worker was force-stopped");
        }

        self.inner.gate.close();
        let remaining = deadline.saturating_duration_since(Instant::now());
        if !self.inner.gate.drain(remaining).await {
            warn!(
                "{} execution(s) still running at shutdown deadline",
                self.inner.gate.active()
            );
        }

        let cleared = self.inner.cache.clear(None).await;
        info!("Command manager stopped ({} cached results dropped)", cleared);
    }
}

impl std::fmt::Debug for CommandManager {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CommandManager")
            .field("config", &self.inner.config)
            .field("shut_down", &self.is_shut_down())
            .finish_non_exhaustive()
    }
}

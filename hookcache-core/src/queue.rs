//! Fire-and-forget execution on a single background worker

use crate::command::CommandSpec;
use crate::envelope::ResultEnvelope;
use crate::stats::QueueStats;
use std::future::Future;
use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};
use uuid::Uuid;

/// Receives the result of a queued command
pub type Callback = Box<dyn FnOnce(ResultEnvelope) + Send + 'static>;

struct QueuedJob {
    id: Uuid,
    spec: CommandSpec,
    callback: Callback,
    enqueued_at: Instant,
}

#[derive(Debug, Default)]
struct QueueCounters {
    depth: AtomicUsize,
    enqueued: AtomicU64,
    processed: AtomicU64,
    dropped: AtomicU64,
    callback_panics: AtomicU64,
}

/// FIFO queue drained by exactly one worker task
///
/// Enqueueing never blocks. Items beyond `max_queue_size` are dropped and
/// logged. A panicking callback is logged and the worker carries on.
pub struct QueueProcessor {
    sender: mpsc::UnboundedSender<QueuedJob>,
    worker: Mutex<Option<JoinHandle<()>>>,
    counters: Arc<QueueCounters>,
    shutdown: Arc<AtomicBool>,
    max_queue_size: usize,
}

impl QueueProcessor {
    /// Spawn the worker; `handler` turns each spec into a result
    ///
    /// Must be called from within a tokio runtime.
    pub fn start<H, Fut>(max_queue_size: usize, poll_interval: Duration, handler: H) -> Self
    where
        H: Fn(CommandSpec) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = ResultEnvelope> + Send + 'static,
    {
        let (sender, receiver) = mpsc::unbounded_channel();
        let counters = Arc::new(QueueCounters::default());
        let shutdown = Arc::new(AtomicBool::new(false));

        let worker = tokio::spawn(worker_loop(
            receiver,
            handler,
            poll_interval,
            Arc::clone(&counters),
            Arc::clone(&shutdown),
        ));

        debug!("Started queue worker (max queue size {})", max_queue_size);

        Self {
            sender,
            worker: Mutex::new(Some(worker)),
            counters,
            shutdown,
            max_queue_size,
        }
    }

    /// Add a job; returns its id, or `None` if it was dropped
    pub fn enqueue(&self, spec: CommandSpec, callback: Callback) -> Option<Uuid> {
        if self.shutdown.load(Ordering::Acquire) {
            warn!("Queue is shut down; dropping {} command", spec.category());
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        let max = self.max_queue_size;
        let reserved = self
            .counters
            .depth
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                (depth < max).then_some(depth + 1)
            });
        if reserved.is_err() {
            warn!(
                "Queue saturated ({} pending); dropping {} command",
                max,
                spec.category()
            );
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        // Shutdown may have started after the first check. Give the slot
        // back unless shutdown already zeroed the depth and counted it.
        if self.shutdown.load(Ordering::Acquire) {
            warn!("Queue is shut down; dropping {} command", spec.category());
            let released = self
                .counters
                .depth
                .fetch_update(Ordering::AcqRel, Ordering::Acquire, |depth| {
                    depth.checked_sub(1)
                });
            if released.is_ok() {
                self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            }
            return None;
        }

        let id = Uuid::new_v4();
        let job = QueuedJob {
            id,
            spec,
            callback,
            enqueued_at: Instant::now(),
        };

        if self.sender.send(job).is_err() {
            warn!("Queue worker is gone; dropping job {}", id);
            self.counters.depth.fetch_sub(1, Ordering::AcqRel);
            self.counters.dropped.fetch_add(1, Ordering::Relaxed);
            return None;
        }

        self.counters.enqueued.fetch_add(1, Ordering::Relaxed);
        debug!("Queued job {}", id);
        Some(id)
    }

    /// Stop the worker, waiting at most `limit` for it to finish its
    /// current job before aborting it
    ///
    /// Returns `true` if the worker stopped on its own. Jobs still pending
    /// are counted as dropped.
    pub async fn shutdown(&self, limit: Duration) -> bool {
        self.shutdown.store(true, Ordering::Release);

        let Some(mut handle) = self.worker.lock().await.take() else {
            return true;
        };

        let clean = match tokio::time::timeout(limit, &mut handle).await {
            Ok(_) => true,
            Err(_) => {
                warn!("Queue worker did not stop within {:?}; aborting", limit);
                handle.abort();
                false
            }
        };

        let abandoned = self.counters.depth.swap(0, Ordering::AcqRel);
        if abandoned > 0 {
            info!("Discarded {} pending queued job(s) at shutdown", abandoned);
            self.counters
                .dropped
                .fetch_add(abandoned as u64, Ordering::Relaxed);
        }

        clean
    }

    pub fn is_shut_down(&self) -> bool {
        self.shutdown.load(Ordering::Acquire)
    }

    pub fn depth(&self) -> usize {
        self.counters.depth.load(Ordering::Acquire)
    }

    pub fn stats(&self) -> QueueStats {
        QueueStats {
            depth: self.depth(),
            enqueued: self.counters.enqueued.load(Ordering::Relaxed),
            processed: self.counters.processed.load(Ordering::Relaxed),
            dropped: self.counters.dropped.load(Ordering::Relaxed),
            callback_panics: self.counters.callback_panics.load(Ordering::Relaxed),
        }
    }
}

async fn worker_loop<H, Fut>(
    mut receiver: mpsc::UnboundedReceiver<QueuedJob>,
    handler: H,
    poll_interval: Duration,
    counters: Arc<QueueCounters>,
    shutdown: Arc<AtomicBool>,
) where
    H: Fn(CommandSpec) -> Fut + Send + Sync + 'static,
    Fut: Future<Output = ResultEnvelope> + Send + 'static,
{
    loop {
        if shutdown.load(Ordering::Acquire) {
            break;
        }

        let job = match tokio::time::timeout(poll_interval, receiver.recv()).await {
            Ok(Some(job)) => job,
            Ok(None) => break,
            Err(_) => continue,
        };
        counters.depth.fetch_sub(1, Ordering::AcqRel);

        let QueuedJob {
            id,
            spec,
            callback,
            enqueued_at,
        } = job;
        debug!("Processing job {} (waited {:?})", id, enqueued_at.elapsed());

        let result = handler(spec).await.with_job_id(id);
        counters.processed.fetch_add(1, Ordering::Relaxed);

        if catch_unwind(AssertUnwindSafe(|| callback(result))).is_err() {
            error!("Callback for job {} panicked", id);
            counters.callback_panics.fetch_add(1, Ordering::Relaxed);
        }
    }

    debug!("Queue worker stopped");
}

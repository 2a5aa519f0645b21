//! Concurrency gate bounding simultaneous external processes

use crate::error::{ExecError, Result};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Notify, OwnedSemaphorePermit, Semaphore};
use tracing::debug;

/// Counting semaphore in front of every process spawn
///
/// No more than `capacity` permits exist at once, however many callers are
/// waiting. The gate also tracks how many permits are held and the highest
/// number ever held at once.
#[derive(Debug, Clone)]
pub struct ConcurrencyGate {
    semaphore: Arc<Semaphore>,
    state: Arc<GateState>,
    capacity: usize,
}

#[derive(Debug, Default)]
struct GateState {
    active: AtomicUsize,
    peak: AtomicUsize,
    idle: Notify,
}

/// Held for the duration of one execution; released on drop
#[derive(Debug)]
pub struct GatePermit {
    _permit: OwnedSemaphorePermit,
    state: Arc<GateState>,
}

impl Drop for GatePermit {
    fn drop(&mut self) {
        if self.state.active.fetch_sub(1, Ordering::AcqRel) == 1 {
            self.state.idle.notify_waiters();
        }
    }
}

impl ConcurrencyGate {
    pub const DEFAULT_CAPACITY: usize = 4;

    /// Create a gate; a capacity of zero is raised to one
    pub fn new(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            state: Arc::new(GateState::default()),
            capacity,
        }
    }

    /// Wait for a free slot
    ///
    /// Fails with [`ExecError::GateClosed`] once the gate has been closed,
    /// including for callers already waiting.
    pub async fn acquire(&self) -> Result<GatePermit> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| ExecError::GateClosed)?;
        Ok(self.admit(permit))
    }

    /// Take a slot only if one is free right now
    pub fn try_acquire(&self) -> Option<GatePermit> {
        self.semaphore
            .clone()
            .try_acquire_owned()
            .ok()
            .map(|permit| self.admit(permit))
    }

    fn admit(&self, permit: OwnedSemaphorePermit) -> GatePermit {
        let active = self.state.active.fetch_add(1, Ordering::AcqRel) + 1;
        self.state.peak.fetch_max(active, Ordering::AcqRel);
        GatePermit {
            _permit: permit,
            state: Arc::clone(&self.state),
        }
    }

    /// Reject all pending and future acquisitions
    pub fn close(&self) {
        if !self.semaphore.is_closed() {
            debug!("Closing concurrency gate ({} active)", self.active());
            self.semaphore.close();
        }
    }

    pub fn is_closed(&self) -> bool {
        self.semaphore.is_closed()
    }

    /// Wait until no permit is held, up to `limit`
    ///
    /// Returns `false` if permits were still held when the limit elapsed.
    pub async fn drain(&self, limit: Duration) -> bool {
        let wait = async {
            loop {
                let notified = self.state.idle.notified();
                if self.state.active.load(Ordering::Acquire) == 0 {
                    return;
                }
                notified.await;
            }
        };
        tokio::time::timeout(limit, wait).await.is_ok()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Permits currently held
    pub fn active(&self) -> usize {
        self.state.active.load(Ordering::Acquire)
    }

    /// Highest number of permits held at once
    pub fn peak(&self) -> usize {
        self.state.peak.load(Ordering::Acquire)
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }
}

impl Default for ConcurrencyGate {
    fn default() -> Self {
        Self::new(Self::DEFAULT_CAPACITY)
    }
}

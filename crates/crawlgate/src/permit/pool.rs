//! Fixed-capacity pool of crawl slots.
//!
//! Waiting is implicit in `acquire`: there is no queue structure to inspect.
//! Occupancy is sampled from the semaphore itself (`capacity - available`).

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;

use super::Lease;

#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum PermitError {
    #[error("No slot became available within {0:?}")]
    TimedOut(Duration),
    #[error("Slot pool is closed")]
    Closed,
}

/// Pool of crawl slots.
///
/// Shared between request handlers behind an `Arc`; all mutation goes through
/// `acquire`/`try_acquire` and lease release.
#[derive(Debug)]
pub struct SlotPool {
    semaphore: Arc<Semaphore>,
    capacity: usize,
}

impl SlotPool {
    /// Largest capacity the underlying semaphore can represent.
    pub const MAX_CAPACITY: usize = Semaphore::MAX_PERMITS;

    /// Create a pool with `capacity` slots. Zero is clamped to one so the
    /// service can always make progress; values above [`Self::MAX_CAPACITY`]
    /// are clamped down to it.
    pub fn new(capacity: usize) -> Self {
        let capacity = if capacity == 0 {
            tracing::warn!("Slot pool capacity 0 clamped to 1");
            1
        } else if capacity > Self::MAX_CAPACITY {
            tracing::warn!(
                requested = capacity,
                max = Self::MAX_CAPACITY,
                "Slot pool capacity clamped to maximum"
            );
            Self::MAX_CAPACITY
        } else {
            capacity
        };

        Self {
            semaphore: Arc::new(Semaphore::new(capacity)),
            capacity,
        }
    }

    /// Wait up to `wait` for a slot.
    ///
    /// On timeout nothing is held: the pending acquisition is dropped with the
    /// timed-out future.
    pub async fn acquire(&self, wait: Duration) -> Result<Lease, PermitError> {
        match tokio::time::timeout(wait, Arc::clone(&self.semaphore).acquire_owned()).await {
            Ok(Ok(permit)) => Ok(Lease::new(permit)),
            Ok(Err(_)) => Err(PermitError::Closed),
            Err(_) => Err(PermitError::TimedOut(wait)),
        }
    }

    pub fn try_acquire(&self) -> Option<Lease> {
        Arc::clone(&self.semaphore)
            .try_acquire_owned()
            .ok()
            .map(Lease::new)
    }

    /// Return a slot to the pool. Equivalent to `lease.release()`.
    pub fn release(&self, lease: Lease) {
        lease.release();
    }

    /// Stop handing out slots. Current and future waiters fail with `Closed`;
    /// leases already held stay valid until released.
    pub fn close(&self) {
        if !self.semaphore.is_closed() {
            tracing::info!(in_use = self.in_use(), "Closing slot pool");
            self.semaphore.close();
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    pub fn available(&self) -> usize {
        self.semaphore.available_permits()
    }

    /// Slots currently leased, derived from the semaphore's own count.
    pub fn in_use(&self) -> usize {
        self.capacity.saturating_sub(self.available())
    }
}

//! Lease - exclusive hold on one crawl slot.

use std::time::Duration;

use tokio::sync::OwnedSemaphorePermit;
use tokio::time::Instant;

/// A held crawl slot.
///
/// On drop: the slot returns to the pool. There is no way to return it early
/// and keep the lease, so every lease is released exactly once.
#[must_use = "dropping a Lease immediately returns the slot"]
#[derive(Debug)]
pub struct Lease {
    _permit: OwnedSemaphorePermit,
    acquired_at: Instant,
}

impl Lease {
    pub(super) fn new(permit: OwnedSemaphorePermit) -> Self {
        Self {
            _permit: permit,
            acquired_at: Instant::now(),
        }
    }

    /// How long this lease has been held.
    pub fn held_for(&self) -> Duration {
        self.acquired_at.elapsed()
    }

    /// Return the slot to the pool.
    pub fn release(self) {
        drop(self);
    }
}

impl Drop for Lease {
    fn drop(&mut self) {
        tracing::trace!(held_ms = self.held_for().as_millis() as u64, "Lease released");
    }
}

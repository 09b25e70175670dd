//! Admission control: bounded wait for a crawl slot.

use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;
use uuid::Uuid;

use crate::config::Limits;
use crate::outcome::Outcome;
use crate::permit::{Lease, PermitError, SlotPool};
use crate::request::{ExtractionOptions, ValidCrawl};

/// One inbound crawl, owned by the handler that created it.
#[derive(Debug, Clone)]
pub struct AdmissionRequest {
    pub id: Uuid,
    pub url: Url,
    pub options: ExtractionOptions,
    /// How long to wait for a slot.
    pub queue_timeout: Duration,
    /// Budget for the fetch once admitted. Independent of time spent queueing.
    pub crawl_timeout: Duration,
    pub received_at: Instant,
}

impl AdmissionRequest {
    pub fn new(crawl: ValidCrawl, limits: &Limits) -> Self {
        Self {
            id: Uuid::new_v4(),
            url: crawl.url,
            options: crawl.options,
            queue_timeout: limits.queue_timeout,
            crawl_timeout: limits.crawl_timeout,
            received_at: Instant::now(),
        }
    }
}

/// Hands out leases from the shared pool, giving up after the request's
/// queue budget.
#[derive(Debug, Clone)]
pub struct AdmissionController {
    pool: Arc<SlotPool>,
}

impl AdmissionController {
    pub fn new(pool: Arc<SlotPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &Arc<SlotPool> {
        &self.pool
    }

    /// Wait for a slot. On failure the request holds nothing and must not
    /// reach the backend.
    pub async fn admit(&self, request: &AdmissionRequest) -> Result<Lease, Outcome> {
        let start = Instant::now();

        match self.pool.acquire(request.queue_timeout).await {
            Ok(lease) => {
                tracing::debug!(
                    waited_ms = start.elapsed().as_millis() as u64,
                    in_use = self.pool.in_use(),
                    capacity = self.pool.capacity(),
                    "Admitted"
                );
                Ok(lease)
            }
            Err(PermitError::TimedOut(waited)) => {
                tracing::warn!(
                    waited_ms = waited.as_millis() as u64,
                    in_use = self.pool.in_use(),
                    capacity = self.pool.capacity(),
                    "Queue timeout, rejecting crawl"
                );
                Err(Outcome::admission_timeout(
                    request.url.as_str(),
                    request.queue_timeout,
                ))
            }
            Err(PermitError::Closed) => {
                tracing::warn!("Slot pool closed, rejecting crawl");
                Err(Outcome::shutting_down(
                    request.url.as_str(),
                    request.queue_timeout,
                ))
            }
        }
    }
}

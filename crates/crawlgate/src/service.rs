//! CrawlService: transport-agnostic crawl pipeline.
//!
//! This service owns:
//! - the slot pool (one per process, shared by every request)
//! - admission (bounded wait for a slot)
//! - execution (bounded fetch while holding the slot)
//!
//! Transports validate input, call [`CrawlService::crawl`], and render the
//! returned [`Outcome`].

use std::sync::Arc;

use tracing::Instrument;

use crate::admission::{AdmissionController, AdmissionRequest};
use crate::backend::Fetcher;
use crate::config::Limits;
use crate::coordinator::ExecutionCoordinator;
use crate::outcome::Outcome;
use crate::permit::SlotPool;
use crate::request::ValidCrawl;

/// Point-in-time view of slot usage, sampled from the pool.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlotSnapshot {
    pub capacity: usize,
    pub available: usize,
    pub in_use: usize,
}

impl SlotSnapshot {
    /// All slots taken; new crawls will queue.
    pub fn is_saturated(&self) -> bool {
        self.available == 0
    }
}

pub struct CrawlService {
    limits: Limits,
    pool: Arc<SlotPool>,
    admission: AdmissionController,
    coordinator: ExecutionCoordinator,
}

impl CrawlService {
    pub fn new(limits: Limits, fetcher: Arc<dyn Fetcher>) -> Self {
        let pool = Arc::new(SlotPool::new(limits.max_concurrent_crawls));
        let limits = Limits {
            max_concurrent_crawls: pool.capacity(),
            ..limits
        };

        Self {
            limits,
            admission: AdmissionController::new(Arc::clone(&pool)),
            coordinator: ExecutionCoordinator::new(fetcher),
            pool,
        }
    }

    pub fn limits(&self) -> &Limits {
        &self.limits
    }

    pub fn pool(&self) -> &Arc<SlotPool> {
        &self.pool
    }

    pub fn slots(&self) -> SlotSnapshot {
        SlotSnapshot {
            capacity: self.pool.capacity(),
            available: self.pool.available(),
            in_use: self.pool.in_use(),
        }
    }

    /// Admit and run one crawl.
    pub async fn crawl(&self, crawl: ValidCrawl) -> Outcome {
        let request = AdmissionRequest::new(crawl, &self.limits);
        let span = tracing::info_span!("crawl", request_id = %request.id, url = %request.url);

        async {
            tracing::info!(
                filter_threshold = request.options.filter_threshold,
                min_word_threshold = request.options.min_word_threshold,
                in_use = self.pool.in_use(),
                capacity = self.pool.capacity(),
                "Received crawl request"
            );

            let outcome = match self.admission.admit(&request).await {
                Ok(lease) => self.coordinator.execute(lease, &request).await,
                Err(outcome) => outcome,
            };

            tracing::info!(
                outcome = outcome.kind(),
                status = outcome.status().as_u16(),
                total_ms = request.received_at.elapsed().as_millis() as u64,
                "Crawl finished"
            );
            outcome
        }
        .instrument(span)
        .await
    }

    /// Stop admitting crawls. Requests already holding a slot finish normally.
    pub fn shutdown(&self) {
        self.pool.close();
    }
}

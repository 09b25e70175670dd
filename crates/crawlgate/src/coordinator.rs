//! Execution coordinator: runs an admitted crawl under its own budget.
//!
//! The lease is moved in and released before the outcome is returned, on
//! every path. If the caller drops the future mid-fetch, the lease is released
//! by its destructor and the backend's cancellation token fires.

use std::sync::Arc;

use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::admission::AdmissionRequest;
use crate::backend::{BackendError, FetchRequest, Fetcher};
use crate::outcome::Outcome;
use crate::permit::Lease;

#[derive(Clone)]
pub struct ExecutionCoordinator {
    fetcher: Arc<dyn Fetcher>,
}

impl ExecutionCoordinator {
    pub fn new(fetcher: Arc<dyn Fetcher>) -> Self {
        Self { fetcher }
    }

    pub async fn execute(&self, lease: Lease, request: &AdmissionRequest) -> Outcome {
        let budget = request.crawl_timeout;
        let url = request.url.as_str();
        let fetch_request = FetchRequest {
            url: request.url.clone(),
            options: request.options,
        };

        let cancel = CancellationToken::new();
        let cancel_on_drop = cancel.clone().drop_guard();
        let start = Instant::now();

        let result = tokio::time::timeout(
            budget,
            self.fetcher.fetch(&fetch_request, budget, cancel.clone()),
        )
        .await;
        let elapsed_ms = start.elapsed().as_millis() as u64;

        let outcome = match result {
            Ok(Ok(content)) => {
                tracing::info!(elapsed_ms, len = content.markdown.len(), "Crawl succeeded");
                Outcome::success(url, content, request.options.include_raw_markdown)
            }
            Ok(Err(BackendError::Timeout(backend_budget))) => {
                tracing::warn!(
                    elapsed_ms,
                    backend_budget_ms = backend_budget.as_millis() as u64,
                    "Backend timed out"
                );
                Outcome::execution_timeout(url, budget)
            }
            Ok(Err(error)) => {
                tracing::warn!(elapsed_ms, error = %error, "Crawl failed");
                Outcome::upstream_failure(url, &error)
            }
            Err(_) => {
                // The fetch future is already dropped; tell the backend too.
                cancel.cancel();
                tracing::warn!(elapsed_ms, budget_ms = budget.as_millis() as u64, "Crawl timed out");
                Outcome::execution_timeout(url, budget)
            }
        };

        cancel_on_drop.disarm();
        lease.release();
        outcome
    }
}

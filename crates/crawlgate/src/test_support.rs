//! Scripted fetcher for tests.

use std::collections::VecDeque;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use tokio::time::Instant;
use tokio_util::sync::CancellationToken;

use crate::backend::{BackendError, ExtractedContent, FetchRequest, Fetcher};

#[derive(Debug, Clone)]
pub(crate) enum Behavior {
    Succeed { delay: Duration, markdown: String },
    Fail { delay: Duration, error: BackendError },
    Hang,
}

impl Behavior {
    pub(crate) fn succeed_after(delay: Duration) -> Self {
        Behavior::Succeed {
            delay,
            markdown: "# mock page".to_string(),
        }
    }

    pub(crate) fn fail_after(delay: Duration, error: BackendError) -> Self {
        Behavior::Fail { delay, error }
    }
}

/// Fetcher that follows a script and records how it was driven.
///
/// Calls take behaviors from the queue in order, then fall back to the default.
pub(crate) struct MockFetcher {
    default: Behavior,
    queued: Mutex<VecDeque<Behavior>>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
    started: Mutex<Vec<Instant>>,
    tokens: Mutex<Vec<CancellationToken>>,
}

impl MockFetcher {
    pub(crate) fn new(default: Behavior) -> Self {
        Self {
            default,
            queued: Mutex::new(VecDeque::new()),
            calls: AtomicUsize::new(0),
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
            started: Mutex::new(Vec::new()),
            tokens: Mutex::new(Vec::new()),
        }
    }

    pub(crate) fn then(self, behavior: Behavior) -> Self {
        self.queued.lock().unwrap().push_back(behavior);
        self
    }

    pub(crate) fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    pub(crate) fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    pub(crate) fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    /// Start time of each call, in call order.
    pub(crate) fn started(&self) -> Vec<Instant> {
        self.started.lock().unwrap().clone()
    }

    /// Cancellation token handed to each call, in call order.
    pub(crate) fn tokens(&self) -> Vec<CancellationToken> {
        self.tokens.lock().unwrap().clone()
    }
}

struct InFlight<'a>(&'a AtomicUsize);

impl Drop for InFlight<'_> {
    fn drop(&mut self) {
        self.0.fetch_sub(1, Ordering::SeqCst);
    }
}

#[async_trait]
impl Fetcher for MockFetcher {
    async fn fetch(
        &self,
        _request: &FetchRequest,
        _timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ExtractedContent, BackendError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.started.lock().unwrap().push(Instant::now());
        self.tokens.lock().unwrap().push(cancel.clone());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        let _in_flight = InFlight(&self.in_flight);

        let behavior = self
            .queued
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| self.default.clone());

        let work = async move {
            match behavior {
                Behavior::Succeed { delay, markdown } => {
                    tokio::time::sleep(delay).await;
                    Ok(ExtractedContent {
                        raw_markdown: format!("{markdown}\n\n[raw](/)"),
                        markdown,
                    })
                }
                Behavior::Fail { delay, error } => {
                    tokio::time::sleep(delay).await;
                    Err(error)
                }
                Behavior::Hang => std::future::pending().await,
            }
        };

        tokio::select! {
            _ = cancel.cancelled() => Err(BackendError::Cancelled),
            result = work => result,
        }
    }
}

//! Fetch backend boundary.
//!
//! The execution coordinator only sees [`Fetcher`]. The shipped implementation
//! is [`HttpFetcher`], which downloads a page and renders it as markdown.

mod http;
mod markdown;

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::request::ExtractionOptions;

pub use http::{HttpFetcher, HttpFetcherConfig};
pub use markdown::{Block, BlockKind, parse_blocks, prune, render};

/// What to fetch and how to extract it.
#[derive(Debug, Clone)]
pub struct FetchRequest {
    pub url: Url,
    pub options: ExtractionOptions,
}

/// Extracted page content.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedContent {
    /// Filtered markdown.
    pub markdown: String,
    /// Markdown before filtering.
    pub raw_markdown: String,
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum BackendError {
    /// The backend's own timeout fired.
    #[error("backend timed out after {0:?}")]
    Timeout(Duration),
    /// The backend stopped because the cancellation token fired.
    #[error("fetch cancelled")]
    Cancelled,
    #[error("target unreachable: {0}")]
    Unreachable(String),
    #[error("target rejected the request: {0}")]
    Rejected(String),
    #[error("content extraction failed: {0}")]
    Extraction(String),
}

/// An expensive, cancellable page fetch.
///
/// Implementations must honour `timeout` as their own budget and stop work
/// promptly once `cancel` fires. Callers may also drop the returned future.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(
        &self,
        request: &FetchRequest,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ExtractedContent, BackendError>;
}

//! reqwest-backed fetcher.

use std::time::Duration;

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use super::markdown::{parse_blocks, prune, render};
use super::{BackendError, ExtractedContent, FetchRequest, Fetcher};
use crate::config::DEFAULT_MAX_BODY_BYTES;
use crate::version::CRAWLGATE_VERSION;

#[derive(Debug, Clone)]
pub struct HttpFetcherConfig {
    pub user_agent: String,
    /// Bodies larger than this are rejected.
    pub max_body_bytes: usize,
    pub max_redirects: usize,
}

impl Default for HttpFetcherConfig {
    fn default() -> Self {
        Self {
            user_agent: format!("crawlgate/{}", CRAWLGATE_VERSION),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
            max_redirects: 10,
        }
    }
}

/// Fetches pages over HTTP and converts HTML to markdown.
pub struct HttpFetcher {
    client: reqwest::Client,
    config: HttpFetcherConfig,
}

impl HttpFetcher {
    pub fn new(config: HttpFetcherConfig) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .user_agent(config.user_agent.clone())
            .redirect(reqwest::redirect::Policy::limited(config.max_redirects))
            .build()?;

        Ok(Self { client, config })
    }

    async fn download(
        &self,
        request: &FetchRequest,
        timeout: Duration,
    ) -> Result<ExtractedContent, BackendError> {
        let mut response = self
            .client
            .get(request.url.clone())
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| classify(e, timeout))?;

        let status = response.status();
        if !status.is_success() {
            return Err(BackendError::Rejected(format!("HTTP {}", status)));
        }

        if let Some(len) = response.content_length()
            && len > self.config.max_body_bytes as u64
        {
            return Err(too_large(self.config.max_body_bytes));
        }

        let is_html = response
            .headers()
            .get(reqwest::header::CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_none_or(|ct| ct.contains("html"));
        // Final URL after redirects, for resolving relative links.
        let base = response.url().clone();

        let body = self.read_body(&mut response, timeout).await?;
        let text = String::from_utf8_lossy(&body);

        if !is_html {
            return Ok(ExtractedContent {
                markdown: text.to_string(),
                raw_markdown: text.into_owned(),
            });
        }

        let blocks = parse_blocks(&text, Some(&base));
        let raw_markdown = render(&blocks);
        let markdown = render(prune(&blocks, &request.options));
        tracing::debug!(
            url = %request.url,
            blocks = blocks.len(),
            raw_len = raw_markdown.len(),
            len = markdown.len(),
            "Extracted markdown"
        );

        Ok(ExtractedContent {
            markdown,
            raw_markdown,
        })
    }

    /// Read the body chunk by chunk, giving up as soon as it passes the cap.
    /// Chunked responses carry no length, so the header check alone is not enough.
    async fn read_body(
        &self,
        response: &mut reqwest::Response,
        timeout: Duration,
    ) -> Result<Vec<u8>, BackendError> {
        let limit = self.config.max_body_bytes;
        let mut body = Vec::new();

        while let Some(chunk) = response.chunk().await.map_err(|e| classify(e, timeout))? {
            if body.len() + chunk.len() > limit {
                tracing::debug!(read = body.len() + chunk.len(), limit, "Response body over limit");
                return Err(too_large(limit));
            }
            body.extend_from_slice(&chunk);
        }

        Ok(body)
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(
        &self,
        request: &FetchRequest,
        timeout: Duration,
        cancel: CancellationToken,
    ) -> Result<ExtractedContent, BackendError> {
        tokio::select! {
            _ = cancel.cancelled() => {
                tracing::debug!(url = %request.url, "Fetch cancelled");
                Err(BackendError::Cancelled)
            }
            result = self.download(request, timeout) => result,
        }
    }
}

fn classify(error: reqwest::Error, timeout: Duration) -> BackendError {
    if error.is_timeout() {
        BackendError::Timeout(timeout)
    } else if error.is_connect() || error.is_request() || error.is_redirect() {
        BackendError::Unreachable(error.to_string())
    } else if error.is_body() || error.is_decode() {
        BackendError::Extraction(error.to_string())
    } else {
        BackendError::Unreachable(error.to_string())
    }
}

fn too_large(limit: usize) -> BackendError {
    BackendError::Rejected(format!("response body exceeds {} bytes", limit))
}

//! Crawl request parsing and validation.
//!
//! Validation happens before admission is attempted, so a rejected request
//! never waits for or holds a slot.

use serde::Deserialize;
use url::Url;

/// Longest URL accepted, matching common browser limits.
pub const MAX_URL_LENGTH: usize = 2083;

pub const DEFAULT_FILTER_THRESHOLD: f64 = 0.48;

#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum InputError {
    #[error("request body is not valid JSON: {0}")]
    MalformedBody(String),
    #[error("field `url` is required")]
    MissingUrl,
    #[error("invalid url: {0}")]
    InvalidUrl(String),
    #[error("`filter_threshold` must be between 0 and 1, got {0}")]
    FilterThreshold(f64),
}

/// Raw `POST /crawl` body. Unknown fields are ignored.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct CrawlRequest {
    #[serde(default)]
    pub url: Option<String>,
    #[serde(default)]
    pub filter_threshold: Option<f64>,
    #[serde(default)]
    pub min_word_threshold: Option<usize>,
    #[serde(default)]
    pub include_raw_markdown: bool,
}

/// Content extraction knobs passed through to the fetch backend.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ExtractionOptions {
    /// Minimum share of non-link words for a text block to survive filtering.
    pub filter_threshold: f64,
    /// Minimum word count for a text block to survive filtering.
    pub min_word_threshold: usize,
    pub include_raw_markdown: bool,
}

impl Default for ExtractionOptions {
    fn default() -> Self {
        Self {
            filter_threshold: DEFAULT_FILTER_THRESHOLD,
            min_word_threshold: 0,
            include_raw_markdown: false,
        }
    }
}

/// A request that passed validation and may be admitted.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidCrawl {
    pub url: Url,
    pub options: ExtractionOptions,
}

/// A request that failed validation, with whatever URL could be recovered
/// from the body for the error payload.
#[derive(Debug, Clone, PartialEq)]
pub struct Rejected {
    pub url: String,
    pub error: InputError,
}

impl CrawlRequest {
    /// Parse and validate a raw JSON body.
    pub fn parse(body: &[u8]) -> Result<ValidCrawl, Rejected> {
        let request: CrawlRequest = serde_json::from_slice(body).map_err(|e| Rejected {
            url: recover_url(body),
            error: InputError::MalformedBody(e.to_string()),
        })?;
        let url = request.url.clone().unwrap_or_default();
        request.validate().map_err(|error| Rejected { url, error })
    }

    pub fn validate(self) -> Result<ValidCrawl, InputError> {
        let raw = self.url.ok_or(InputError::MissingUrl)?;
        let url = validate_url(&raw)?;

        let filter_threshold = self.filter_threshold.unwrap_or(DEFAULT_FILTER_THRESHOLD);
        if !(0.0..=1.0).contains(&filter_threshold) {
            return Err(InputError::FilterThreshold(filter_threshold));
        }

        Ok(ValidCrawl {
            url,
            options: ExtractionOptions {
                filter_threshold,
                min_word_threshold: self.min_word_threshold.unwrap_or(0),
                include_raw_markdown: self.include_raw_markdown,
            },
        })
    }
}

fn validate_url(raw: &str) -> Result<Url, InputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(InputError::InvalidUrl("url is empty".to_string()));
    }
    if raw.len() > MAX_URL_LENGTH {
        return Err(InputError::InvalidUrl(format!(
            "url exceeds {MAX_URL_LENGTH} characters"
        )));
    }

    let url = Url::parse(raw).map_err(|e| InputError::InvalidUrl(e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") {
        return Err(InputError::InvalidUrl(format!(
            "scheme `{}` is not supported, expected http or https",
            url.scheme()
        )));
    }
    if url.host_str().is_none_or(str::is_empty) {
        return Err(InputError::InvalidUrl("url has no host".to_string()));
    }
    Ok(url)
}

/// Best-effort `url` lookup in a body that failed typed deserialization.
fn recover_url(body: &[u8]) -> String {
    serde_json::from_slice::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("url").and_then(|u| u.as_str()).map(String::from))
        .unwrap_or_default()
}

//! Crawl outcomes and their HTTP classification.
//!
//! | Outcome            | Status |
//! |--------------------|--------|
//! | `Success`          | 200    |
//! | `InvalidInput`     | 400    |
//! | `AdmissionTimeout` | 503 + `Retry-After` |
//! | `ExecutionTimeout` | 502    |
//! | `UpstreamFailure`  | 502    |
//!
//! Timestamps are taken when the outcome is constructed, not when the request
//! arrived.

use std::time::Duration;

use axum::http::{HeaderValue, StatusCode, header};
use axum::response::{IntoResponse, Json, Response};
use chrono::{DateTime, Utc};
use serde::Serialize;

use crate::backend::{BackendError, ExtractedContent};
use crate::request::InputError;

/// Successful crawl payload.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CrawlSuccess {
    pub success: bool,
    pub url: String,
    pub markdown: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_markdown: Option<String>,
    pub timestamp: DateTime<Utc>,
}

/// Error payload shared by every non-success outcome.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Failure {
    pub success: bool,
    pub url: String,
    pub error: String,
    pub timestamp: DateTime<Utc>,
}

impl Failure {
    fn new(url: impl Into<String>, error: String) -> Self {
        Self {
            success: false,
            url: url.into(),
            error,
            timestamp: Utc::now(),
        }
    }
}

/// Exactly one per crawl request.
#[derive(Debug, Clone, PartialEq)]
pub enum Outcome {
    Success(CrawlSuccess),
    InvalidInput(Failure),
    AdmissionTimeout {
        failure: Failure,
        retry_after: Duration,
    },
    ExecutionTimeout(Failure),
    UpstreamFailure(Failure),
}

impl Outcome {
    pub fn success(url: impl Into<String>, content: ExtractedContent, include_raw: bool) -> Self {
        Outcome::Success(CrawlSuccess {
            success: true,
            url: url.into(),
            markdown: content.markdown,
            raw_markdown: include_raw.then_some(content.raw_markdown),
            timestamp: Utc::now(),
        })
    }

    pub fn invalid_input(url: impl Into<String>, error: &InputError) -> Self {
        Outcome::InvalidInput(Failure::new(url, format!("Invalid request: {}", error)))
    }

    pub fn admission_timeout(url: impl Into<String>, queue_timeout: Duration) -> Self {
        Outcome::AdmissionTimeout {
            failure: Failure::new(
                url,
                format!(
                    "Service too busy: no crawl slot became available within {}s, retry later",
                    format_secs(queue_timeout)
                ),
            ),
            retry_after: queue_timeout,
        }
    }

    /// The pool was closed while the request waited.
    pub fn shutting_down(url: impl Into<String>, retry_after: Duration) -> Self {
        Outcome::AdmissionTimeout {
            failure: Failure::new(url, "Service is shutting down, retry later".to_string()),
            retry_after,
        }
    }

    pub fn execution_timeout(url: impl Into<String>, budget: Duration) -> Self {
        Outcome::ExecutionTimeout(Failure::new(
            url,
            format!(
                "Crawl operation timed out after {} seconds",
                format_secs(budget)
            ),
        ))
    }

    pub fn upstream_failure(url: impl Into<String>, error: &BackendError) -> Self {
        Outcome::UpstreamFailure(Failure::new(url, format!("Failed to crawl URL: {}", error)))
    }

    pub fn status(&self) -> StatusCode {
        match self {
            Outcome::Success(_) => StatusCode::OK,
            Outcome::InvalidInput(_) => StatusCode::BAD_REQUEST,
            Outcome::AdmissionTimeout { .. } => StatusCode::SERVICE_UNAVAILABLE,
            Outcome::ExecutionTimeout(_) | Outcome::UpstreamFailure(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// Whole seconds for the `Retry-After` header, rounded up, at least 1.
    pub fn retry_after_secs(&self) -> Option<u64> {
        match self {
            Outcome::AdmissionTimeout { retry_after, .. } => {
                let secs = retry_after.as_secs() + u64::from(retry_after.subsec_nanos() > 0);
                Some(secs.max(1))
            }
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            Outcome::Success(_) => "success",
            Outcome::InvalidInput(_) => "invalid_input",
            Outcome::AdmissionTimeout { .. } => "admission_timeout",
            Outcome::ExecutionTimeout(_) => "execution_timeout",
            Outcome::UpstreamFailure(_) => "upstream_failure",
        }
    }

    pub fn failure(&self) -> Option<&Failure> {
        match self {
            Outcome::Success(_) => None,
            Outcome::InvalidInput(f)
            | Outcome::AdmissionTimeout { failure: f, .. }
            | Outcome::ExecutionTimeout(f)
            | Outcome::UpstreamFailure(f) => Some(f),
        }
    }

    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success(_))
    }
}

impl IntoResponse for Outcome {
    fn into_response(self) -> Response {
        let status = self.status();
        let retry_after = self.retry_after_secs();

        let mut response = match self {
            Outcome::Success(body) => (status, Json(body)).into_response(),
            Outcome::InvalidInput(body)
            | Outcome::AdmissionTimeout { failure: body, .. }
            | Outcome::ExecutionTimeout(body)
            | Outcome::UpstreamFailure(body) => (status, Json(body)).into_response(),
        };

        if let Some(secs) = retry_after {
            response
                .headers_mut()
                .insert(header::RETRY_AFTER, HeaderValue::from(secs));
        }
        response
    }
}

fn format_secs(d: Duration) -> String {
    if d.subsec_nanos() == 0 {
        d.as_secs().to_string()
    } else {
        format!("{:.1}", d.as_secs_f64())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn content() -> ExtractedContent {
        ExtractedContent {
            markdown: "# Example".to_string(),
            raw_markdown: "[Home](/)\n\n# Example".to_string(),
        }
    }

    #[test]
    fn status_classification() {
        let url = "https://example.com/";
        assert_eq!(Outcome::success(url, content(), false).status(), StatusCode::OK);
        assert_eq!(
            Outcome::invalid_input(url, &InputError::MissingUrl).status(),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(
            Outcome::admission_timeout(url, Duration::from_secs(60)).status(),
            StatusCode::SERVICE_UNAVAILABLE
        );
        assert_eq!(
            Outcome::execution_timeout(url, Duration::from_secs(30)).status(),
            StatusCode::BAD_GATEWAY
        );
        assert_eq!(
            Outcome::upstream_failure(url, &BackendError::Unreachable("dns".into())).status(),
            StatusCode::BAD_GATEWAY
        );
    }

    #[test]
    fn retry_after_only_for_admission_timeout() {
        let url = "https://example.com/";
        assert_eq!(
            Outcome::admission_timeout(url, Duration::from_secs(60)).retry_after_secs(),
            Some(60)
        );
        assert_eq!(
            Outcome::admission_timeout(url, Duration::from_millis(1500)).retry_after_secs(),
            Some(2)
        );
        assert_eq!(
            Outcome::admission_timeout(url, Duration::from_millis(10)).retry_after_secs(),
            Some(1)
        );
        assert_eq!(
            Outcome::execution_timeout(url, Duration::from_secs(30)).retry_after_secs(),
            None
        );
    }

    #[test]
    fn error_messages() {
        let url = "https://example.com/";
        let timeout = Outcome::execution_timeout(url, Duration::from_secs(30));
        assert_eq!(
            timeout.failure().unwrap().error,
            "Crawl operation timed out after 30 seconds"
        );

        let busy = Outcome::admission_timeout(url, Duration::from_millis(2500));
        assert!(busy.failure().unwrap().error.starts_with("Service too busy"));
        assert!(busy.failure().unwrap().error.contains("2.5s"));

        let upstream =
            Outcome::upstream_failure(url, &BackendError::Rejected("HTTP 500".to_string()));
        assert_eq!(
            upstream.failure().unwrap().error,
            "Failed to crawl URL: target rejected the request: HTTP 500"
        );

        let invalid = Outcome::invalid_input("", &InputError::MissingUrl);
        assert_eq!(
            invalid.failure().unwrap().error,
            "Invalid request: field `url` is required"
        );
    }

    #[test]
    fn failure_payload_shape() {
        let outcome = Outcome::upstream_failure(
            "https://example.com/",
            &BackendError::Unreachable("connection refused".to_string()),
        );
        let json = serde_json::to_value(outcome.failure().unwrap()).unwrap();

        assert_eq!(json["success"], false);
        assert_eq!(json["url"], "https://example.com/");
        assert!(json["error"].as_str().unwrap().contains("connection refused"));
        let ts = json["timestamp"].as_str().unwrap();
        assert!(DateTime::parse_from_rfc3339(ts).is_ok(), "not ISO 8601: {ts}");
    }

    #[test]
    fn kind_names_each_variant() {
        let url = "https://example.com/";
        let kinds = [
            Outcome::success(url, content(), false).kind(),
            Outcome::invalid_input(url, &InputError::MissingUrl).kind(),
            Outcome::admission_timeout(url, Duration::from_secs(1)).kind(),
            Outcome::execution_timeout(url, Duration::from_secs(1)).kind(),
            Outcome::upstream_failure(url, &BackendError::Cancelled).kind(),
        ];
        assert_eq!(
            kinds,
            [
                "success",
                "invalid_input",
                "admission_timeout",
                "execution_timeout",
                "upstream_failure"
            ]
        );
    }

    #[test]
    fn raw_markdown_only_when_requested() {
        let Outcome::Success(without) = Outcome::success("u", content(), false) else {
            panic!("expected success");
        };
        let json = serde_json::to_value(&without).unwrap();
        assert!(json.get("raw_markdown").is_none());
        assert_eq!(json["success"], true);
        assert_eq!(json["markdown"], "# Example");

        let Outcome::Success(with) = Outcome::success("u", content(), true) else {
            panic!("expected success");
        };
        let json = serde_json::to_value(&with).unwrap();
        assert_eq!(json["raw_markdown"], "[Home](/)\n\n# Example");
    }

    #[test]
    fn timestamp_taken_at_construction() {
        let before = Utc::now();
        std::thread::sleep(Duration::from_millis(5));
        let outcome = Outcome::execution_timeout("u", Duration::from_secs(1));
        assert!(outcome.failure().unwrap().timestamp > before);
    }

    #[test]
    fn response_carries_retry_after_header() {
        let response =
            Outcome::admission_timeout("u", Duration::from_secs(60)).into_response();
        assert_eq!(response.status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(response.headers()[header::RETRY_AFTER], "60");

        let response = Outcome::execution_timeout("u", Duration::from_secs(1)).into_response();
        assert!(response.headers().get(header::RETRY_AFTER).is_none());
    }
}

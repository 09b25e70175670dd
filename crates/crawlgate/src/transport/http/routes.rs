//! HTTP route handlers.

use std::sync::Arc;

use axum::{
    Router,
    body::Bytes,
    extract::State,
    response::Json,
    routing::{get, post},
};

use crate::health::HealthResponse;
use crate::outcome::Outcome;
use crate::request::CrawlRequest;
use crate::service::CrawlService;

async fn health(State(service): State<Arc<CrawlService>>) -> Json<HealthResponse> {
    let slots = service.slots();
    tracing::trace!(
        in_use = slots.in_use,
        capacity = slots.capacity,
        saturated = slots.is_saturated(),
        "Health check"
    );
    Json(HealthResponse::default())
}

/// Body is read as raw bytes so malformed JSON still gets the crawl error
/// shape instead of axum's plain-text rejection.
async fn crawl(State(service): State<Arc<CrawlService>>, body: Bytes) -> Outcome {
    match CrawlRequest::parse(&body) {
        Ok(crawl) => service.crawl(crawl).await,
        Err(rejected) => {
            tracing::info!(url = %rejected.url, error = %rejected.error, "Rejected crawl request");
            Outcome::invalid_input(rejected.url, &rejected.error)
        }
    }
}

pub fn routes(service: Arc<CrawlService>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/crawl", post(crawl))
        .with_state(service)
}

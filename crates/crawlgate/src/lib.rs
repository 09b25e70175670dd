//! crawlgate: admission-controlled crawl service.

mod health;
mod version;

pub mod admission;
pub mod backend;
pub mod config;
pub mod coordinator;
pub mod outcome;
pub mod permit;
pub mod request;
pub mod service;
pub mod transport;

#[cfg(test)]
mod test_support;

pub use admission::{AdmissionController, AdmissionRequest};
pub use backend::{
    BackendError, ExtractedContent, FetchRequest, Fetcher, HttpFetcher, HttpFetcherConfig,
};
pub use config::{ConfigError, Limits, Settings};
pub use coordinator::ExecutionCoordinator;
pub use health::{HealthResponse, HealthStatus};
pub use outcome::Outcome;
pub use permit::{Lease, PermitError, SlotPool};
pub use request::{CrawlRequest, ExtractionOptions, InputError, ValidCrawl};
pub use service::{CrawlService, SlotSnapshot};
pub use version::CRAWLGATE_VERSION;

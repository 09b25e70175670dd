//! crawlgate server entrypoint.

use std::sync::Arc;

use anyhow::Context;
use crawlgate::{CRAWLGATE_VERSION, CrawlService, HttpFetcher, HttpFetcherConfig, Settings};
use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

/// Initialize tracing. `RUST_LOG` overrides `LOG_LEVEL`; `LOG_FORMAT=json`
/// switches to JSON output. Always writes to stderr.
fn init_tracing() {
    let filter = if std::env::var("RUST_LOG").is_ok() {
        EnvFilter::from_default_env()
    } else {
        let level = std::env::var("LOG_LEVEL").or_else(|_| std::env::var("log_level"));
        let base_level = match level.as_deref().map(str::to_lowercase) {
            Ok(level) if level == "debug" => "debug",
            Ok(level) if level == "warn" || level == "warning" => "warn",
            Ok(level) if level == "error" => "error",
            _ => "info",
        };

        let filter_str = format!(
            "crawlgate={level},crawlgate_server={level}",
            level = base_level
        );

        EnvFilter::new(filter_str)
    };

    let use_json = std::env::var("LOG_FORMAT").as_deref() == Ok("json");

    if use_json {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().json().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    } else {
        let subscriber = tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(std::io::stderr));
        let _ = subscriber.try_init();
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();

    let settings = Settings::from_env().context("invalid configuration")?;
    tracing::info!(version = CRAWLGATE_VERSION, ?settings, "Loaded configuration");

    let fetcher = HttpFetcher::new(HttpFetcherConfig {
        max_body_bytes: settings.max_body_bytes,
        ..HttpFetcherConfig::default()
    })
    .context("failed to build HTTP client")?;

    let service = Arc::new(CrawlService::new(settings.limits, Arc::new(fetcher)));

    crawlgate::transport::serve(settings.server_config(), service).await
}

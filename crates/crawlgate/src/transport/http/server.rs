//! HTTP server implementation.

use std::net::SocketAddr;
use std::sync::Arc;

use tokio::net::TcpListener;
use tracing::info;

use crate::service::CrawlService;

use super::routes::routes;

#[derive(Debug, Clone)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

/// Start the HTTP server with provided service. Runs until SIGINT or SIGTERM.
pub async fn serve(config: ServerConfig, service: Arc<CrawlService>) -> anyhow::Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.host, config.port).parse()?;
    let listener = TcpListener::bind(addr).await?;

    serve_with_shutdown(listener, service, shutdown_signal()).await
}

/// Serve on an already bound listener until `signal` resolves.
///
/// When the signal fires the slot pool is closed before connections drain:
/// requests still queued for a slot fail at once with 503, while crawls that
/// hold a slot run to completion.
pub async fn serve_with_shutdown<F>(
    listener: TcpListener,
    service: Arc<CrawlService>,
    signal: F,
) -> anyhow::Result<()>
where
    F: Future<Output = ()> + Send + 'static,
{
    let actual_addr = listener.local_addr()?;
    let app = routes(Arc::clone(&service));

    let limits = service.limits();
    info!(
        max_concurrent_crawls = limits.max_concurrent_crawls,
        queue_timeout_secs = limits.queue_timeout.as_secs_f64(),
        crawl_timeout_secs = limits.crawl_timeout.as_secs_f64(),
        "Starting crawlgate server on {}",
        actual_addr
    );

    let drain = async move {
        signal.await;
        service.shutdown();
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(drain)
        .await?;

    info!("Server shutdown complete");

    Ok(())
}

/// Wait for SIGTERM or SIGINT.
///
/// # Panics
///
/// Panics if signal handlers cannot be installed. That is a runtime
/// misconfiguration and should fail fast at startup.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler - is tokio runtime configured correctly?");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("failed to install SIGTERM handler - is tokio runtime configured correctly?")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received SIGINT, shutting down...");
        }
        _ = terminate => {
            info!("Received SIGTERM, shutting down...");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Limits;
    use crate::test_support::{Behavior, MockFetcher};
    use std::time::Duration;

    #[test]
    fn server_config_default() {
        let config = ServerConfig::default();
        assert_eq!(config.host, "0.0.0.0");
        assert_eq!(config.port, 8000);
    }

    #[tokio::test]
    async fn shutdown_fails_queued_requests_immediately() {
        let limits = Limits {
            max_concurrent_crawls: 1,
            queue_timeout: Duration::from_secs(60),
            crawl_timeout: Duration::from_secs(30),
        };
        let service = Arc::new(CrawlService::new(
            limits,
            Arc::new(MockFetcher::new(Behavior::Hang)),
        ));
        // Occupy the only slot so the next crawl has to queue.
        let held = service.pool().try_acquire().unwrap();

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let (trigger, signal) = tokio::sync::oneshot::channel::<()>();
        let server = tokio::spawn(serve_with_shutdown(listener, Arc::clone(&service), async move {
            let _ = signal.await;
        }));

        let queued = tokio::spawn(async move {
            reqwest::Client::new()
                .post(format!("http://{addr}/crawl"))
                .header("content-type", "application/json")
                .body(r#"{"url":"https://example.com"}"#)
                .send()
                .await
                .unwrap()
        });

        // Let the request reach the slot queue.
        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(service.slots().in_use, 1);

        let start = std::time::Instant::now();
        trigger.send(()).unwrap();

        let response = tokio::time::timeout(Duration::from_secs(5), queued)
            .await
            .expect("queued request should finish promptly after shutdown")
            .unwrap();
        assert_eq!(response.status().as_u16(), 503);
        assert!(response.headers().contains_key("retry-after"));
        let json: serde_json::Value =
            serde_json::from_slice(&response.bytes().await.unwrap()).unwrap();
        assert!(json["error"].as_str().unwrap().contains("shutting down"));
        assert!(start.elapsed() < Duration::from_secs(5));

        tokio::time::timeout(Duration::from_secs(5), server)
            .await
            .expect("server should stop once queued requests are answered")
            .unwrap()
            .unwrap();
        assert!(service.pool().try_acquire().is_none());
        held.release();
    }
}

//! Environment configuration.
//!
//! Read once at startup. Names and defaults:
//! - `HOST` (0.0.0.0), `PORT` (8000)
//! - `MAX_CONCURRENT_CRAWLS` (3, values below 1 clamped to 1)
//! - `QUEUE_TIMEOUT` seconds (60), `CRAWL_TIMEOUT` seconds (30)
//! - `MAX_BODY_BYTES` (10 MiB)
//!
//! Lowercase spellings of each name are accepted when the uppercase one is
//! unset. `LOG_LEVEL` and `LOG_FORMAT` are consumed by the server's tracing
//! setup.

use std::str::FromStr;
use std::time::Duration;

use crate::permit::SlotPool;
use crate::transport::ServerConfig;

pub const DEFAULT_MAX_CONCURRENT_CRAWLS: usize = 3;
pub const DEFAULT_QUEUE_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_CRAWL_TIMEOUT: Duration = Duration::from_secs(30);
pub const DEFAULT_MAX_BODY_BYTES: usize = 10 * 1024 * 1024;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("{name}={value:?} is not a valid {expected}")]
    Invalid {
        name: &'static str,
        value: String,
        expected: &'static str,
    },
    #[error("{0} must be greater than zero")]
    NotPositive(&'static str),
}

/// Concurrency and timeout budgets for the crawl pipeline.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Limits {
    /// Slot pool capacity, always >= 1.
    pub max_concurrent_crawls: usize,
    /// How long a request may wait for a slot.
    pub queue_timeout: Duration,
    /// Budget for the fetch itself once a slot is held.
    pub crawl_timeout: Duration,
}

impl Default for Limits {
    fn default() -> Self {
        Self {
            max_concurrent_crawls: DEFAULT_MAX_CONCURRENT_CRAWLS,
            queue_timeout: DEFAULT_QUEUE_TIMEOUT,
            crawl_timeout: DEFAULT_CRAWL_TIMEOUT,
        }
    }
}

#[derive(Debug, Clone)]
pub struct Settings {
    pub host: String,
    pub port: u16,
    pub limits: Limits,
    pub max_body_bytes: usize,
}

impl Default for Settings {
    fn default() -> Self {
        let server = ServerConfig::default();
        Self {
            host: server.host,
            port: server.port,
            limits: Limits::default(),
            max_body_bytes: DEFAULT_MAX_BODY_BYTES,
        }
    }
}

impl Settings {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Build settings from an arbitrary variable source.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        // Names are matched as written, then in lowercase.
        let get = |name: &str| {
            lookup(name)
                .or_else(|| lookup(&name.to_ascii_lowercase()))
                .filter(|v| !v.trim().is_empty())
        };

        let host = get("HOST").unwrap_or(defaults.host);
        let port = parse_var(&get, "PORT", "port number")?.unwrap_or(defaults.port);

        let max_concurrent_crawls = match parse_var::<i64>(&get, "MAX_CONCURRENT_CRAWLS", "integer")? {
            Some(n) if n < 1 => {
                tracing::warn!(
                    configured = n,
                    "MAX_CONCURRENT_CRAWLS below 1, clamping to 1"
                );
                1
            }
            Some(n) => usize::try_from(n)
                .ok()
                .filter(|&n| n <= SlotPool::MAX_CAPACITY)
                .ok_or_else(|| ConfigError::Invalid {
                    name: "MAX_CONCURRENT_CRAWLS",
                    value: n.to_string(),
                    expected: "slot count",
                })?,
            None => defaults.limits.max_concurrent_crawls,
        };

        let queue_timeout = parse_seconds(&get, "QUEUE_TIMEOUT")?
            .unwrap_or(defaults.limits.queue_timeout);
        let crawl_timeout = parse_seconds(&get, "CRAWL_TIMEOUT")?
            .unwrap_or(defaults.limits.crawl_timeout);

        let max_body_bytes = parse_var::<usize>(&get, "MAX_BODY_BYTES", "byte count")?
            .unwrap_or(defaults.max_body_bytes);
        if max_body_bytes == 0 {
            return Err(ConfigError::NotPositive("MAX_BODY_BYTES"));
        }

        Ok(Self {
            host,
            port,
            limits: Limits {
                max_concurrent_crawls,
                queue_timeout,
                crawl_timeout,
            },
            max_body_bytes,
        })
    }

    pub fn server_config(&self) -> ServerConfig {
        ServerConfig {
            host: self.host.clone(),
            port: self.port,
        }
    }
}

fn parse_var<T: FromStr>(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
    expected: &'static str,
) -> Result<Option<T>, ConfigError> {
    let Some(raw) = get(name) else {
        return Ok(None);
    };
    raw.trim()
        .parse::<T>()
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: raw,
            expected,
        })
}

/// Seconds as a positive number; fractional values are accepted.
fn parse_seconds(
    get: &impl Fn(&str) -> Option<String>,
    name: &'static str,
) -> Result<Option<Duration>, ConfigError> {
    let Some(secs) = parse_var::<f64>(get, name, "number of seconds")? else {
        return Ok(None);
    };
    if !secs.is_finite() || secs <= 0.0 {
        return Err(ConfigError::NotPositive(name));
    }
    Duration::try_from_secs_f64(secs)
        .map(Some)
        .map_err(|_| ConfigError::Invalid {
            name,
            value: secs.to_string(),
            expected: "number of seconds",
        })
}

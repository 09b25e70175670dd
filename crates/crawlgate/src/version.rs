//! Version information for crawlgate.

/// crawlgate version from Cargo.toml
pub const CRAWLGATE_VERSION: &str = env!("CARGO_PKG_VERSION");

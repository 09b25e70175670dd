//! Transport layer for crawlgate.
//!
//! HTTP via axum is the only transport.

pub mod http;

pub use http::{ServerConfig, routes, serve, serve_with_shutdown};

//! Middleware for the drinks service.
//!
//! # Components
//!
//! - `auth` - Bearer token extractor for protected handlers
//! - `http_metrics` - HTTP request metrics middleware

pub mod auth;
pub mod http_metrics;

pub use auth::extract_bearer_token;
pub use http_metrics::http_metrics_middleware;

//! Drinks Service Library
//!
//! A drink catalog served over HTTP. Anyone may list drinks in their short
//! form; reading recipes with quantities and every mutation require a bearer
//! token from the configured identity provider carrying the matching
//! permission.
//!
//! # Architecture
//!
//! ```text
//! routes/mod.rs -> handlers/*.rs -> repositories/*.rs
//!                       |
//!                 auth (extractor + permission gate)
//! ```
//!
//! # Modules
//!
//! - `auth` - Token verification against the provider's JWKS, permission gate
//! - `config` - Service configuration from environment
//! - `errors` - Error types with HTTP status code mapping
//! - `handlers` - HTTP request handlers
//! - `middleware` - Bearer token extraction, HTTP metrics
//! - `models` - Drink entity, projections, request and response bodies
//! - `observability` - Prometheus metrics
//! - `repositories` - `DrinkStore` trait with Postgres and in-memory stores
//! - `routes` - Axum router setup

pub mod auth;
pub mod config;
pub mod errors;
pub mod handlers;
pub mod middleware;
pub mod models;
pub mod observability;
pub mod repositories;
pub mod routes;

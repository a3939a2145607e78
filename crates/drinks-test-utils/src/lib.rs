//! # Drinks Test Utilities
//!
//! Shared test utilities for the drinks service.
//!
//! This crate provides:
//! - Deterministic Ed25519 signing keys published as JWKs (`TestKeypair`)
//! - Claim builders for valid and broken tokens (`TestTokenBuilder`)
//! - Server test harness (`TestDrinksServer` for E2E tests)
//!
//! ## Usage
//!
//! ```rust,ignore
//! use drinks_test_utils::*;
//!
//! #[tokio::test]
//! async fn test_example() -> Result<()> {
//!     let server = TestDrinksServer::spawn().await?;
//!     let response = reqwest::get(format!("{}/drinks", server.url())).await?;
//!
//!     assert_eq!(response.status(), 200);
//!     Ok(())
//! }
//! ```

pub mod crypto_fixtures;
pub mod server_harness;
pub mod token_builders;

// Re-export commonly used items
pub use crypto_fixtures::*;
pub use server_harness::*;
pub use token_builders::*;

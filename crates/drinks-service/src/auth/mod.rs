//! Authentication and authorization for the drinks API.
//!
//! Verifies bearer tokens issued by the identity provider against its
//! published signing keys, then gates operations on the `permissions` claim.

pub mod claims;
pub mod jwks;
pub mod jwt;
pub mod permissions;

pub use claims::AuthClaims;
pub use jwks::{Jwk, JwksClient, JwksResponse};
pub use jwt::{JwtValidator, ValidationPolicy};
pub use permissions::{authorize, Permission};

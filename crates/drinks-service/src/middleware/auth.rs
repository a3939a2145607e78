//! Bearer token extraction.
//!
//! [`AuthClaims`] is an axum extractor: a handler that takes it as an
//! argument only runs once the request carries a valid bearer token.
//! Handlers that do not name it stay public, which lets public and
//! protected methods share a path.

use crate::auth::AuthClaims;
use crate::errors::DrinksError;
use crate::observability::metrics::record_auth_failure;
use crate::routes::AppState;
use axum::{
    async_trait,
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts, HeaderMap},
};
use std::sync::Arc;
use tracing::instrument;

/// Extract the token from an `Authorization: Bearer <token>` header.
///
/// The scheme is case-sensitive and the value must split into exactly two
/// space-separated parts.
pub fn extract_bearer_token(headers: &HeaderMap) -> Result<&str, DrinksError> {
    let header = headers.get(AUTHORIZATION).ok_or_else(|| {
        tracing::debug!(target: "drinks.middleware.auth", "Missing Authorization header");
        DrinksError::AuthHeaderMissing
    })?;

    let value = header.to_str().map_err(|_| {
        tracing::debug!(target: "drinks.middleware.auth", "Authorization header is not valid UTF-8");
        DrinksError::AuthHeaderMalformed
    })?;

    match value.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() && !token.contains(' ') => Ok(token),
        _ => {
            tracing::debug!(target: "drinks.middleware.auth", "Invalid Authorization header format");
            Err(DrinksError::AuthHeaderMalformed)
        }
    }
}

#[async_trait]
impl FromRequestParts<Arc<AppState>> for AuthClaims {
    type Rejection = DrinksError;

    #[instrument(skip_all, name = "drinks.middleware.auth")]
    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let result = match extract_bearer_token(&parts.headers) {
            Ok(token) => state.jwt_validator.validate(token).await,
            Err(e) => Err(e),
        };

        if let Err(e) = &result {
            tracing::debug!(target: "drinks.middleware.auth", code = e.code(), "Request rejected");
            record_auth_failure(e.code());
        }

        result
    }
}

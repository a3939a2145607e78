//! Drinks service error types.
//!
//! All errors map to HTTP status codes via the `IntoResponse` impl and render
//! the uniform envelope `{success:false, error:<status>, code, message}`.
//! Messages returned to clients are fixed strings; underlying causes are
//! logged server-side and never echoed.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Drinks service error type.
///
/// Every authentication and authorization failure maps to 401, including
/// `Forbidden`, which keeps the status the public API has always returned
/// for a missing permission.
#[derive(Debug, Error)]
pub enum DrinksError {
    #[error("Authorization header is expected")]
    AuthHeaderMissing,

    #[error("Authorization header must be a bearer token")]
    AuthHeaderMalformed,

    #[error("Unable to parse authentication token")]
    InvalidHeaderFormat,

    #[error("Unable to find the appropriate key")]
    UnknownSigningKey,

    #[error("Token signature could not be verified")]
    InvalidSignature,

    #[error("Token expired")]
    TokenExpired,

    #[error("Incorrect claims, check the audience and issuer")]
    ClaimMismatch,

    #[error("Permissions not included in token")]
    PermissionsClaimMissing,

    #[error("Permission not found")]
    Forbidden,

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Unprocessable: {0}")]
    Unprocessable(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Database error: {0}")]
    Database(String),

    #[error("Service unavailable: {0}")]
    ServiceUnavailable(String),
}

impl DrinksError {
    /// Returns the HTTP status code for this error.
    pub fn status_code(&self) -> StatusCode {
        match self {
            DrinksError::AuthHeaderMissing
            | DrinksError::AuthHeaderMalformed
            | DrinksError::InvalidHeaderFormat
            | DrinksError::UnknownSigningKey
            | DrinksError::InvalidSignature
            | DrinksError::TokenExpired
            | DrinksError::ClaimMismatch
            | DrinksError::PermissionsClaimMissing
            | DrinksError::Forbidden => StatusCode::UNAUTHORIZED,
            DrinksError::NotFound(_) => StatusCode::NOT_FOUND,
            DrinksError::Unprocessable(_) => StatusCode::UNPROCESSABLE_ENTITY,
            DrinksError::BadRequest(_) => StatusCode::BAD_REQUEST,
            DrinksError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
            DrinksError::ServiceUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
        }
    }

    /// Machine-readable error code carried in the response envelope.
    pub fn code(&self) -> &'static str {
        match self {
            DrinksError::AuthHeaderMissing => "authorization_header_missing",
            DrinksError::AuthHeaderMalformed
            | DrinksError::InvalidHeaderFormat
            | DrinksError::UnknownSigningKey => "invalid_header",
            DrinksError::InvalidSignature => "invalid_signature",
            DrinksError::TokenExpired => "token_expired",
            DrinksError::ClaimMismatch | DrinksError::PermissionsClaimMissing => "invalid_claims",
            DrinksError::Forbidden => "unauthorized",
            DrinksError::NotFound(_) => "not_found",
            DrinksError::Unprocessable(_) => "unprocessable",
            DrinksError::BadRequest(_) => "bad_request",
            DrinksError::Database(_) => "internal_error",
            DrinksError::ServiceUnavailable(_) => "service_unavailable",
        }
    }

    fn client_message(&self) -> String {
        match self {
            DrinksError::NotFound(_) => "resource not found".to_string(),
            DrinksError::Unprocessable(_) => "unprocessable".to_string(),
            DrinksError::BadRequest(reason) => reason.clone(),
            DrinksError::Database(_) => "An internal error occurred".to_string(),
            DrinksError::ServiceUnavailable(_) => "Service temporarily unavailable".to_string(),
            other => other.to_string(),
        }
    }
}

#[derive(Serialize)]
struct ErrorResponse {
    success: bool,
    error: u16,
    code: &'static str,
    message: String,
}

impl IntoResponse for DrinksError {
    fn into_response(self) -> Response {
        match &self {
            DrinksError::Database(err) => {
                tracing::error!(target: "drinks.database", error = %err, "Database operation failed");
            }
            DrinksError::Unprocessable(reason) => {
                tracing::warn!(target: "drinks.errors", reason = %reason, "Request could not be processed");
            }
            DrinksError::ServiceUnavailable(reason) => {
                tracing::warn!(target: "drinks.availability", reason = %reason, "Service unavailable");
            }
            _ => {}
        }

        let status = self.status_code();
        let body = ErrorResponse {
            success: false,
            error: status.as_u16(),
            code: self.code(),
            message: self.client_message(),
        };

        let mut response = (status, Json(body)).into_response();

        if status == StatusCode::UNAUTHORIZED {
            if let Ok(header_value) = format!(
                "Bearer realm=\"drinks-api\", error=\"{}\"",
                self.code()
            )
            .parse()
            {
                response
                    .headers_mut()
                    .insert("WWW-Authenticate", header_value);
            }
        }

        response
    }
}

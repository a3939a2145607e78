//! JWT utilities shared across the drinks service crates.
//!
//! This module provides the parts of token validation that do not depend on
//! a key source:
//! - Size limits for DoS prevention
//! - Leeway bounds for `exp` validation
//! - Unverified header parsing (`kid` and `alg` extraction)
//! - Algorithm allow-list parsing and key-type mapping
//!
//! # Security
//!
//! - Tokens are size-checked BEFORE parsing (DoS prevention)
//! - The `none` algorithm can never enter an allow-list
//! - Symmetric (`HS*`) algorithms are refused because JWKS keys are public keys
//!
//! # Usage
//!
//! ```rust,ignore
//! use common::jwt::{parse_header, parse_algorithm_allow_list};
//!
//! let allowed = parse_algorithm_allow_list("RS256")?;
//! let header = parse_header(token)?;
//! // look up header.kid in the trusted key set, then verify the signature
//! ```

use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use jsonwebtoken::Algorithm;
use serde::Deserialize;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

// =============================================================================
// Constants
// =============================================================================

/// Maximum allowed JWT size in bytes (8KB).
///
/// Identity-provider access tokens carrying a handful of permissions are
/// well under 2KB. Anything above this limit is rejected before base64
/// decoding or signature verification.
pub const MAX_JWT_SIZE_BYTES: usize = 8192; // 8KB

/// Default leeway applied to `exp` validation.
///
/// Expiry must be strictly in the future unless an operator opts in to a
/// tolerance.
pub const DEFAULT_LEEWAY: Duration = Duration::from_secs(0);

/// Maximum allowed leeway (10 minutes).
pub const MAX_LEEWAY: Duration = Duration::from_secs(600);

/// Algorithm allow-list used when none is configured.
pub const DEFAULT_ALGORITHMS: &str = "RS256";

// =============================================================================
// Error Types
// =============================================================================

/// Errors that can occur while parsing an unverified JWT header.
///
/// Messages are intentionally generic. Detailed information is logged at
/// debug level for troubleshooting.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum JwtHeaderError {
    /// Token size exceeds maximum allowed.
    #[error("Unable to parse authentication token")]
    TokenTooLarge,

    /// Token format is invalid (not three parts, bad base64, bad JSON).
    #[error("Unable to parse authentication token")]
    MalformedToken,

    /// Token header has no usable `kid`.
    #[error("Unable to parse authentication token")]
    MissingKid,

    /// Token header has no usable `alg`.
    #[error("Unable to parse authentication token")]
    MissingAlgorithm,
}

/// Errors that can occur while parsing an algorithm allow-list.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum AlgorithmPolicyError {
    #[error("algorithm allow-list is empty")]
    Empty,

    #[error("algorithm '{0}' is never allowed")]
    Forbidden(String),

    #[error("symmetric algorithm '{0}' cannot be verified with a public key set")]
    Symmetric(String),

    #[error("unknown algorithm '{0}'")]
    Unknown(String),
}

// =============================================================================
// Header Types
// =============================================================================

/// The parts of an unverified JWT header needed to pick a verification key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenHeader {
    /// Key ID used to look up the signing key.
    pub kid: String,

    /// Algorithm the token declares, as written in the header.
    pub alg: String,
}

#[derive(Deserialize)]
struct RawHeader {
    #[serde(default)]
    kid: Option<serde_json::Value>,
    #[serde(default)]
    alg: Option<serde_json::Value>,
}

// =============================================================================
// Functions
// =============================================================================

/// Parse the header of a JWT without verifying the signature.
///
/// # Security
///
/// - Token size is checked BEFORE any parsing
/// - This function does NOT validate the signature; the token MUST still be
///   verified with the key selected by `kid`
///
/// # Errors
///
/// - `TokenTooLarge` - Token exceeds [`MAX_JWT_SIZE_BYTES`]
/// - `MalformedToken` - Not three dot-separated parts, bad base64 or bad JSON
/// - `MissingKid` - `kid` absent, not a string, or empty
/// - `MissingAlgorithm` - `alg` absent, not a string, or empty
pub fn parse_header(token: &str) -> Result<TokenHeader, JwtHeaderError> {
    if token.len() > MAX_JWT_SIZE_BYTES {
        tracing::debug!(
            target: "common.jwt",
            token_size = token.len(),
            max_size = MAX_JWT_SIZE_BYTES,
            "Token rejected: size exceeds maximum allowed"
        );
        return Err(JwtHeaderError::TokenTooLarge);
    }

    // JWT format: header.payload.signature
    let mut parts = token.split('.');
    let (Some(header_part), Some(_), Some(_), None) =
        (parts.next(), parts.next(), parts.next(), parts.next())
    else {
        tracing::debug!(target: "common.jwt", "Token rejected: invalid JWT format");
        return Err(JwtHeaderError::MalformedToken);
    };

    let header_bytes = URL_SAFE_NO_PAD.decode(header_part).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to decode JWT header base64");
        JwtHeaderError::MalformedToken
    })?;

    let header: RawHeader = serde_json::from_slice(&header_bytes).map_err(|e| {
        tracing::debug!(target: "common.jwt", error = %e, "Failed to parse JWT header JSON");
        JwtHeaderError::MalformedToken
    })?;

    let kid = non_empty_string(header.kid).ok_or(JwtHeaderError::MissingKid)?;
    let alg = non_empty_string(header.alg).ok_or(JwtHeaderError::MissingAlgorithm)?;

    Ok(TokenHeader { kid, alg })
}

fn non_empty_string(value: Option<serde_json::Value>) -> Option<String> {
    match value {
        Some(serde_json::Value::String(s)) if !s.is_empty() => Some(s),
        _ => None,
    }
}

/// Parse a comma-separated algorithm allow-list such as `"RS256,EdDSA"`.
///
/// Whitespace around entries is ignored and duplicates are collapsed.
///
/// # Errors
///
/// - `Forbidden` - the list names `none` (in any case)
/// - `Symmetric` - the list names an `HS*` algorithm
/// - `Unknown` - the list names something `jsonwebtoken` does not support
/// - `Empty` - no algorithms remain after parsing
pub fn parse_algorithm_allow_list(value: &str) -> Result<Vec<Algorithm>, AlgorithmPolicyError> {
    let mut allowed = Vec::new();

    for entry in value.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        if entry.eq_ignore_ascii_case("none") {
            return Err(AlgorithmPolicyError::Forbidden(entry.to_string()));
        }

        let alg = Algorithm::from_str(entry)
            .map_err(|_| AlgorithmPolicyError::Unknown(entry.to_string()))?;

        if key_type_for(alg) == "oct" {
            return Err(AlgorithmPolicyError::Symmetric(entry.to_string()));
        }

        if !allowed.contains(&alg) {
            allowed.push(alg);
        }
    }

    if allowed.is_empty() {
        return Err(AlgorithmPolicyError::Empty);
    }

    Ok(allowed)
}

/// JWK `kty` value a key must have to verify tokens signed with `alg`.
#[must_use]
pub fn key_type_for(alg: Algorithm) -> &'static str {
    match alg {
        Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512 => "oct",
        Algorithm::ES256 | Algorithm::ES384 => "EC",
        Algorithm::RS256
        | Algorithm::RS384
        | Algorithm::RS512
        | Algorithm::PS256
        | Algorithm::PS384
        | Algorithm::PS512 => "RSA",
        Algorithm::EdDSA => "OKP",
    }
}

// =============================================================================
// Tests
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    fn token_with_header(header: &str) -> String {
        let header_b64 = URL_SAFE_NO_PAD.encode(header);
        format!("{header_b64}.payload.signature")
    }

    // -------------------------------------------------------------------------
    // Constants Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_max_jwt_size_is_8kb() {
        assert_eq!(MAX_JWT_SIZE_BYTES, 8192);
    }

    #[test]
    fn test_leeway_bounds() {
        assert_eq!(DEFAULT_LEEWAY, Duration::from_secs(0));
        assert_eq!(MAX_LEEWAY, Duration::from_secs(600));
    }

    // -------------------------------------------------------------------------
    // parse_header Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_parse_header_valid_token() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT","kid":"key-01"}"#);

        let header = parse_header(&token).unwrap();
        assert_eq!(header.kid, "key-01");
        assert_eq!(header.alg, "RS256");
    }

    #[test]
    fn test_parse_header_missing_kid() {
        let token = token_with_header(r#"{"alg":"RS256","typ":"JWT"}"#);
        assert_eq!(parse_header(&token), Err(JwtHeaderError::MissingKid));
    }

    #[test]
    fn test_parse_header_empty_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":""}"#);
        assert_eq!(parse_header(&token), Err(JwtHeaderError::MissingKid));
    }

    #[test]
    fn test_parse_header_non_string_kid() {
        let token = token_with_header(r#"{"alg":"RS256","kid":12345}"#);
        assert_eq!(parse_header(&token), Err(JwtHeaderError::MissingKid));
    }

    #[test]
    fn test_parse_header_missing_alg() {
        let token = token_with_header(r#"{"kid":"key-01"}"#);
        assert_eq!(parse_header(&token), Err(JwtHeaderError::MissingAlgorithm));
    }

    #[test]
    fn test_parse_header_wrong_part_count() {
        assert_eq!(parse_header("not-a-jwt"), Err(JwtHeaderError::MalformedToken));
        assert_eq!(parse_header("only.two"), Err(JwtHeaderError::MalformedToken));
        assert_eq!(parse_header("a.b.c.d"), Err(JwtHeaderError::MalformedToken));
        assert_eq!(parse_header(""), Err(JwtHeaderError::MalformedToken));
    }

    #[test]
    fn test_parse_header_invalid_base64() {
        assert_eq!(
            parse_header("!!!invalid!!!.payload.signature"),
            Err(JwtHeaderError::MalformedToken)
        );
    }

    #[test]
    fn test_parse_header_invalid_json() {
        let token = token_with_header("not-json");
        assert_eq!(parse_header(&token), Err(JwtHeaderError::MalformedToken));
    }

    #[test]
    fn test_parse_header_oversized_token() {
        let oversized = "a".repeat(MAX_JWT_SIZE_BYTES + 1);
        assert_eq!(parse_header(&oversized), Err(JwtHeaderError::TokenTooLarge));
    }

    #[test]
    fn test_parse_header_at_size_limit() {
        let header_b64 = URL_SAFE_NO_PAD.encode(r#"{"alg":"RS256","kid":"key"}"#);
        let remaining = MAX_JWT_SIZE_BYTES - header_b64.len() - 2;
        let payload_len = remaining / 2;
        let token = format!(
            "{}.{}.{}",
            header_b64,
            "a".repeat(payload_len),
            "b".repeat(remaining - payload_len)
        );
        assert_eq!(token.len(), MAX_JWT_SIZE_BYTES);

        assert_eq!(parse_header(&token).unwrap().kid, "key");
    }

    // -------------------------------------------------------------------------
    // Algorithm policy Tests
    // -------------------------------------------------------------------------

    #[test]
    fn test_allow_list_default() {
        let allowed = parse_algorithm_allow_list(DEFAULT_ALGORITHMS).unwrap();
        assert_eq!(allowed, vec![Algorithm::RS256]);
    }

    #[test]
    fn test_allow_list_multiple_with_whitespace_and_duplicates() {
        let allowed = parse_algorithm_allow_list(" RS256 , EdDSA,RS256,").unwrap();
        assert_eq!(allowed, vec![Algorithm::RS256, Algorithm::EdDSA]);
    }

    #[test]
    fn test_allow_list_rejects_none() {
        assert!(matches!(
            parse_algorithm_allow_list("RS256,none"),
            Err(AlgorithmPolicyError::Forbidden(_))
        ));
        assert!(matches!(
            parse_algorithm_allow_list("NONE"),
            Err(AlgorithmPolicyError::Forbidden(_))
        ));
    }

    #[test]
    fn test_allow_list_rejects_symmetric() {
        assert_eq!(
            parse_algorithm_allow_list("HS256"),
            Err(AlgorithmPolicyError::Symmetric("HS256".to_string()))
        );
    }

    #[test]
    fn test_allow_list_rejects_unknown() {
        assert_eq!(
            parse_algorithm_allow_list("RS1024"),
            Err(AlgorithmPolicyError::Unknown("RS1024".to_string()))
        );
    }

    #[test]
    fn test_allow_list_rejects_empty() {
        assert_eq!(
            parse_algorithm_allow_list(" , "),
            Err(AlgorithmPolicyError::Empty)
        );
    }

    #[test]
    fn test_key_type_for() {
        assert_eq!(key_type_for(Algorithm::RS256), "RSA");
        assert_eq!(key_type_for(Algorithm::PS512), "RSA");
        assert_eq!(key_type_for(Algorithm::ES256), "EC");
        assert_eq!(key_type_for(Algorithm::EdDSA), "OKP");
        assert_eq!(key_type_for(Algorithm::HS256), "oct");
    }
}
